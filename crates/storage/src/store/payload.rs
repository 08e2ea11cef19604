#![forbid(unsafe_code)]

use super::annotations::{InsertAnnotationTxArgs, insert_annotation_tx};
use super::nodes::{InsertNodeTxArgs, insert_node_tx};
use super::trees::{InsertTreeTxArgs, insert_tree_tx};
use super::*;
use ct_core::Deadline;
use ct_core::payload::{TreePlan, plan_payload};
use rusqlite::{Transaction, TransactionBehavior};
use std::collections::HashMap;

impl SqliteStore {
    /// Materializes every tree of a batch document in one transaction.
    ///
    /// The whole document is planned before the transaction opens; any later
    /// failure (storage or deadline) drops the transaction, so a rejected
    /// submission leaves no rows behind.
    pub fn apply_tree_payload(
        &mut self,
        deadline: &Deadline,
        request: ApplyTreePayloadRequest,
    ) -> Result<Vec<CardTree>, StoreError> {
        deadline.check()?;
        let created_by = required_text(&request.created_by, "created_by is required")?;
        let plans = plan_payload(&request.payload)?;
        if plans.is_empty() {
            return Ok(Vec::new());
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now_ms = now_ms();
        let mut trees = Vec::with_capacity(plans.len());
        for plan in plans.iter() {
            let tree = materialize_plan_tx(
                &tx,
                deadline,
                MaterializeArgs {
                    scope_type: request.scope_type,
                    scope_id: request.scope_id,
                    source_post_id: request.source_post_id,
                    created_by: &created_by,
                    now_ms,
                },
                plan,
            )?;
            trees.push(tree);
        }
        deadline.check()?;
        tx.commit()?;

        tracing::info!(
            scope = request.scope_type.as_str(),
            scope_id = request.scope_id,
            trees = trees.len(),
            "tree payload applied"
        );
        Ok(trees)
    }
}

struct MaterializeArgs<'a> {
    scope_type: ScopeType,
    scope_id: i64,
    source_post_id: Option<i64>,
    created_by: &'a str,
    now_ms: i64,
}

fn materialize_plan_tx(
    tx: &Transaction<'_>,
    deadline: &Deadline,
    args: MaterializeArgs<'_>,
    plan: &TreePlan,
) -> Result<CardTree, StoreError> {
    let MaterializeArgs {
        scope_type,
        scope_id,
        source_post_id,
        created_by,
        now_ms,
    } = args;

    let mut tree = insert_tree_tx(
        tx,
        InsertTreeTxArgs {
            scope_type,
            scope_id,
            title: &plan.title,
            description: plan.description.as_deref(),
            created_by,
            is_primary: plan.is_primary,
            now_ms,
        },
    )?;

    let mut resolved: HashMap<&str, NodeId> = HashMap::with_capacity(plan.nodes.len());
    for planned in plan.nodes.iter() {
        deadline.check()?;
        // Planning guarantees parents come first.
        let parent_id = match planned.parent_temp_id.as_deref() {
            None => None,
            Some(parent) => Some(
                *resolved
                    .get(parent)
                    .ok_or(StoreError::InvalidInput("payload parent was not materialized"))?,
            ),
        };

        let mut node = insert_node_tx(
            tx,
            InsertNodeTxArgs {
                tree_id: tree.id,
                parent_id,
                card_name: &planned.card_name,
                position: planned.position,
                created_by,
                now_ms,
            },
        )?;
        resolved.insert(planned.temp_id.as_str(), node.id);

        for annotation in planned.annotations.iter() {
            node.annotations.push(insert_annotation_tx(
                tx,
                InsertAnnotationTxArgs {
                    node_id: node.id,
                    kind: &annotation.kind,
                    body: &annotation.body,
                    label: annotation.label.as_deref(),
                    tags: annotation.tags.as_deref(),
                    source_post_id,
                    created_by,
                    now_ms,
                },
            )?);
        }

        tracing::debug!(
            tree_id = %tree.id,
            temp_id = planned.temp_id.as_str(),
            node_id = %node.id,
            "payload node materialized"
        );
        tree.nodes.push(node);
    }

    Ok(tree)
}
