#![forbid(unsafe_code)]

use super::*;
use ct_core::Deadline;
use rusqlite::{OptionalExtension, Transaction, params};
use std::collections::HashSet;

pub(in crate::store) struct InsertNodeTxArgs<'a> {
    pub(in crate::store) tree_id: TreeId,
    pub(in crate::store) parent_id: Option<NodeId>,
    pub(in crate::store) card_name: &'a str,
    pub(in crate::store) position: i64,
    pub(in crate::store) created_by: &'a str,
    pub(in crate::store) now_ms: i64,
}

pub(in crate::store) fn insert_node_tx(
    tx: &Transaction<'_>,
    args: InsertNodeTxArgs<'_>,
) -> Result<CardTreeNode, StoreError> {
    let InsertNodeTxArgs {
        tree_id,
        parent_id,
        card_name,
        position,
        created_by,
        now_ms,
    } = args;

    tx.execute(
        r#"
        INSERT INTO card_tree_nodes(tree_id, parent_id, card_name, position, created_by,
                                    created_at_ms, updated_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        "#,
        params![
            tree_id.get(),
            parent_id.map(NodeId::get),
            card_name,
            position,
            created_by,
            now_ms
        ],
    )?;

    Ok(CardTreeNode {
        id: NodeId::new(tx.last_insert_rowid()),
        tree_id,
        parent_id,
        card_name: card_name.to_string(),
        position,
        created_by: created_by.to_string(),
        created_at_ms: now_ms,
        updated_at_ms: now_ms,
        depth: 0,
        indent: 0,
        annotations: Vec::new(),
    })
}

impl SqliteStore {
    /// Does not check that `parent_id` lives in `tree_id`; callers do.
    pub fn create_node(
        &mut self,
        deadline: &Deadline,
        request: CreateNodeRequest,
    ) -> Result<CardTreeNode, StoreError> {
        deadline.check()?;
        let card_name = required_text(&request.card_name, "card name is required")?;
        let created_by = required_text(&request.created_by, "created_by is required")?;

        let tx = self.conn.transaction()?;
        if !tree_exists(&tx, request.tree_id)? {
            return Err(StoreError::UnknownTree);
        }
        let now_ms = now_ms();
        let node = insert_node_tx(
            &tx,
            InsertNodeTxArgs {
                tree_id: request.tree_id,
                parent_id: request.parent_id,
                card_name: &card_name,
                position: request.position,
                created_by: &created_by,
                now_ms,
            },
        )?;
        touch_tree_tx(&tx, request.tree_id, now_ms)?;
        tx.commit()?;

        tracing::info!(tree_id = %node.tree_id, node_id = %node.id, "card tree node created");
        Ok(node)
    }

    pub fn update_node(
        &mut self,
        deadline: &Deadline,
        request: UpdateNodeRequest,
    ) -> Result<(), StoreError> {
        deadline.check()?;
        let card_name = required_text(&request.card_name, "card name is required")?;

        let tx = self.conn.transaction()?;
        let Some(tree_id) = node_tree_id_of(&tx, request.node_id)? else {
            return Err(StoreError::UnknownNode);
        };
        let now_ms = now_ms();
        tx.execute(
            r#"
            UPDATE card_tree_nodes
            SET parent_id=?2, card_name=?3, position=?4, updated_at_ms=?5
            WHERE id=?1
            "#,
            params![
                request.node_id.get(),
                request.parent_id.map(NodeId::get),
                card_name,
                request.position,
                now_ms
            ],
        )?;
        touch_tree_tx(&tx, tree_id, now_ms)?;
        tx.commit()?;
        Ok(())
    }

    /// Removes the single row. Children keep their `parent_id` and annotations
    /// keep their `node_id`; the assembler promotes the orphans on read.
    pub fn delete_node(&mut self, deadline: &Deadline, node_id: NodeId) -> Result<(), StoreError> {
        deadline.check()?;
        let tx = self.conn.transaction()?;
        let Some(tree_id) = node_tree_id_of(&tx, node_id)? else {
            return Err(StoreError::UnknownNode);
        };
        tx.execute(
            "DELETE FROM card_tree_nodes WHERE id=?1",
            params![node_id.get()],
        )?;
        touch_tree_tx(&tx, tree_id, now_ms())?;
        tx.commit()?;

        tracing::info!(tree_id = %tree_id, node_id = %node_id, "card tree node deleted");
        Ok(())
    }

    pub fn node_tree_id(&self, deadline: &Deadline, node_id: NodeId) -> Result<TreeId, StoreError> {
        deadline.check()?;
        node_tree_id_of(&self.conn, node_id)?.ok_or(StoreError::UnknownNode)
    }

    /// Parent chain of `node_id`, nearest first. Stops at a root, at a dangling
    /// parent, or on revisiting a node.
    pub fn node_ancestors(
        &self,
        deadline: &Deadline,
        node_id: NodeId,
    ) -> Result<Vec<NodeId>, StoreError> {
        deadline.check()?;
        let mut stmt = self
            .conn
            .prepare("SELECT parent_id FROM card_tree_nodes WHERE id=?1")?;

        let mut ancestors = Vec::new();
        let mut seen = HashSet::from([node_id]);
        let mut current = node_id;
        loop {
            let parent = stmt
                .query_row(params![current.get()], |row| row.get::<_, Option<i64>>(0))
                .optional()?
                .flatten()
                .map(NodeId::new);
            let Some(parent) = parent else {
                break;
            };
            if !seen.insert(parent) {
                break;
            }
            if node_tree_id_of(&self.conn, parent)?.is_none() {
                break;
            }
            ancestors.push(parent);
            current = parent;
        }
        Ok(ancestors)
    }
}
