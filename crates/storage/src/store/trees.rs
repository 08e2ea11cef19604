#![forbid(unsafe_code)]

use super::*;
use ct_core::Deadline;
use rusqlite::{OptionalExtension, Transaction, params};

pub(in crate::store) struct InsertTreeTxArgs<'a> {
    pub(in crate::store) scope_type: ScopeType,
    pub(in crate::store) scope_id: i64,
    pub(in crate::store) title: &'a str,
    pub(in crate::store) description: Option<&'a str>,
    pub(in crate::store) created_by: &'a str,
    pub(in crate::store) is_primary: bool,
    pub(in crate::store) now_ms: i64,
}

pub(in crate::store) fn insert_tree_tx(
    tx: &Transaction<'_>,
    args: InsertTreeTxArgs<'_>,
) -> Result<CardTree, StoreError> {
    let InsertTreeTxArgs {
        scope_type,
        scope_id,
        title,
        description,
        created_by,
        is_primary,
        now_ms,
    } = args;

    tx.execute(
        r#"
        INSERT INTO card_trees(scope_type, scope_id, title, description, created_by,
                               created_at_ms, updated_at_ms, is_primary)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7)
        "#,
        params![
            scope_type.as_str(),
            scope_id,
            title,
            description,
            created_by,
            now_ms,
            is_primary
        ],
    )?;

    Ok(CardTree {
        id: TreeId::new(tx.last_insert_rowid()),
        scope_type,
        scope_id,
        title: title.to_string(),
        description: description.map(str::to_string),
        created_by: created_by.to_string(),
        created_at_ms: now_ms,
        updated_at_ms: now_ms,
        is_primary,
        nodes: Vec::new(),
    })
}

impl SqliteStore {
    pub fn create_tree(
        &mut self,
        deadline: &Deadline,
        request: CreateTreeRequest,
    ) -> Result<CardTree, StoreError> {
        deadline.check()?;
        let title = required_text(&request.title, "tree title is required")?;
        let created_by = required_text(&request.created_by, "created_by is required")?;
        let description = ct_core::model::normalize_optional(request.description.as_deref());

        let tx = self.conn.transaction()?;
        let tree = insert_tree_tx(
            &tx,
            InsertTreeTxArgs {
                scope_type: request.scope_type,
                scope_id: request.scope_id,
                title: &title,
                description: description.as_deref(),
                created_by: &created_by,
                is_primary: request.is_primary,
                now_ms: now_ms(),
            },
        )?;
        tx.commit()?;

        tracing::info!(
            tree_id = %tree.id,
            scope = tree.scope_type.as_str(),
            scope_id = tree.scope_id,
            "card tree created"
        );
        Ok(tree)
    }

    /// Existence probe that skips loading nodes and annotations.
    pub fn tree_exists(&self, deadline: &Deadline, tree_id: TreeId) -> Result<bool, StoreError> {
        deadline.check()?;
        tree_exists(&self.conn, tree_id)
    }

    /// Raw tree: nodes in id order, not yet assembled for display.
    pub fn get_tree(&self, deadline: &Deadline, tree_id: TreeId) -> Result<CardTree, StoreError> {
        deadline.check()?;
        let mut tree = self
            .conn
            .query_row(
                &format!("SELECT {TREE_COLUMNS} FROM card_trees WHERE id=?1"),
                params![tree_id.get()],
                tree_from_row,
            )
            .optional()?
            .ok_or(StoreError::UnknownTree)?;
        tree.nodes = load_tree_nodes(&self.conn, tree_id)?;
        Ok(tree)
    }

    /// Primary trees first, then creation order.
    pub fn list_trees(
        &self,
        deadline: &Deadline,
        request: ListTreesRequest,
    ) -> Result<Vec<CardTree>, StoreError> {
        deadline.check()?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TREE_COLUMNS} FROM card_trees \
             WHERE scope_type=?1 AND scope_id=?2 \
             ORDER BY is_primary DESC, id ASC"
        ))?;
        let mut trees = stmt
            .query_map(
                params![request.scope_type.as_str(), request.scope_id],
                tree_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        if request.include_nodes {
            for tree in trees.iter_mut() {
                deadline.check()?;
                tree.nodes = load_tree_nodes(&self.conn, tree.id)?;
            }
        }
        Ok(trees)
    }
}
