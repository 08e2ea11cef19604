#![forbid(unsafe_code)]

use super::*;
use ct_core::Deadline;
use rusqlite::{OptionalExtension, Transaction, params};

pub(in crate::store) struct InsertAnnotationTxArgs<'a> {
    pub(in crate::store) node_id: NodeId,
    pub(in crate::store) kind: &'a str,
    pub(in crate::store) body: &'a str,
    pub(in crate::store) label: Option<&'a str>,
    pub(in crate::store) tags: Option<&'a str>,
    pub(in crate::store) source_post_id: Option<i64>,
    pub(in crate::store) created_by: &'a str,
    pub(in crate::store) now_ms: i64,
}

pub(in crate::store) fn insert_annotation_tx(
    tx: &Transaction<'_>,
    args: InsertAnnotationTxArgs<'_>,
) -> Result<CardTreeAnnotation, StoreError> {
    let InsertAnnotationTxArgs {
        node_id,
        kind,
        body,
        label,
        tags,
        source_post_id,
        created_by,
        now_ms,
    } = args;

    tx.execute(
        r#"
        INSERT INTO card_tree_annotations(node_id, kind, body, label, tags, source_post_id,
                                          created_by, created_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            node_id.get(),
            kind,
            body,
            label,
            tags,
            source_post_id,
            created_by,
            now_ms
        ],
    )?;

    Ok(CardTreeAnnotation {
        id: AnnotationId::new(tx.last_insert_rowid()),
        node_id,
        kind: kind.to_string(),
        body: body.to_string(),
        label: label.map(str::to_string),
        tags: tags.map(str::to_string),
        source_post_id,
        created_by: created_by.to_string(),
        created_at_ms: now_ms,
    })
}

impl SqliteStore {
    pub fn create_annotation(
        &mut self,
        deadline: &Deadline,
        request: CreateAnnotationRequest,
    ) -> Result<CardTreeAnnotation, StoreError> {
        deadline.check()?;
        let body = required_text(&request.body, "annotation body is required")?;
        let created_by = required_text(&request.created_by, "created_by is required")?;
        let kind = ct_core::model::normalize_kind(request.kind.as_deref());
        let label = ct_core::model::normalize_optional(request.label.as_deref());
        let tags = ct_core::model::normalize_optional(request.tags.as_deref());

        let tx = self.conn.transaction()?;
        let Some(tree_id) = node_tree_id_of(&tx, request.node_id)? else {
            return Err(StoreError::UnknownNode);
        };
        let now_ms = now_ms();
        let annotation = insert_annotation_tx(
            &tx,
            InsertAnnotationTxArgs {
                node_id: request.node_id,
                kind: &kind,
                body: &body,
                label: label.as_deref(),
                tags: tags.as_deref(),
                source_post_id: request.source_post_id,
                created_by: &created_by,
                now_ms,
            },
        )?;
        touch_tree_tx(&tx, tree_id, now_ms)?;
        tx.commit()?;

        tracing::info!(
            node_id = %annotation.node_id,
            annotation_id = %annotation.id,
            kind = annotation.kind.as_str(),
            "card tree annotation created"
        );
        Ok(annotation)
    }

    pub fn annotation_node_id(
        &self,
        deadline: &Deadline,
        annotation_id: AnnotationId,
    ) -> Result<NodeId, StoreError> {
        deadline.check()?;
        self.conn
            .query_row(
                "SELECT node_id FROM card_tree_annotations WHERE id=?1",
                params![annotation_id.get()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .map(NodeId::new)
            .ok_or(StoreError::UnknownAnnotation)
    }

    pub fn delete_annotation(
        &mut self,
        deadline: &Deadline,
        annotation_id: AnnotationId,
    ) -> Result<(), StoreError> {
        deadline.check()?;
        let tx = self.conn.transaction()?;
        let Some(tree_id) = tx
            .query_row(
                "SELECT n.tree_id FROM card_tree_annotations a \
                 JOIN card_tree_nodes n ON n.id = a.node_id \
                 WHERE a.id=?1",
                params![annotation_id.get()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .map(TreeId::new)
        else {
            return Err(StoreError::UnknownAnnotation);
        };
        tx.execute(
            "DELETE FROM card_tree_annotations WHERE id=?1",
            params![annotation_id.get()],
        )?;
        touch_tree_tx(&tx, tree_id, now_ms())?;
        tx.commit()?;

        tracing::info!(
            tree_id = %tree_id,
            annotation_id = %annotation_id,
            "card tree annotation deleted"
        );
        Ok(())
    }
}
