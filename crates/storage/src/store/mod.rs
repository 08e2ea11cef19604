#![forbid(unsafe_code)]

mod annotations;
mod error;
mod nodes;
mod payload;
mod requests;
mod schema;
mod trees;

pub use error::StoreError;
pub use requests::*;

use ct_core::{
    AnnotationId, CardTree, CardTreeAnnotation, CardTreeNode, NodeId, ScopeType, TreeId,
};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DB_FILE_NAME: &str = "cardtree.db";
const SCHEMA_VERSION: i64 = 1;

const TREE_COLUMNS: &str = "id, scope_type, scope_id, title, description, created_by, \
     created_at_ms, updated_at_ms, is_primary";
const NODE_COLUMNS: &str =
    "id, tree_id, parent_id, card_name, position, created_by, created_at_ms, updated_at_ms";
const ANNOTATION_COLUMNS: &str = "a.id, a.node_id, a.kind, a.body, a.label, a.tags, \
     a.source_post_id, a.created_by, a.created_at_ms";

/// Durable CRUD for card trees, nodes and annotations.
///
/// One connection; callers that share a store across threads wrap it in a
/// mutex, which also serialises writers to the same tree.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        schema::preflight_gate(&conn)?;
        schema::install_schema(&conn)?;

        tracing::debug!(dir = %storage_dir.display(), "card tree store opened");
        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join(DB_FILE_NAME)
    }
}

fn tree_exists(conn: &Connection, tree_id: TreeId) -> Result<bool, StoreError> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM card_trees WHERE id=?1",
            params![tree_id.get()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

fn node_tree_id_of(conn: &Connection, node_id: NodeId) -> Result<Option<TreeId>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT tree_id FROM card_tree_nodes WHERE id=?1",
            params![node_id.get()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .map(TreeId::new))
}

fn touch_tree_tx(tx: &Transaction<'_>, tree_id: TreeId, now_ms: i64) -> Result<(), StoreError> {
    tx.execute(
        "UPDATE card_trees SET updated_at_ms=?2 WHERE id=?1",
        params![tree_id.get(), now_ms],
    )?;
    Ok(())
}

/// Nodes in id order with their annotations attached in id order.
fn load_tree_nodes(conn: &Connection, tree_id: TreeId) -> Result<Vec<CardTreeNode>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NODE_COLUMNS} FROM card_tree_nodes WHERE tree_id=?1 ORDER BY id ASC"
    ))?;
    let mut nodes = stmt
        .query_map(params![tree_id.get()], node_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let slots: HashMap<NodeId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(slot, node)| (node.id, slot))
        .collect();

    let mut stmt = conn.prepare(&format!(
        "SELECT {ANNOTATION_COLUMNS} \
         FROM card_tree_annotations a \
         JOIN card_tree_nodes n ON n.id = a.node_id \
         WHERE n.tree_id=?1 \
         ORDER BY a.id ASC"
    ))?;
    let mut rows = stmt.query(params![tree_id.get()])?;
    while let Some(row) = rows.next()? {
        let annotation = annotation_from_row(row)?;
        if let Some(slot) = slots.get(&annotation.node_id) {
            nodes[*slot].annotations.push(annotation);
        }
    }

    Ok(nodes)
}

fn tree_from_row(row: &Row<'_>) -> rusqlite::Result<CardTree> {
    let raw_scope: String = row.get(1)?;
    let scope_type = raw_scope
        .parse::<ScopeType>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(err)))?;
    Ok(CardTree {
        id: TreeId::new(row.get(0)?),
        scope_type,
        scope_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        created_by: row.get(5)?,
        created_at_ms: row.get(6)?,
        updated_at_ms: row.get(7)?,
        is_primary: row.get(8)?,
        nodes: Vec::new(),
    })
}

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<CardTreeNode> {
    Ok(CardTreeNode {
        id: NodeId::new(row.get(0)?),
        tree_id: TreeId::new(row.get(1)?),
        parent_id: row.get::<_, Option<i64>>(2)?.map(NodeId::new),
        card_name: row.get(3)?,
        position: row.get(4)?,
        created_by: row.get(5)?,
        created_at_ms: row.get(6)?,
        updated_at_ms: row.get(7)?,
        depth: 0,
        indent: 0,
        annotations: Vec::new(),
    })
}

fn annotation_from_row(row: &Row<'_>) -> rusqlite::Result<CardTreeAnnotation> {
    Ok(CardTreeAnnotation {
        id: AnnotationId::new(row.get(0)?),
        node_id: NodeId::new(row.get(1)?),
        kind: row.get(2)?,
        body: row.get(3)?,
        label: row.get(4)?,
        tags: row.get(5)?,
        source_post_id: row.get(6)?,
        created_by: row.get(7)?,
        created_at_ms: row.get(8)?,
    })
}

fn required_text(value: &str, message: &'static str) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidInput(message));
    }
    Ok(trimmed.to_string())
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
