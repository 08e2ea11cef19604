#![forbid(unsafe_code)]

use super::{SCHEMA_VERSION, StoreError, now_ms};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;

const REQUIRED_TABLES: [&str; 4] = [
    "schema_state",
    "card_trees",
    "card_tree_nodes",
    "card_tree_annotations",
];

pub(super) fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }

    let required: BTreeSet<&str> = REQUIRED_TABLES.into_iter().collect();

    if tables
        .iter()
        .any(|table| !required.contains(table.as_str()))
    {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: unsupported tables detected",
        ));
    }

    for table in required {
        if !tables.contains(table) {
            return Err(StoreError::InvalidInput(
                "RESET_REQUIRED: required table is missing",
            ));
        }
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM schema_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        )),
        None => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state row is missing",
        )),
    }
}

// parent_id and annotation node_id carry no foreign key: deleting a node leaves
// its children and annotations in place. AUTOINCREMENT keeps a deleted node's id
// from being reissued to a new node that would adopt them.
pub(super) fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    let now_ms = now_ms();

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS card_trees (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          scope_type TEXT NOT NULL CHECK(scope_type IN ('board', 'thread', 'post')),
          scope_id INTEGER NOT NULL,
          title TEXT NOT NULL CHECK(length(trim(title)) > 0),
          description TEXT,
          created_by TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          is_primary INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_card_trees_scope
          ON card_trees(scope_type, scope_id, is_primary, id);

        CREATE TABLE IF NOT EXISTS card_tree_nodes (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          tree_id INTEGER NOT NULL,
          parent_id INTEGER,
          card_name TEXT NOT NULL CHECK(length(trim(card_name)) > 0),
          position INTEGER NOT NULL DEFAULT 0,
          created_by TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          FOREIGN KEY(tree_id) REFERENCES card_trees(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_card_tree_nodes_tree
          ON card_tree_nodes(tree_id, id);

        CREATE TABLE IF NOT EXISTS card_tree_annotations (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          node_id INTEGER NOT NULL,
          kind TEXT NOT NULL DEFAULT 'note',
          body TEXT NOT NULL CHECK(length(trim(body)) > 0),
          label TEXT,
          tags TEXT,
          source_post_id INTEGER,
          created_by TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_card_tree_annotations_node
          ON card_tree_annotations(node_id, id);
        "#,
    )?;

    conn.execute(
        "INSERT INTO schema_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}
