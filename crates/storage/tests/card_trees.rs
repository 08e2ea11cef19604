#![forbid(unsafe_code)]

use ct_core::{Deadline, NodeId, ScopeType, TreeId, assemble_tree};
use ct_storage::{
    CreateAnnotationRequest, CreateNodeRequest, CreateTreeRequest, ListTreesRequest, SqliteStore,
    StoreError, UpdateNodeRequest,
};
use std::path::PathBuf;
use std::time::Instant;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let dir = base.join(format!("ct_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn tree_request(scope_type: ScopeType, scope_id: i64, title: &str) -> CreateTreeRequest {
    CreateTreeRequest {
        scope_type,
        scope_id,
        title: title.to_string(),
        description: None,
        created_by: "alice".to_string(),
        is_primary: false,
    }
}

fn add_node(
    store: &mut SqliteStore,
    tree_id: TreeId,
    parent_id: Option<NodeId>,
    card_name: &str,
    position: i64,
) -> NodeId {
    store
        .create_node(
            &Deadline::none(),
            CreateNodeRequest {
                tree_id,
                parent_id,
                card_name: card_name.to_string(),
                position,
                created_by: "alice".to_string(),
            },
        )
        .expect("create node")
        .id
}

#[test]
fn create_and_get_tree_round_trips_fields() {
    let storage_dir = temp_dir("create_and_get_tree_round_trips_fields");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let deadline = Deadline::none();

    let mut request = tree_request(ScopeType::Board, 7, "  Burn  ");
    request.description = Some("   ".to_string());
    request.is_primary = true;
    let created = store.create_tree(&deadline, request).expect("create tree");
    assert_eq!(created.title, "Burn");
    assert_eq!(created.description, None);
    assert!(created.is_primary);

    let fetched = store.get_tree(&deadline, created.id).expect("get tree");
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.scope_type, ScopeType::Board);
    assert_eq!(fetched.scope_id, 7);
    assert_eq!(fetched.created_by, "alice");
    assert!(fetched.nodes.is_empty());
}

#[test]
fn blank_title_is_rejected_without_writing() {
    let storage_dir = temp_dir("blank_title_is_rejected_without_writing");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let deadline = Deadline::none();

    let err = store
        .create_tree(&deadline, tree_request(ScopeType::Thread, 1, "  "))
        .expect_err("blank title");
    assert!(matches!(err, StoreError::InvalidInput("tree title is required")));

    let listed = store
        .list_trees(
            &deadline,
            ListTreesRequest {
                scope_type: ScopeType::Thread,
                scope_id: 1,
                include_nodes: false,
            },
        )
        .expect("list trees");
    assert!(listed.is_empty());
}

#[test]
fn missing_rows_report_unknown() {
    let storage_dir = temp_dir("missing_rows_report_unknown");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let deadline = Deadline::none();

    assert!(matches!(
        store.get_tree(&deadline, TreeId::new(99)),
        Err(StoreError::UnknownTree)
    ));
    assert!(!store.tree_exists(&deadline, TreeId::new(99)).expect("exists"));
    assert!(matches!(
        store.node_tree_id(&deadline, NodeId::new(99)),
        Err(StoreError::UnknownNode)
    ));
    assert!(matches!(
        store.update_node(
            &deadline,
            UpdateNodeRequest {
                node_id: NodeId::new(99),
                parent_id: None,
                card_name: "Opt".to_string(),
                position: 0,
            },
        ),
        Err(StoreError::UnknownNode)
    ));
    assert!(matches!(
        store.create_node(
            &deadline,
            CreateNodeRequest {
                tree_id: TreeId::new(99),
                parent_id: None,
                card_name: "Opt".to_string(),
                position: 0,
                created_by: "alice".to_string(),
            },
        ),
        Err(StoreError::UnknownTree)
    ));
    assert!(matches!(
        store.delete_annotation(&deadline, ct_core::AnnotationId::new(99)),
        Err(StoreError::UnknownAnnotation)
    ));
}

#[test]
fn list_trees_puts_primary_first_and_allows_duplicates() {
    let storage_dir = temp_dir("list_trees_puts_primary_first_and_allows_duplicates");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let deadline = Deadline::none();

    let plain = store
        .create_tree(&deadline, tree_request(ScopeType::Board, 3, "Plain"))
        .expect("plain");
    let mut first = tree_request(ScopeType::Board, 3, "Primary A");
    first.is_primary = true;
    let primary_a = store.create_tree(&deadline, first).expect("primary a");
    let mut second = tree_request(ScopeType::Board, 3, "Primary B");
    second.is_primary = true;
    let primary_b = store.create_tree(&deadline, second).expect("primary b");
    store
        .create_tree(&deadline, tree_request(ScopeType::Board, 4, "Other board"))
        .expect("other board");

    let listed = store
        .list_trees(
            &deadline,
            ListTreesRequest {
                scope_type: ScopeType::Board,
                scope_id: 3,
                include_nodes: false,
            },
        )
        .expect("list trees");
    let ids: Vec<TreeId> = listed.iter().map(|tree| tree.id).collect();
    assert_eq!(ids, vec![primary_a.id, primary_b.id, plain.id]);
}

#[test]
fn list_trees_loads_nodes_only_when_asked() {
    let storage_dir = temp_dir("list_trees_loads_nodes_only_when_asked");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let deadline = Deadline::none();

    let tree = store
        .create_tree(&deadline, tree_request(ScopeType::Thread, 11, "Storm"))
        .expect("tree");
    add_node(&mut store, tree.id, None, "Grapeshot", 0);

    let request = |include_nodes| ListTreesRequest {
        scope_type: ScopeType::Thread,
        scope_id: 11,
        include_nodes,
    };
    let bare = store.list_trees(&deadline, request(false)).expect("bare");
    assert!(bare[0].nodes.is_empty());
    let full = store.list_trees(&deadline, request(true)).expect("full");
    assert_eq!(full[0].nodes.len(), 1);
    assert_eq!(full[0].nodes[0].card_name, "Grapeshot");
}

#[test]
fn annotations_attach_to_their_node_with_defaults() {
    let storage_dir = temp_dir("annotations_attach_to_their_node_with_defaults");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let deadline = Deadline::none();

    let tree = store
        .create_tree(&deadline, tree_request(ScopeType::Board, 1, "Control"))
        .expect("tree");
    let node = add_node(&mut store, tree.id, None, "Counterspell", 0);

    let annotation = store
        .create_annotation(
            &deadline,
            CreateAnnotationRequest {
                node_id: node,
                kind: None,
                body: " hold up mana ".to_string(),
                label: Some(" ".to_string()),
                tags: Some("blue,tempo".to_string()),
                source_post_id: Some(42),
                created_by: "bob".to_string(),
            },
        )
        .expect("annotation");
    assert_eq!(annotation.kind, "note");
    assert_eq!(annotation.body, "hold up mana");
    assert_eq!(annotation.label, None);
    assert_eq!(
        store
            .annotation_node_id(&deadline, annotation.id)
            .expect("owner"),
        node
    );

    let blank = store.create_annotation(
        &deadline,
        CreateAnnotationRequest {
            node_id: node,
            kind: Some("combo".to_string()),
            body: "  ".to_string(),
            label: None,
            tags: None,
            source_post_id: None,
            created_by: "bob".to_string(),
        },
    );
    assert!(matches!(
        blank,
        Err(StoreError::InvalidInput("annotation body is required"))
    ));

    let fetched = store.get_tree(&deadline, tree.id).expect("get tree");
    assert_eq!(fetched.nodes[0].annotations, vec![annotation.clone()]);
    assert_eq!(fetched.nodes[0].annotations[0].source_post_id, Some(42));

    assert!(store.tree_exists(&deadline, tree.id).expect("exists"));
    let raw = rusqlite::Connection::open(store.db_path()).expect("open raw db");
    raw.execute(
        "UPDATE card_trees SET updated_at_ms=0 WHERE id=?1",
        [tree.id.get()],
    )
    .expect("rewind updated_at");

    store
        .delete_annotation(&deadline, annotation.id)
        .expect("delete annotation");
    let fetched = store.get_tree(&deadline, tree.id).expect("get tree");
    assert!(fetched.nodes[0].annotations.is_empty());
    assert!(fetched.updated_at_ms > 0);
}

#[test]
fn deleting_a_parent_leaves_children_as_promoted_roots() {
    let storage_dir = temp_dir("deleting_a_parent_leaves_children_as_promoted_roots");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let deadline = Deadline::none();

    let tree = store
        .create_tree(&deadline, tree_request(ScopeType::Board, 1, "Elves"))
        .expect("tree");
    let root = add_node(&mut store, tree.id, None, "Llanowar Elves", 0);
    let child = add_node(&mut store, tree.id, Some(root), "Elvish Archdruid", 0);
    let grandchild = add_node(&mut store, tree.id, Some(child), "Craterhoof Behemoth", 0);

    store.delete_node(&deadline, child).expect("delete child");

    let raw = store.get_tree(&deadline, tree.id).expect("get tree");
    let orphan = raw
        .nodes
        .iter()
        .find(|node| node.id == grandchild)
        .expect("grandchild survives");
    assert_eq!(orphan.parent_id, Some(child));

    let assembled = assemble_tree(raw);
    let depths: Vec<(NodeId, usize)> = assembled
        .nodes
        .iter()
        .map(|node| (node.id, node.depth))
        .collect();
    assert_eq!(depths, vec![(root, 0), (grandchild, 0)]);

    assert!(matches!(
        store.delete_node(&deadline, child),
        Err(StoreError::UnknownNode)
    ));
}

#[test]
fn update_node_reparents_and_ancestors_follow() {
    let storage_dir = temp_dir("update_node_reparents_and_ancestors_follow");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let deadline = Deadline::none();

    let tree = store
        .create_tree(&deadline, tree_request(ScopeType::Thread, 2, "Tron"))
        .expect("tree");
    let a = add_node(&mut store, tree.id, None, "Urza's Tower", 0);
    let b = add_node(&mut store, tree.id, Some(a), "Urza's Mine", 0);
    let c = add_node(&mut store, tree.id, None, "Urza's Power Plant", 1);

    assert_eq!(store.node_ancestors(&deadline, b).expect("ancestors"), vec![a]);

    store
        .update_node(
            &deadline,
            UpdateNodeRequest {
                node_id: c,
                parent_id: Some(b),
                card_name: " Karn Liberated ".to_string(),
                position: 5,
            },
        )
        .expect("update node");

    assert_eq!(
        store.node_ancestors(&deadline, c).expect("ancestors"),
        vec![b, a]
    );
    assert_eq!(store.node_tree_id(&deadline, c).expect("tree id"), tree.id);

    let fetched = store.get_tree(&deadline, tree.id).expect("get tree");
    let updated = fetched
        .nodes
        .iter()
        .find(|node| node.id == c)
        .expect("updated node");
    assert_eq!(updated.card_name, "Karn Liberated");
    assert_eq!(updated.position, 5);
    assert_eq!(updated.parent_id, Some(b));
}

#[test]
fn expired_deadline_is_rejected_before_touching_the_store() {
    let storage_dir = temp_dir("expired_deadline_is_rejected_before_touching_the_store");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");

    let expired = Deadline::at(Instant::now());
    let err = store
        .create_tree(&expired, tree_request(ScopeType::Board, 1, "Late"))
        .expect_err("deadline");
    assert!(matches!(err, StoreError::DeadlineExceeded));

    let listed = store
        .list_trees(
            &Deadline::none(),
            ListTreesRequest {
                scope_type: ScopeType::Board,
                scope_id: 1,
                include_nodes: false,
            },
        )
        .expect("list trees");
    assert!(listed.is_empty());
}

#[test]
fn reopen_keeps_rows_and_rejects_foreign_tables() {
    let storage_dir = temp_dir("reopen_keeps_rows_and_rejects_foreign_tables");
    let deadline = Deadline::none();
    let tree_id = {
        let mut store = SqliteStore::open(&storage_dir).expect("open store");
        store
            .create_tree(&deadline, tree_request(ScopeType::Board, 1, "Durable"))
            .expect("tree")
            .id
    };

    let store = SqliteStore::open(&storage_dir).expect("reopen store");
    assert_eq!(
        store.get_tree(&deadline, tree_id).expect("get tree").title,
        "Durable"
    );
    let db_path = store.db_path();
    drop(store);

    let conn = rusqlite::Connection::open(db_path).expect("open raw db");
    conn.execute_batch("CREATE TABLE stray(id INTEGER);")
        .expect("create stray table");
    drop(conn);

    let err = SqliteStore::open(&storage_dir).expect_err("preflight");
    assert!(matches!(
        err,
        StoreError::InvalidInput("RESET_REQUIRED: unsupported tables detected")
    ));
}
