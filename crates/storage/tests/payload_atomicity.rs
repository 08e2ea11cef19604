#![forbid(unsafe_code)]

use ct_core::payload::{
    PayloadAnnotation, PayloadError, PayloadNode, PayloadTree, ResolutionError, TreePayload,
};
use ct_core::{Deadline, ScopeType, assemble_tree};
use ct_storage::{ApplyTreePayloadRequest, SqliteStore, StoreError};
use rusqlite::Connection;
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

fn row_counts(store: &SqliteStore) -> (i64, i64, i64) {
    let conn = Connection::open(store.db_path()).expect("open raw db");
    let count = |table: &str| {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get::<_, i64>(0)
        })
        .expect("count rows")
    };
    (
        count("card_trees"),
        count("card_tree_nodes"),
        count("card_tree_annotations"),
    )
}

fn node(temp_id: &str, parent: Option<&str>, card_name: &str) -> PayloadNode {
    PayloadNode {
        temp_id: temp_id.to_string(),
        parent_temp_id: parent.map(str::to_string),
        card_name: card_name.to_string(),
        position: 0,
        annotations: vec![PayloadAnnotation {
            kind: None,
            body: format!("why {card_name}"),
            label: None,
            tags: None,
        }],
    }
}

fn tree(title: &str, nodes: Vec<PayloadNode>) -> PayloadTree {
    PayloadTree {
        title: title.to_string(),
        description: Some("from a reply".to_string()),
        is_primary: false,
        nodes,
    }
}

fn request(trees: Vec<PayloadTree>) -> ApplyTreePayloadRequest {
    ApplyTreePayloadRequest {
        scope_type: ScopeType::Post,
        scope_id: 501,
        source_post_id: Some(501),
        created_by: "carol".to_string(),
        payload: TreePayload { trees },
    }
}

#[test]
fn chain_submitted_out_of_order_assembles_as_zero_one_two() {
    let storage_dir = temp_dir("chain_submitted_out_of_order_assembles_as_zero_one_two");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let deadline = Deadline::none();

    let created = store
        .apply_tree_payload(
            &deadline,
            request(vec![tree(
                "Chain",
                vec![
                    node("c", Some("b"), "Fireblast"),
                    node("a", None, "Mountain"),
                    node("b", Some("a"), "Monastery Swiftspear"),
                ],
            )]),
        )
        .expect("apply payload");
    assert_eq!(created.len(), 1);
    assert_eq!(row_counts(&store), (1, 3, 3));

    let fetched = assemble_tree(store.get_tree(&deadline, created[0].id).expect("get tree"));
    let shape: Vec<(&str, usize)> = fetched
        .nodes
        .iter()
        .map(|node| (node.card_name.as_str(), node.depth))
        .collect();
    assert_eq!(
        shape,
        vec![
            ("Mountain", 0),
            ("Monastery Swiftspear", 1),
            ("Fireblast", 2)
        ]
    );
    for node in fetched.nodes.iter() {
        assert_eq!(node.indent, node.depth);
        assert_eq!(node.annotations.len(), 1);
        assert_eq!(node.annotations[0].kind, "note");
        assert_eq!(node.annotations[0].source_post_id, Some(501));
    }
    assert_eq!(fetched.scope_type, ScopeType::Post);
    assert_eq!(fetched.scope_id, 501);
}

#[test]
fn self_cycle_rejects_the_whole_batch() {
    let storage_dir = temp_dir("self_cycle_rejects_the_whole_batch");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");

    let err = store
        .apply_tree_payload(
            &Deadline::none(),
            request(vec![
                tree("Fine", vec![node("a", None, "Island")]),
                tree("Broken", vec![node("x", Some("x"), "Ouroboros")]),
            ]),
        )
        .expect_err("self cycle");
    match err {
        StoreError::Payload(PayloadError::Resolution(ResolutionError::Cycle { tree, temp_ids })) => {
            assert_eq!(tree, 1);
            assert_eq!(temp_ids, vec!["x".to_string()]);
        }
        other => panic!("expected cycle, got {other:?}"),
    }
    assert_eq!(row_counts(&store), (0, 0, 0));
}

#[test]
fn two_node_cycle_and_dangling_parent_leave_no_rows() {
    let storage_dir = temp_dir("two_node_cycle_and_dangling_parent_leave_no_rows");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let deadline = Deadline::none();

    let cycle = store.apply_tree_payload(
        &deadline,
        request(vec![tree(
            "Loop",
            vec![node("a", Some("b"), "Kiki-Jiki"), node("b", Some("a"), "Pestermite")],
        )]),
    );
    assert!(matches!(
        cycle,
        Err(StoreError::Payload(PayloadError::Resolution(
            ResolutionError::Cycle { .. }
        )))
    ));

    let dangling = store.apply_tree_payload(
        &deadline,
        request(vec![tree("Lost", vec![node("a", Some("nowhere"), "Opt")])]),
    );
    assert!(matches!(
        dangling,
        Err(StoreError::Payload(PayloadError::Resolution(
            ResolutionError::Dangling { .. }
        )))
    ));

    assert_eq!(row_counts(&store), (0, 0, 0));
}

#[test]
fn multi_tree_batch_commits_together() {
    let storage_dir = temp_dir("multi_tree_batch_commits_together");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");

    let created = store
        .apply_tree_payload(
            &Deadline::none(),
            request(vec![
                tree("Main", vec![node("a", None, "Plains"), node("b", Some("a"), "Thalia")]),
                tree("Side", vec![node("a", None, "Rest in Peace")]),
            ]),
        )
        .expect("apply payload");
    assert_eq!(created.len(), 2);
    assert_eq!(created[0].nodes.len(), 2);
    assert_eq!(created[0].nodes[1].parent_id, Some(created[0].nodes[0].id));
    assert_eq!(created[1].nodes[0].parent_id, None);
    assert_eq!(row_counts(&store), (2, 3, 3));
}

#[test]
fn empty_payload_is_a_no_op_and_expired_deadline_writes_nothing() {
    let storage_dir = temp_dir("empty_payload_is_a_no_op_and_expired_deadline_writes_nothing");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");

    let created = store
        .apply_tree_payload(&Deadline::none(), request(Vec::new()))
        .expect("empty payload");
    assert!(created.is_empty());

    let err = store
        .apply_tree_payload(
            &Deadline::at(Instant::now()),
            request(vec![tree("Late", vec![node("a", None, "Time Walk")])]),
        )
        .expect_err("deadline");
    assert!(matches!(err, StoreError::DeadlineExceeded));
    assert_eq!(row_counts(&store), (0, 0, 0));
}

#[test]
fn storage_failure_mid_batch_rolls_back_earlier_trees() {
    let storage_dir = temp_dir("storage_failure_mid_batch_rolls_back_earlier_trees");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let raw = Connection::open(store.db_path()).expect("open raw db");
    raw.execute_batch(
        "CREATE TRIGGER reject_boom BEFORE INSERT ON card_tree_nodes \
         WHEN NEW.card_name = 'Boom' \
         BEGIN SELECT RAISE(ABORT, 'boom'); END;",
    )
    .expect("install trigger");

    let err = store
        .apply_tree_payload(
            &Deadline::none(),
            request(vec![
                tree("Main", vec![node("a", None, "Plains"), node("b", Some("a"), "Thalia")]),
                tree("Side", vec![node("a", None, "Ornithopter"), node("b", Some("a"), "Boom")]),
            ]),
        )
        .expect_err("trigger aborts the second tree");
    match err {
        StoreError::Sql(sql) => assert!(sql.to_string().contains("boom"), "{sql}"),
        other => panic!("expected sqlite failure, got {other:?}"),
    }
    assert_eq!(row_counts(&store), (0, 0, 0));
}
