#![forbid(unsafe_code)]

//! Display ordering for a stored tree: pre-order, siblings by
//! `(position, id)`, with computed depth.

use crate::ids::NodeId;
use crate::model::{CardTree, CardTreeNode};
use std::collections::{HashMap, HashSet};

/// Replaces `tree.nodes` with its flattened, depth-annotated ordering.
pub fn assemble_tree(mut tree: CardTree) -> CardTree {
    let nodes = std::mem::take(&mut tree.nodes);
    tree.nodes = assemble_nodes(nodes);
    tree
}

/// Nodes whose parent is missing from `nodes` are promoted to depth 0, since a
/// deleted node leaves its children pointing at nothing. Nodes that no root
/// reaches (a stored parent cycle) are promoted too, so every input node is
/// emitted exactly once.
pub fn assemble_nodes(nodes: Vec<CardTreeNode>) -> Vec<CardTreeNode> {
    let present: HashSet<NodeId> = nodes.iter().map(|node| node.id).collect();

    let mut groups: HashMap<Option<NodeId>, Vec<usize>> = HashMap::new();
    for (slot, node) in nodes.iter().enumerate() {
        let key = node.parent_id.filter(|parent| present.contains(parent));
        groups.entry(key).or_default().push(slot);
    }
    for siblings in groups.values_mut() {
        siblings.sort_by_key(|slot| sibling_key(&nodes[*slot]));
    }

    let mut visited = vec![false; nodes.len()];
    let mut order: Vec<(usize, usize)> = Vec::with_capacity(nodes.len());

    let roots = groups.get(&None).cloned().unwrap_or_default();
    for root in roots {
        walk(root, &nodes, &groups, &mut visited, &mut order);
    }

    // Only cycle members and their descendants remain.
    loop {
        let next = (0..nodes.len())
            .filter(|slot| !visited[*slot])
            .min_by_key(|slot| sibling_key(&nodes[*slot]));
        match next {
            Some(slot) => walk(slot, &nodes, &groups, &mut visited, &mut order),
            None => break,
        }
    }

    let mut slots: Vec<Option<CardTreeNode>> = nodes.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|(slot, depth)| {
            slots[slot].take().map(|mut node| {
                node.depth = depth;
                node.indent = depth;
                node
            })
        })
        .collect()
}

fn sibling_key(node: &CardTreeNode) -> (i64, NodeId) {
    (node.position, node.id)
}

fn walk(
    start: usize,
    nodes: &[CardTreeNode],
    groups: &HashMap<Option<NodeId>, Vec<usize>>,
    visited: &mut [bool],
    order: &mut Vec<(usize, usize)>,
) {
    if visited[start] {
        return;
    }
    let mut stack = vec![(start, 0usize)];
    while let Some((slot, depth)) = stack.pop() {
        if visited[slot] {
            continue;
        }
        visited[slot] = true;
        order.push((slot, depth));
        if let Some(children) = groups.get(&Some(nodes[slot].id)) {
            for child in children.iter().rev() {
                if !visited[*child] {
                    stack.push((*child, depth + 1));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TreeId;

    fn node(id: i64, parent: Option<i64>, position: i64) -> CardTreeNode {
        CardTreeNode {
            id: NodeId::new(id),
            tree_id: TreeId::new(1),
            parent_id: parent.map(NodeId::new),
            card_name: format!("card-{id}"),
            position,
            created_by: "alice".to_string(),
            created_at_ms: 0,
            updated_at_ms: 0,
            depth: 0,
            indent: 0,
            annotations: Vec::new(),
        }
    }

    fn shape(nodes: &[CardTreeNode]) -> Vec<(i64, usize)> {
        nodes.iter().map(|n| (n.id.get(), n.depth)).collect()
    }

    #[test]
    fn preorder_with_depth() {
        let out = assemble_nodes(vec![
            node(3, Some(2), 0),
            node(1, None, 0),
            node(2, Some(1), 0),
            node(4, Some(1), 1),
        ]);
        assert_eq!(shape(&out), vec![(1, 0), (2, 1), (3, 2), (4, 1)]);
        assert!(out.iter().all(|n| n.indent == n.depth));
    }

    #[test]
    fn siblings_order_by_position_then_id() {
        let out = assemble_nodes(vec![
            node(1, None, 5),
            node(2, None, 1),
            node(3, None, 5),
            node(4, None, -2),
        ]);
        assert_eq!(shape(&out), vec![(4, 0), (2, 0), (1, 0), (3, 0)]);
    }

    #[test]
    fn orphans_are_promoted_to_roots() {
        let out = assemble_nodes(vec![
            node(1, None, 0),
            node(5, Some(99), 0),
            node(6, Some(5), 0),
        ]);
        assert_eq!(shape(&out), vec![(1, 0), (5, 0), (6, 1)]);
    }

    #[test]
    fn stored_cycle_still_emits_every_node_once() {
        let out = assemble_nodes(vec![
            node(1, None, 0),
            node(2, Some(3), 0),
            node(3, Some(2), 1),
            node(4, Some(3), 0),
        ]);
        assert_eq!(shape(&out), vec![(1, 0), (2, 0), (3, 1), (4, 2)]);
    }

    #[test]
    fn every_child_is_one_deeper_than_its_parent() {
        let out = assemble_nodes(vec![
            node(10, None, 0),
            node(11, Some(10), 0),
            node(12, Some(11), 0),
            node(13, Some(10), 2),
            node(14, Some(40), 0),
        ]);
        let depth_of: HashMap<NodeId, usize> = out.iter().map(|n| (n.id, n.depth)).collect();
        for n in out.iter() {
            match n.parent_id.and_then(|p| depth_of.get(&p)) {
                Some(parent_depth) => assert_eq!(n.depth, parent_depth + 1),
                None => assert_eq!(n.depth, 0),
            }
        }
        assert_eq!(out.len(), 5);
    }
}
