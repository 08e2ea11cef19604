#![forbid(unsafe_code)]

use super::{PayloadAnnotation, PayloadError, PayloadNode, PayloadTree, ResolutionError, TreePayload};
use crate::model::{normalize_kind, normalize_optional};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreePlan {
    pub title: String,
    pub description: Option<String>,
    pub is_primary: bool,
    /// Parent-first: every `parent_temp_id` names an earlier entry.
    pub nodes: Vec<PlannedNode>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedNode {
    pub temp_id: String,
    pub parent_temp_id: Option<String>,
    pub card_name: String,
    pub position: i64,
    pub annotations: Vec<PlannedAnnotation>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedAnnotation {
    pub kind: String,
    pub body: String,
    pub label: Option<String>,
    pub tags: Option<String>,
}

/// Validates the whole document and orders every tree parent-first.
///
/// Nothing is returned unless every tree plans cleanly, so callers can run the
/// result without a partial-failure path.
pub fn plan_payload(payload: &TreePayload) -> Result<Vec<TreePlan>, PayloadError> {
    payload
        .trees
        .iter()
        .enumerate()
        .map(|(index, tree)| plan_tree(index, tree))
        .collect()
}

pub fn plan_tree(index: usize, tree: &PayloadTree) -> Result<TreePlan, PayloadError> {
    let invalid = |message| PayloadError::Invalid {
        tree: index,
        message,
    };

    let title = tree.title.trim();
    if title.is_empty() {
        return Err(invalid("tree title is required"));
    }

    let mut slots: HashMap<&str, usize> = HashMap::with_capacity(tree.nodes.len());
    for (slot, node) in tree.nodes.iter().enumerate() {
        let temp_id = node.temp_id.trim();
        if temp_id.is_empty() {
            return Err(invalid("node temp_id is required"));
        }
        if node.card_name.trim().is_empty() {
            return Err(invalid("card name is required"));
        }
        if node
            .annotations
            .iter()
            .any(|annotation| annotation.body.trim().is_empty())
        {
            return Err(invalid("annotation body is required"));
        }
        if slots.insert(temp_id, slot).is_some() {
            return Err(invalid("node temp_id must be unique within a tree"));
        }
    }

    let mut parents: Vec<Option<usize>> = Vec::with_capacity(tree.nodes.len());
    for node in tree.nodes.iter() {
        let parent = match parent_key(node) {
            None => None,
            Some(key) => match slots.get(key) {
                Some(slot) => Some(*slot),
                None => {
                    return Err(ResolutionError::Dangling {
                        tree: index,
                        temp_id: node.temp_id.trim().to_string(),
                        parent_temp_id: key.to_string(),
                    }
                    .into());
                }
            },
        };
        parents.push(parent);
    }

    let order = topological_order(&parents).map_err(|cycle| ResolutionError::Cycle {
        tree: index,
        temp_ids: cycle
            .into_iter()
            .map(|slot| tree.nodes[slot].temp_id.trim().to_string())
            .collect(),
    })?;

    let nodes = order
        .into_iter()
        .map(|slot| planned_node(&tree.nodes[slot]))
        .collect();

    Ok(TreePlan {
        title: title.to_string(),
        description: normalize_optional(tree.description.as_deref()),
        is_primary: tree.is_primary,
        nodes,
    })
}

fn parent_key(node: &PayloadNode) -> Option<&str> {
    node.parent_temp_id
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Kahn's algorithm over the parent -> child adjacency. Among ready slots the
/// lowest input index goes first, so already-ordered input keeps its order.
///
/// On failure returns the slots of one cycle, in parent-walk order.
fn topological_order(parents: &[Option<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); parents.len()];
    let mut ready = BinaryHeap::new();
    for (slot, parent) in parents.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(slot),
            None => ready.push(Reverse(slot)),
        }
    }

    let mut order = Vec::with_capacity(parents.len());
    while let Some(Reverse(slot)) = ready.pop() {
        order.push(slot);
        for child in children[slot].iter() {
            ready.push(Reverse(*child));
        }
    }

    if order.len() == parents.len() {
        return Ok(order);
    }

    let mut resolved = vec![false; parents.len()];
    for slot in order {
        resolved[slot] = true;
    }
    let start = resolved.iter().position(|done| !done).unwrap_or(0);
    Err(find_cycle(parents, start))
}

// Every unresolved slot has a parent chain that never reaches a root, so the
// walk must revisit a slot.
fn find_cycle(parents: &[Option<usize>], start: usize) -> Vec<usize> {
    let mut walk: Vec<usize> = Vec::new();
    let mut seen_at: HashMap<usize, usize> = HashMap::new();
    let mut current = Some(start);
    while let Some(slot) = current {
        if let Some(first) = seen_at.get(&slot) {
            return walk.split_off(*first);
        }
        seen_at.insert(slot, walk.len());
        walk.push(slot);
        current = parents[slot];
    }
    walk
}

fn planned_node(node: &PayloadNode) -> PlannedNode {
    PlannedNode {
        temp_id: node.temp_id.trim().to_string(),
        parent_temp_id: parent_key(node).map(str::to_string),
        card_name: node.card_name.trim().to_string(),
        position: node.position,
        annotations: node.annotations.iter().map(planned_annotation).collect(),
    }
}

fn planned_annotation(annotation: &PayloadAnnotation) -> PlannedAnnotation {
    PlannedAnnotation {
        kind: normalize_kind(annotation.kind.as_deref()),
        body: annotation.body.trim().to_string(),
        label: normalize_optional(annotation.label.as_deref()),
        tags: normalize_optional(annotation.tags.as_deref()),
    }
}
