#![forbid(unsafe_code)]

use super::PayloadError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreePayload {
    #[serde(default)]
    pub trees: Vec<PayloadTree>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadTree {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub nodes: Vec<PayloadNode>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadNode {
    pub temp_id: String,
    #[serde(default)]
    pub parent_temp_id: Option<String>,
    pub card_name: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub annotations: Vec<PayloadAnnotation>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadAnnotation {
    #[serde(default)]
    pub kind: Option<String>,
    pub body: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

/// Parses the `tree_payload` form field of a thread or reply submission.
///
/// Blank input and a document without trees both mean "no payload".
pub fn parse_tree_payload(raw: &str) -> Result<Option<TreePayload>, PayloadError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let payload: TreePayload =
        serde_json::from_str(raw).map_err(|err| PayloadError::Malformed(err.to_string()))?;
    if payload.trees.is_empty() {
        return Ok(None);
    }
    Ok(Some(payload))
}
