#![forbid(unsafe_code)]

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("malformed tree payload: {0}")]
    Malformed(String),
    #[error("invalid tree payload (tree #{tree}): {message}")]
    Invalid { tree: usize, message: &'static str },
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// The batch cannot be ordered parent-first. Always rejects the whole submission.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error(
        "unresolvable tree payload (tree #{tree}): node {temp_id:?} references unknown parent {parent_temp_id:?}"
    )]
    Dangling {
        tree: usize,
        temp_id: String,
        parent_temp_id: String,
    },
    #[error("unresolvable tree payload (tree #{tree}): parent cycle {}", .temp_ids.join(" -> "))]
    Cycle { tree: usize, temp_ids: Vec<String> },
}

impl ResolutionError {
    pub fn tree(&self) -> usize {
        match self {
            Self::Dangling { tree, .. } | Self::Cycle { tree, .. } => *tree,
        }
    }
}
