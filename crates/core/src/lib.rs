#![forbid(unsafe_code)]

//! Card tree domain: ids, rows, request deadlines, batch payload planning and
//! display assembly. No I/O lives here.

pub mod assemble;
pub mod deadline;
pub mod ids;
pub mod model;
pub mod payload;

pub use assemble::{assemble_nodes, assemble_tree};
pub use deadline::{Deadline, DeadlineExceeded};
pub use ids::{AnnotationId, NodeId, TreeId};
pub use model::{CardTree, CardTreeAnnotation, CardTreeNode, ScopeType, UnknownScopeType};
