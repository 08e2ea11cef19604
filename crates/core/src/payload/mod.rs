#![forbid(unsafe_code)]

//! Batch tree documents submitted alongside a post, and the planning step that
//! turns their temp-id links into a parent-first creation order.

mod error;
mod plan;
mod types;

pub use error::*;
pub use plan::*;
pub use types::*;
