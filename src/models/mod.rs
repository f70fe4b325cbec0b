//! Data models for the bidder console.
//!
//! These models match the REST wire format (camelCase JSON) so records pass
//! between the backend, the directory and the views unchanged.

mod project;
mod resources;

pub use project::*;
pub use resources::*;
