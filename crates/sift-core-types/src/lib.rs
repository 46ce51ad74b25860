//! Core types shared across the sift crates
//!
//! - **Identity types**: PredicateId, GroupId, HolderId
//! - **Schema constants**: Canonical field keys and event names

pub mod ids;
pub mod schema;

pub use ids::{GroupId, HolderId, PredicateId};
