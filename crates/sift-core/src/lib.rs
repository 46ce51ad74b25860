//! Sift Core - predicate trees for filtering collections
//!
//! This crate provides the in-memory model behind user-built filters:
//! - Predicates with include/exclude and enable/disable state
//! - Groups combining predicates with all / any / at-least-N
//! - Typed selections resolved immediately, by global name, or within a
//!   bound environment
//! - Root trees with naming, activity, binding and change tracking
//! - Structural editing (insert, remove, reorder, cross-group move with a
//!   cycle guard) and tree-wide traversal
//! - A kind catalog, TOML configuration and JSON persistence

pub use sift_core_types;

pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod kinds;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod persist;
pub mod traversal;

// Re-export commonly used types
pub use catalog::{Behavior, Catalog, KindDecl};
pub use config::SiftConfig;
pub use domain::{Domain, Environment, FilterItem};
pub use errors::{ErrorKind, Result, SiftError};
pub use model::{
    Combinator, Filter, FilterScratch, Predicate, PredicateGroup, Scope, Selection, SelectionKind,
    Tier, TypedPredicate,
};
pub use ops::{FilterTree, MoveOutcome, Rejection, RootKind};
pub use sift_core_types::{GroupId, HolderId, PredicateId};
