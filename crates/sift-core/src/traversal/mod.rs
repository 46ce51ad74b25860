//! Tree-wide traversal
//!
//! [`Walk`] is the lazy, restartable pre-order sequence behind every
//! gather-style query. Side-effecting passes use
//! `PredicateGroup::for_each_predicate` / `for_each_holder` instead.

pub mod walk;

pub use walk::{Visit, Walk};
