//! Collaborator interfaces consumed by the predicate tree
//!
//! The tree never owns the collection it filters, the registry it resolves
//! names against, or the environments it is bound to. A [`Domain`] names the
//! three types so every tree, group and predicate is parameterized once.

use std::fmt;

/// Binds together the types a predicate tree works over
pub trait Domain: fmt::Debug + Sized + 'static {
    /// The object being tested against the tree
    type Item: FilterItem;

    /// Global registry, available as soon as the application starts
    type Registry;

    /// Session-scoped context that environment-bound names resolve in
    type Env: Environment;
}

/// Traversal hooks an item exposes to the tree
pub trait FilterItem {
    /// The item this one wraps, if any
    ///
    /// Must never return `self`. Used for the single inner-item fallback
    /// step of predicate evaluation.
    fn wrapped_item(&self) -> Option<&Self> {
        None
    }

    /// Containers enclosing this item, innermost first
    fn container_chain(&self) -> Vec<&Self> {
        Vec::new()
    }
}

/// A resolution scope for environment-bound names
pub trait Environment {
    /// Human-readable label used in resolution error messages
    fn label(&self) -> String;
}
