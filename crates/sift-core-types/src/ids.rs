//! Identity types for predicate tree nodes
//!
//! Identities are minted fresh whenever a node is created or cloned. They
//! are session-scoped: nothing persists them, and a reloaded tree gets new
//! ones.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a single predicate within a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredicateId(Uuid);

impl PredicateId {
    /// Mint a new identity using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PredicateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PredicateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque per-group identifier handed to editing collaborators
///
/// Used to address source and destination groups of a cross-group move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(Uuid);

impl GroupId {
    /// Mint a new identity using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The node that owns a group: either the tree root or a holder predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HolderId {
    Root,
    Predicate(PredicateId),
}

impl HolderId {
    /// Get the predicate id if this holder is a predicate
    pub fn predicate(&self) -> Option<PredicateId> {
        match self {
            HolderId::Root => None,
            HolderId::Predicate(id) => Some(*id),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, HolderId::Root)
    }
}

impl std::fmt::Display for HolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HolderId::Root => write!(f, "root"),
            HolderId::Predicate(id) => write!(f, "{}", id),
        }
    }
}
