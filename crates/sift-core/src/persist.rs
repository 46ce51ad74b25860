//! Saving and loading predicate trees
//!
//! A saved tree is a plain serde value, independent of any storage. Per node
//! it records, in order: kind, enabled, include, kind state, then the nested
//! group for holder kinds. Identities, the changed flag, resolution errors
//! and the bound environment are never written.
//!
//! Loading is the first of two resolution phases: every node is rebuilt
//! through the catalog and globally-resolvable names are resolved at once.
//! Environment-bound names wait for [`FilterTree::bind_environment`].
//!
//! ## Fingerprints
//!
//! [`fingerprint`] hashes the canonical JSON of a saved tree with `saved_at`
//! excluded, so two saves of the same tree state produce the same value.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::catalog::Catalog;
use crate::domain::Domain;
use crate::errors::{Result, SiftError};
use crate::model::{Combinator, PredicateGroup};
use crate::ops::{FilterTree, RootKind};
use crate::{log_op_end, log_op_error, log_op_start};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTree {
    pub name: String,
    pub active: bool,
    #[serde(default)]
    pub root_kind: RootKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    pub group: SavedGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedGroup {
    pub combinator: Combinator,
    #[serde(default)]
    pub members: Vec<SavedPredicate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPredicate {
    pub kind: String,
    pub enabled: bool,
    pub include: bool,
    /// Kind-specific state; absent for kinds that keep none
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub state: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<SavedGroup>,
}

/// Capture a tree's persistent state
///
/// Does not clear the tree's changed flag; call
/// [`FilterTree::mark_saved`] once the result is stored.
///
/// # Errors
///
/// Returns `Serialization` if a predicate's state cannot be encoded.
pub fn save<D: Domain>(tree: &FilterTree<D>) -> Result<SavedTree> {
    log_op_start!("save_tree", tree_name = tree.name());
    let start = Instant::now();

    let group = save_group(tree.group()).map_err(|e| {
        log_op_error!(
            "save_tree",
            e,
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;
    let saved = SavedTree {
        name: tree.name().to_string(),
        active: tree.is_active(),
        root_kind: tree.root_kind(),
        saved_at: Some(Utc::now()),
        group,
    };

    log_op_end!("save_tree", duration_ms = start.elapsed().as_millis() as u64);
    Ok(saved)
}

fn save_group<D: Domain>(group: &PredicateGroup<D>) -> Result<SavedGroup> {
    let members = group
        .members()
        .iter()
        .map(|p| -> Result<SavedPredicate> {
            Ok(SavedPredicate {
                kind: p.kind().to_string(),
                enabled: p.enabled_flag(),
                include: p.include(),
                state: p.filter().save_state()?,
                group: p.group().map(save_group).transpose()?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(SavedGroup {
        combinator: group.combinator(),
        members,
    })
}

/// Rebuild a tree and run the global resolution pass
///
/// The returned tree is unbound and unmodified. Names that fail to resolve
/// leave their predicate disabled with a selection error; that is not a
/// load failure.
///
/// # Errors
///
/// - `CatalogNotValidated` / `UnknownKind` if a kind cannot be built
/// - `InvalidState` if a node's saved state does not fit its kind, or a
///   nested group was saved under a kind that holds none
pub fn load<D: Domain>(
    saved: &SavedTree,
    catalog: &Catalog<D>,
    registry: &D::Registry,
) -> Result<FilterTree<D>> {
    log_op_start!("load_tree", tree_name = %saved.name);
    let start = Instant::now();

    let mut tree = FilterTree::with_combinator(
        saved.name.clone(),
        saved.root_kind,
        saved.group.combinator,
    );
    tree.set_active(saved.active);
    load_group(&saved.group, tree.group_mut(), catalog).map_err(|e| {
        log_op_error!(
            "load_tree",
            e,
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;
    tree.resolve_global(registry);
    tree.mark_saved();

    log_op_end!(
        "load_tree",
        duration_ms = start.elapsed().as_millis() as u64,
        errors = tree.errors().len()
    );
    Ok(tree)
}

fn load_group<D: Domain>(
    saved: &SavedGroup,
    group: &mut PredicateGroup<D>,
    catalog: &Catalog<D>,
) -> Result<()> {
    for node in &saved.members {
        let mut predicate = catalog.create(&node.kind)?;
        predicate.set_enabled(node.enabled);
        predicate.set_include(node.include);
        if !node.state.is_null() {
            predicate.filter_mut().load_state(&node.state)?;
        }
        if let Some(nested) = &node.group {
            let inner = predicate.group_mut().ok_or_else(|| {
                SiftError::invalid_state(&node.kind, "nested group saved for a kind that holds none")
            })?;
            inner.set_combinator(nested.combinator);
            load_group(nested, inner, catalog)?;
        }
        group.add(predicate, None)?;
    }
    Ok(())
}

/// Pretty JSON text of a saved tree
///
/// # Errors
///
/// Returns `Serialization` if encoding fails.
pub fn to_json(saved: &SavedTree) -> Result<String> {
    Ok(serde_json::to_string_pretty(saved)?)
}

/// Parse JSON text written by [`to_json`]
///
/// # Errors
///
/// Returns `Serialization` if the text is not a saved tree.
pub fn from_json(text: &str) -> Result<SavedTree> {
    Ok(serde_json::from_str(text)?)
}

/// Hex SHA-256 of the saved tree's canonical JSON, ignoring `saved_at`
///
/// # Errors
///
/// Returns `Serialization` if encoding fails.
pub fn fingerprint(saved: &SavedTree) -> Result<String> {
    let mut copy = saved.clone();
    copy.saved_at = None;
    let canonical = serde_json::to_string(&copy)?;
    Ok(hash_string(&canonical))
}

fn hash_string(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
