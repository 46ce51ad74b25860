use std::any::Any;
use std::fmt;

use serde_json::Value;
use sift_core_types::{HolderId, PredicateId};

use super::group::PredicateGroup;
use super::typed::Tier;
use crate::domain::{Domain, FilterItem};
use crate::errors::Result;

/// Capability interface every concrete predicate kind implements
///
/// Holder kinds (kinds that own a nested [`PredicateGroup`]) expose it
/// through [`Filter::group`] / [`Filter::group_mut`]; everything else about
/// nesting is handled by the tree.
pub trait Filter<D: Domain>: fmt::Debug + 'static {
    /// Raw match of this filter against one item, before include/exclude
    fn evaluates_directly(&self, item: &D::Item) -> bool;

    /// Independent copy following the kind's clone semantics
    fn clone_filter(&self) -> Box<dyn Filter<D>>;

    /// Resolution tier of the selection, if this kind has one
    fn tier(&self) -> Option<Tier> {
        None
    }

    /// Resolve a saved name against the global registry
    fn resolve_global(&mut self, _label: &str, _registry: &D::Registry) {}

    /// Resolve a saved name against an environment
    fn resolve_in(&mut self, _label: &str, _env: &D::Env) {}

    /// Set when a saved name failed to resolve
    fn selection_error(&self) -> Option<&str> {
        None
    }

    /// Kind-specific state for persistence
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the state cannot be encoded.
    fn save_state(&self) -> Result<Value> {
        Ok(Value::Null)
    }

    /// Restore kind-specific state written by [`Filter::save_state`]
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the state does not belong to this kind.
    fn load_state(&mut self, _state: &Value) -> Result<()> {
        Ok(())
    }

    fn group(&self) -> Option<&PredicateGroup<D>> {
        None
    }

    fn group_mut(&mut self) -> Option<&mut PredicateGroup<D>> {
        None
    }

    /// Whether editors may drop predicates into this kind's group
    fn accepts_moves(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A single node of a predicate tree
///
/// Owned by exactly one [`PredicateGroup`]. The parent link names the holder
/// of that group and is only used for lookups.
#[derive(Debug)]
pub struct Predicate<D: Domain> {
    id: PredicateId,
    parent: Option<HolderId>,
    kind: String,
    label: String,
    enabled: bool,
    include: bool,
    disable_reason: Option<String>,
    filter: Box<dyn Filter<D>>,
}

impl<D: Domain> Predicate<D> {
    /// Create a detached predicate with a fresh identity
    ///
    /// The label defaults to the kind.
    pub fn new(kind: impl Into<String>, filter: Box<dyn Filter<D>>) -> Self {
        let kind = kind.into();
        let mut predicate = Self {
            id: PredicateId::new(),
            parent: None,
            label: kind.clone(),
            kind,
            enabled: true,
            include: true,
            disable_reason: None,
            filter,
        };
        predicate.rehome();
        predicate
    }

    /// Set the human label used in resolution error messages
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn id(&self) -> PredicateId {
        self.id
    }

    pub fn parent(&self) -> Option<HolderId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<HolderId>) {
        self.parent = parent;
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Raw enabled flag, ignoring any disable reason
    pub fn enabled_flag(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn include(&self) -> bool {
        self.include
    }

    pub fn set_include(&mut self, include: bool) {
        self.include = include;
    }

    /// Why this predicate is disabled, if it is forced off
    ///
    /// A selection error counts as a disable reason.
    pub fn disable_reason(&self) -> Option<&str> {
        self.disable_reason
            .as_deref()
            .or_else(|| self.filter.selection_error())
    }

    pub fn set_disable_reason(&mut self, reason: Option<String>) {
        self.disable_reason = reason;
    }

    /// Effective enabled state: flag on and nothing forcing it off
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.disable_reason().is_none()
    }

    pub fn selection_error(&self) -> Option<&str> {
        self.filter.selection_error()
    }

    /// Evaluate this predicate against one item
    ///
    /// When the raw match fails and the item wraps an inner item, the raw
    /// match is retried once on the inner item. This lets a wrapped item
    /// satisfy "what is it made of" predicates through its contents while
    /// position or status predicates still see the outer item. The fallback
    /// never fires on a successful outer match and never recurses further.
    pub fn applies_to(&self, item: &D::Item) -> bool {
        let mut matched = self.filter.evaluates_directly(item);
        if !matched {
            if let Some(inner) = item.wrapped_item() {
                matched = self.filter.evaluates_directly(inner);
            }
        }
        matched == self.include
    }

    pub fn filter(&self) -> &dyn Filter<D> {
        self.filter.as_ref()
    }

    pub fn filter_mut(&mut self) -> &mut dyn Filter<D> {
        self.filter.as_mut()
    }

    /// Downcast the behavior to a concrete kind
    pub fn filter_as<F: Filter<D>>(&self) -> Option<&F> {
        self.filter.as_any().downcast_ref::<F>()
    }

    pub fn filter_as_mut<F: Filter<D>>(&mut self) -> Option<&mut F> {
        self.filter.as_any_mut().downcast_mut::<F>()
    }

    pub fn group(&self) -> Option<&PredicateGroup<D>> {
        self.filter.group()
    }

    pub fn group_mut(&mut self) -> Option<&mut PredicateGroup<D>> {
        self.filter.group_mut()
    }

    pub fn is_holder(&self) -> bool {
        self.filter.group().is_some()
    }

    pub fn accepts_moves(&self) -> bool {
        self.is_holder() && self.filter.accepts_moves()
    }

    pub fn resolve_global(&mut self, registry: &D::Registry) {
        self.filter.resolve_global(&self.label, registry);
        self.report_selection_error();
    }

    pub fn resolve_in(&mut self, env: &D::Env) {
        self.filter.resolve_in(&self.label, env);
        self.report_selection_error();
    }

    fn report_selection_error(&self) {
        if let Some(err) = self.filter.selection_error() {
            tracing::warn!(
                predicate_id = %self.id,
                kind = %self.kind,
                error = err,
                "selection could not be resolved; predicate disabled"
            );
        }
    }

    /// Independent copy with a fresh identity and no owner
    ///
    /// Nested groups are copied member by member, each with a fresh identity.
    pub fn duplicate(&self) -> Self {
        let mut copy = Self {
            id: PredicateId::new(),
            parent: None,
            kind: self.kind.clone(),
            label: self.label.clone(),
            enabled: self.enabled,
            include: self.include,
            disable_reason: self.disable_reason.clone(),
            filter: self.filter.clone_filter(),
        };
        copy.rehome();
        copy
    }

    /// Point the nested group (if any) back at this predicate
    fn rehome(&mut self) {
        let holder = HolderId::Predicate(self.id);
        if let Some(group) = self.filter.group_mut() {
            group.rehome(holder);
        }
    }
}
