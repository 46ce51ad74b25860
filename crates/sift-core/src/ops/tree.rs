use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sift_core_types::{GroupId, HolderId, PredicateId};

use crate::config::TreeConfig;
use crate::domain::{Domain, Environment};
use crate::model::{Combinator, FilterScratch, Predicate, PredicateGroup, Tier};
use crate::traversal::{Visit, Walk};
use crate::{log_op_end, log_op_start};

/// Which flavor of root a tree is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKind {
    /// A plain named holder of predicates
    #[default]
    Holder,
    /// A saved search
    Search,
}

/// Root of a predicate tree
///
/// Owns the top-level group and carries the tree's name, whether it takes
/// part in live filtering, the environment it is bound to, and the dirty
/// flag collaborators use to know a re-filter or re-save is due.
///
/// Not thread-safe: structural edits and filtering must be serialized by the
/// caller, typically by owning the tree on one thread.
pub struct FilterTree<D: Domain> {
    name: String,
    root_kind: RootKind,
    active: bool,
    bound: Option<Weak<D::Env>>,
    changed: bool,
    modified_at: Option<DateTime<Utc>>,
    pub(crate) group: PredicateGroup<D>,
}

impl<D: Domain> fmt::Debug for FilterTree<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterTree")
            .field("name", &self.name)
            .field("root_kind", &self.root_kind)
            .field("active", &self.active)
            .field("bound", &self.is_bound())
            .field("changed", &self.changed)
            .field("group", &self.group)
            .finish()
    }
}

impl<D: Domain> FilterTree<D> {
    /// Create an empty, unbound, unmodified tree
    pub fn new(name: impl Into<String>, root_kind: RootKind) -> Self {
        Self::with_combinator(name, root_kind, Combinator::default())
    }

    pub fn with_combinator(
        name: impl Into<String>,
        root_kind: RootKind,
        combinator: Combinator,
    ) -> Self {
        Self {
            name: name.into(),
            root_kind,
            active: true,
            bound: None,
            changed: false,
            modified_at: None,
            group: PredicateGroup::new(HolderId::Root, combinator),
        }
    }

    /// Create a tree using configured defaults for name and combinator
    pub fn from_config(config: &TreeConfig, root_kind: RootKind) -> Self {
        Self::with_combinator(config.default_name.clone(), root_kind, config.default_combinator)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.mark_changed();
    }

    pub fn root_kind(&self) -> RootKind {
        self.root_kind
    }

    /// Whether this tree takes part in live filtering
    ///
    /// Advisory only: an inactive tree still evaluates.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        if self.active != active {
            self.active = active;
            self.mark_changed();
        }
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Flag the tree as modified
    pub fn mark_changed(&mut self) {
        self.changed = true;
        self.modified_at = Some(Utc::now());
    }

    /// Clear the dirty flag after the tree has been persisted
    pub fn mark_saved(&mut self) {
        self.changed = false;
    }

    /// When the tree was last modified in this session
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn group(&self) -> &PredicateGroup<D> {
        &self.group
    }

    /// Mutable access to the root group
    ///
    /// Edits made through this handle do not mark the tree changed; prefer
    /// the tree's own editing methods.
    pub fn group_mut(&mut self) -> &mut PredicateGroup<D> {
        &mut self.group
    }

    pub fn root_group_id(&self) -> GroupId {
        self.group.id()
    }

    // ===== Evaluation =====

    pub fn applies_to(&self, item: &D::Item) -> bool {
        self.group.applies_to(item)
    }

    /// Bulk filter using caller-owned buffers; see [`PredicateGroup::filter_into`]
    pub fn filter_into<'a>(
        &self,
        items: &'a [D::Item],
        scratch: &mut FilterScratch,
        out: &mut Vec<&'a D::Item>,
    ) {
        let start = Instant::now();
        self.group.filter_into(items, scratch, out);
        tracing::debug!(
            tree_name = %self.name,
            item_count = items.len(),
            kept = out.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "filtered collection"
        );
    }

    pub fn filter<'a>(&self, items: &'a [D::Item]) -> Vec<&'a D::Item> {
        self.group.filter(items)
    }

    // ===== Traversal =====

    /// Pre-order walk over every holder and predicate, starting at the root
    pub fn walk(&self) -> Walk<'_, D> {
        self.group.walk()
    }

    /// Lazily apply `selector` over the walk, keeping the non-absent results
    pub fn gather<'a, T: 'a>(
        &'a self,
        selector: impl FnMut(Visit<'a, D>) -> Option<T> + 'a,
    ) -> impl Iterator<Item = T> + 'a {
        self.walk().filter_map(selector)
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate<D>> + '_ {
        self.gather(|v| v.as_predicate())
    }

    pub fn for_each_predicate(&mut self, visit: impl FnMut(&mut Predicate<D>)) {
        self.group.for_each_predicate(visit);
    }

    pub fn for_each_holder(&mut self, visit: impl FnMut(&mut PredicateGroup<D>)) {
        self.group.for_each_holder(visit);
    }

    pub fn find_predicate(&self, id: PredicateId) -> Option<&Predicate<D>> {
        self.group.find_predicate(id)
    }

    pub fn find_group(&self, id: GroupId) -> Option<&PredicateGroup<D>> {
        self.group.find_group(id)
    }

    /// Every predicate whose saved name failed to resolve, with the message
    pub fn errors(&self) -> Vec<(PredicateId, String)> {
        self.predicates()
            .filter_map(|p| p.selection_error().map(|e| (p.id(), e.to_string())))
            .collect()
    }

    // ===== Parent links =====

    /// Holder owning the group a predicate sits in
    pub fn parent_of(&self, id: PredicateId) -> Option<HolderId> {
        self.find_predicate(id).and_then(|p| p.parent())
    }

    /// Holder chain from `holder` up to and including the root
    ///
    /// Stops early if a parent link is missing or loops back on itself.
    pub fn ancestors(&self, holder: HolderId) -> Vec<HolderId> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(holder);

        while let Some(h) = current {
            chain.push(h);
            current = match h {
                HolderId::Root => None,
                HolderId::Predicate(id) => {
                    if !visited.insert(id) {
                        break;
                    }
                    self.parent_of(id)
                }
            };
        }
        chain
    }

    // ===== Resolution and environment binding =====

    /// Resolve globally-resolvable names (the first phase after load)
    pub fn resolve_global(&mut self, registry: &D::Registry) {
        log_op_start!("resolve_global", tree_name = %self.name);
        let start = Instant::now();
        self.group.for_each_predicate(|p| p.resolve_global(registry));
        log_op_end!(
            "resolve_global",
            duration_ms = start.elapsed().as_millis() as u64,
            errors = self.errors().len()
        );
    }

    pub fn is_bound(&self) -> bool {
        self.bound_environment().is_some()
    }

    /// The environment this tree is bound to, if it is still alive
    pub fn bound_environment(&self) -> Option<Rc<D::Env>> {
        self.bound.as_ref().and_then(Weak::upgrade)
    }

    /// Bind to an environment and resolve environment-bound names in it
    ///
    /// No-op if already bound to this same environment.
    pub fn bind_environment(&mut self, env: &Rc<D::Env>) {
        if self
            .bound_environment()
            .is_some_and(|current| Rc::ptr_eq(&current, env))
        {
            tracing::debug!(tree_name = %self.name, "already bound to environment");
            return;
        }
        self.bound = Some(Rc::downgrade(env));
        self.resolve_environment(env, "bind_environment");
    }

    /// Forget the bound environment; resolved selections are left as they are
    pub fn unbind_environment(&mut self) {
        self.bound = None;
        tracing::debug!(tree_name = %self.name, "environment unbound");
    }

    /// Re-resolve environment-bound names against the current environment
    ///
    /// If the bound environment has since been dropped the binding is cleared.
    pub fn rebind_current(&mut self) {
        match self.bound_environment() {
            Some(env) => self.resolve_environment(&env, "rebind_current"),
            None => {
                if self.bound.take().is_some() {
                    tracing::warn!(tree_name = %self.name, "bound environment is gone; unbinding");
                }
            }
        }
    }

    fn resolve_environment(&mut self, env: &D::Env, op: &'static str) {
        log_op_start!(op, tree_name = %self.name, environment = %env.label());
        let start = Instant::now();
        let mut resolved = 0u64;
        self.group.for_each_predicate(|p| {
            if resolve_bound(p, env) {
                resolved += 1;
            }
        });
        log_op_end!(
            op,
            duration_ms = start.elapsed().as_millis() as u64,
            resolved = resolved
        );
    }

    /// Resolve a freshly placed predicate and its subtree in the bound environment
    ///
    /// Copies arrive without their environment-bound selection, and binding
    /// to the same environment again is a no-op, so placement has to do it.
    pub(crate) fn resolve_placed(&mut self, id: PredicateId) {
        let Some(bound) = self.bound_environment() else {
            return;
        };
        let env: &D::Env = &bound;
        let Some(placed) = self.group.find_predicate_mut(id) else {
            return;
        };
        let mut resolved = u64::from(resolve_bound(placed, env));
        if let Some(group) = placed.group_mut() {
            group.for_each_predicate(|p| {
                if resolve_bound(p, env) {
                    resolved += 1;
                }
            });
        }
        tracing::debug!(
            predicate_id = %id,
            environment = %env.label(),
            resolved = resolved,
            "resolved placed predicate in bound environment"
        );
    }

    // ===== Cloning =====

    /// Deep copy as a plain holder; see [`FilterTree::clone_as`]
    pub fn clone_as_holder(&self) -> Self {
        self.clone_as(RootKind::Holder)
    }

    /// Deep copy as a saved search; see [`FilterTree::clone_as`]
    pub fn clone_as_search(&self) -> Self {
        self.clone_as(RootKind::Search)
    }

    /// Deep copy of name and structure, unmodified and unbound
    ///
    /// Every node gets a fresh identity. Environment-bound selections are
    /// not carried over and resolve again once the copy is bound.
    pub fn clone_as(&self, root_kind: RootKind) -> Self {
        Self {
            name: self.name.clone(),
            root_kind,
            active: self.active,
            bound: None,
            changed: false,
            modified_at: None,
            group: self.group.duplicate_for(HolderId::Root),
        }
    }
}

/// Resolve one predicate if it is environment-bound; reports whether it was
fn resolve_bound<D: Domain>(predicate: &mut Predicate<D>, env: &D::Env) -> bool {
    if predicate.filter().tier() == Some(Tier::Environment) {
        predicate.resolve_in(env);
        true
    } else {
        false
    }
}
