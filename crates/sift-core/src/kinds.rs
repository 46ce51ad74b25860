//! Built-in holder kinds
//!
//! These are the only kinds the core ships: predicates that own a nested
//! group. Everything that inspects an item's own properties is supplied by
//! the embedding application through the catalog.

use std::any::Any;

use sift_core_types::HolderId;

use crate::domain::{Domain, FilterItem};
use crate::model::{Combinator, Filter, Predicate, PredicateGroup};

/// Behavior name of [`SubGroup`]
pub const SUB_GROUP: &str = "sub_group";

/// Behavior name of [`ContainerSearch`]
pub const CONTAINER_SEARCH: &str = "container_search";

/// A nested group evaluated against the item itself
///
/// Accepts moved predicates.
#[derive(Debug)]
pub struct SubGroup<D: Domain> {
    group: PredicateGroup<D>,
}

impl<D: Domain> SubGroup<D> {
    /// The group is re-pointed at its owner once wrapped in a [`Predicate`]
    pub fn new(combinator: Combinator) -> Self {
        Self {
            group: PredicateGroup::new(HolderId::Root, combinator),
        }
    }

    /// A ready-made holder predicate under the default kind name
    pub fn predicate(combinator: Combinator) -> Predicate<D> {
        Predicate::new(SUB_GROUP, Box::new(Self::new(combinator)))
    }
}

impl<D: Domain> Filter<D> for SubGroup<D> {
    fn evaluates_directly(&self, item: &D::Item) -> bool {
        self.group.applies_to(item)
    }

    fn clone_filter(&self) -> Box<dyn Filter<D>> {
        Box::new(Self {
            group: self.group.duplicate_for(self.group.holder()),
        })
    }

    fn group(&self) -> Option<&PredicateGroup<D>> {
        Some(&self.group)
    }

    fn group_mut(&mut self) -> Option<&mut PredicateGroup<D>> {
        Some(&mut self.group)
    }

    fn accepts_moves(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Matches when any container enclosing the item satisfies the nested group
///
/// Its group is edited in place but is never a drop target for moves.
#[derive(Debug)]
pub struct ContainerSearch<D: Domain> {
    group: PredicateGroup<D>,
}

impl<D: Domain> ContainerSearch<D> {
    pub fn new(combinator: Combinator) -> Self {
        Self {
            group: PredicateGroup::new(HolderId::Root, combinator),
        }
    }

    pub fn predicate(combinator: Combinator) -> Predicate<D> {
        Predicate::new(CONTAINER_SEARCH, Box::new(Self::new(combinator)))
    }
}

impl<D: Domain> Filter<D> for ContainerSearch<D> {
    fn evaluates_directly(&self, item: &D::Item) -> bool {
        item.container_chain()
            .into_iter()
            .any(|container| self.group.applies_to(container))
    }

    fn clone_filter(&self) -> Box<dyn Filter<D>> {
        Box::new(Self {
            group: self.group.duplicate_for(self.group.holder()),
        })
    }

    fn group(&self) -> Option<&PredicateGroup<D>> {
        Some(&self.group)
    }

    fn group_mut(&mut self) -> Option<&mut PredicateGroup<D>> {
        Some(&mut self.group)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
