use crate::domain::Domain;
use crate::model::{Predicate, PredicateGroup};

/// One node reached by a [`Walk`]
pub enum Visit<'a, D: Domain> {
    /// A group, reached through its holder (the root or a holder predicate)
    Holder(&'a PredicateGroup<D>),
    /// A predicate, leaf or holder
    Predicate(&'a Predicate<D>),
}

impl<D: Domain> Clone for Visit<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: Domain> Copy for Visit<'_, D> {}

impl<'a, D: Domain> Visit<'a, D> {
    pub fn as_predicate(&self) -> Option<&'a Predicate<D>> {
        match *self {
            Visit::Predicate(p) => Some(p),
            Visit::Holder(_) => None,
        }
    }

    pub fn as_holder(&self) -> Option<&'a PredicateGroup<D>> {
        match *self {
            Visit::Holder(g) => Some(g),
            Visit::Predicate(_) => None,
        }
    }
}

/// Depth-first, pre-order iterator over a group and everything below it
///
/// The starting group is yielded first. Each holder predicate is yielded as
/// a predicate, then its group as a holder, then that group's members.
pub struct Walk<'a, D: Domain> {
    pending: Option<&'a PredicateGroup<D>>,
    stack: Vec<std::slice::Iter<'a, Predicate<D>>>,
}

impl<'a, D: Domain> Walk<'a, D> {
    pub fn new(group: &'a PredicateGroup<D>) -> Self {
        Self {
            pending: Some(group),
            stack: vec![group.members().iter()],
        }
    }
}

impl<D: Domain> Clone for Walk<'_, D> {
    fn clone(&self) -> Self {
        Self {
            pending: self.pending,
            stack: self.stack.clone(),
        }
    }
}

impl<'a, D: Domain> Iterator for Walk<'a, D> {
    type Item = Visit<'a, D>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(group) = self.pending.take() {
            return Some(Visit::Holder(group));
        }
        while let Some(top) = self.stack.last_mut() {
            match top.next() {
                Some(predicate) => {
                    if let Some(group) = predicate.group() {
                        self.pending = Some(group);
                        self.stack.push(group.members().iter());
                    }
                    return Some(Visit::Predicate(predicate));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}
