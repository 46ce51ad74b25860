use serde::{Deserialize, Serialize};
use sift_core_types::{GroupId, HolderId, PredicateId};

use super::predicate::Predicate;
use crate::domain::Domain;
use crate::errors::{Result, SiftError};
use crate::traversal::Walk;

/// How a group combines its enabled members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    /// Every enabled member matches
    #[default]
    All,
    /// At least one enabled member matches
    Any,
    /// At least `n` enabled members match
    AtLeast(usize),
}

/// Reusable buffers for [`PredicateGroup::filter_into`]
///
/// Owned by the caller so one scratch can serve many filter passes without
/// reallocating. A scratch serves one pass at a time.
#[derive(Debug, Default)]
pub struct FilterScratch {
    enabled: Vec<usize>,
    front: Vec<usize>,
    back: Vec<usize>,
    hits: Vec<usize>,
}

impl FilterScratch {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Ordered, owned collection of predicates plus a combinator
///
/// Member order is significant: it is evaluation and display order.
#[derive(Debug)]
pub struct PredicateGroup<D: Domain> {
    id: GroupId,
    holder: HolderId,
    combinator: Combinator,
    members: Vec<Predicate<D>>,
}

impl<D: Domain> PredicateGroup<D> {
    pub fn new(holder: HolderId, combinator: Combinator) -> Self {
        Self {
            id: GroupId::new(),
            holder,
            combinator,
            members: Vec::new(),
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn holder(&self) -> HolderId {
        self.holder
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn set_combinator(&mut self, combinator: Combinator) {
        self.combinator = combinator;
    }

    pub fn members(&self) -> &[Predicate<D>] {
        &self.members
    }

    /// Mutable access to members in place (order and ownership stay fixed)
    pub fn members_mut(&mut self) -> &mut [Predicate<D>] {
        &mut self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn position(&self, id: PredicateId) -> Option<usize> {
        self.members.iter().position(|m| m.id() == id)
    }

    /// Evaluate the group against one item
    ///
    /// Disabled members are left out of the arithmetic entirely: an empty or
    /// all-disabled group matches under `All`, fails under `Any`, and
    /// `AtLeast(0)` always matches.
    pub fn applies_to(&self, item: &D::Item) -> bool {
        let mut enabled = self.members.iter().filter(|m| m.is_enabled());
        match self.combinator {
            Combinator::All => enabled.all(|m| m.applies_to(item)),
            Combinator::Any => enabled.any(|m| m.applies_to(item)),
            Combinator::AtLeast(n) => {
                n == 0 || enabled.filter(|m| m.applies_to(item)).take(n).count() >= n
            }
        }
    }

    /// Filter `items` into `out`, preserving input order
    ///
    /// Evaluates member by member, alternating between the scratch buffers so
    /// an item is dropped as soon as it can no longer reach the required
    /// number of hits and accepted as soon as it has. Equivalent to keeping
    /// every item for which [`PredicateGroup::applies_to`] holds.
    pub fn filter_into<'a>(
        &self,
        items: &'a [D::Item],
        scratch: &mut FilterScratch,
        out: &mut Vec<&'a D::Item>,
    ) {
        out.clear();
        let FilterScratch {
            enabled,
            front,
            back,
            hits,
        } = scratch;
        enabled.clear();
        enabled.extend(
            self.members
                .iter()
                .enumerate()
                .filter(|(_, m)| m.is_enabled())
                .map(|(i, _)| i),
        );
        let needed = match self.combinator {
            Combinator::All => enabled.len(),
            Combinator::Any => 1,
            Combinator::AtLeast(n) => n,
        };
        if needed == 0 {
            out.extend(items.iter());
            return;
        }
        if needed > enabled.len() {
            return;
        }

        front.clear();
        front.extend(0..items.len());
        hits.clear();
        hits.resize(items.len(), 0);

        for (pos, &index) in enabled.iter().enumerate() {
            let member = &self.members[index];
            let remaining = enabled.len() - pos - 1;
            back.clear();
            for &i in front.iter() {
                if member.applies_to(&items[i]) {
                    hits[i] += 1;
                }
                if hits[i] < needed && hits[i] + remaining >= needed {
                    back.push(i);
                }
            }
            std::mem::swap(front, back);
            if front.is_empty() {
                break;
            }
        }

        out.extend(
            items
                .iter()
                .zip(hits.iter())
                .filter(|(_, h)| **h >= needed)
                .map(|(item, _)| item),
        );
    }

    /// Convenience form of [`PredicateGroup::filter_into`] with fresh buffers
    pub fn filter<'a>(&self, items: &'a [D::Item]) -> Vec<&'a D::Item> {
        let mut out = Vec::with_capacity(items.len());
        self.filter_into(items, &mut FilterScratch::new(), &mut out);
        out
    }

    /// Insert a predicate, appending when `index` is `None`
    ///
    /// The predicate's parent link is pointed at this group's holder.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index` is past the end of the group.
    pub fn add(&mut self, mut predicate: Predicate<D>, index: Option<usize>) -> Result<PredicateId> {
        let index = index.unwrap_or(self.members.len());
        if index > self.members.len() {
            return Err(SiftError::IndexOutOfRange {
                index,
                len: self.members.len(),
            });
        }
        predicate.set_parent(Some(self.holder));
        let id = predicate.id();
        self.members.insert(index, predicate);
        Ok(id)
    }

    /// Remove every member whose id is listed; returns how many were removed
    ///
    /// A removed holder takes its whole subtree with it.
    pub fn remove(&mut self, ids: &[PredicateId]) -> usize {
        let before = self.members.len();
        self.members.retain(|m| !ids.contains(&m.id()));
        before - self.members.len()
    }

    /// Move or duplicate a member within this group
    ///
    /// `to` is interpreted after the source has been taken out, so moving
    /// index 0 to index 2 in `[A, B, C]` yields `[B, C, A]`. When
    /// `duplicate` is set the original stays and a copy lands at `to`.
    /// Positions past the end clamp to an append. Returns the id of the
    /// predicate placed at the destination, or `None` if `from` is out of
    /// range.
    pub fn reorder(&mut self, from: usize, to: usize, duplicate: bool) -> Option<PredicateId> {
        let moving = if duplicate {
            self.members.get(from)?.duplicate()
        } else {
            self.take(from)?
        };
        Some(self.insert_clamped(to, moving))
    }

    pub(crate) fn take(&mut self, index: usize) -> Option<Predicate<D>> {
        if index < self.members.len() {
            let mut predicate = self.members.remove(index);
            predicate.set_parent(None);
            Some(predicate)
        } else {
            None
        }
    }

    pub(crate) fn insert_clamped(&mut self, index: usize, mut predicate: Predicate<D>) -> PredicateId {
        let index = index.min(self.members.len());
        predicate.set_parent(Some(self.holder));
        let id = predicate.id();
        self.members.insert(index, predicate);
        id
    }

    /// Point this group and its members at a new holder
    pub(crate) fn rehome(&mut self, holder: HolderId) {
        self.holder = holder;
        for member in &mut self.members {
            member.set_parent(Some(holder));
        }
    }

    /// Deep copy with fresh identities throughout, owned by `holder`
    pub fn duplicate_for(&self, holder: HolderId) -> Self {
        let mut copy = Self::new(holder, self.combinator);
        for member in &self.members {
            copy.insert_clamped(usize::MAX, member.duplicate());
        }
        copy
    }

    /// Depth-first, pre-order walk over this group and everything below it
    pub fn walk(&self) -> Walk<'_, D> {
        Walk::new(self)
    }

    pub fn find_group(&self, id: GroupId) -> Option<&PredicateGroup<D>> {
        if self.id == id {
            return Some(self);
        }
        self.members
            .iter()
            .filter_map(|m| m.group())
            .find_map(|g| g.find_group(id))
    }

    pub fn find_group_mut(&mut self, id: GroupId) -> Option<&mut PredicateGroup<D>> {
        if self.id == id {
            return Some(self);
        }
        for member in &mut self.members {
            if let Some(found) = member.group_mut().and_then(|g| g.find_group_mut(id)) {
                return Some(found);
            }
        }
        None
    }

    /// Find a group that may receive moved predicates
    ///
    /// Groups of holders that do not accept moves never match, though
    /// acceptors nested below them still can. `accepting` states whether this
    /// group's own holder accepts moves.
    pub(crate) fn find_acceptor(&self, id: GroupId, accepting: bool) -> Option<&PredicateGroup<D>> {
        if self.id == id && accepting {
            return Some(self);
        }
        self.members.iter().find_map(|m| {
            m.group()
                .and_then(|g| g.find_acceptor(id, m.accepts_moves()))
        })
    }

    pub fn find_predicate(&self, id: PredicateId) -> Option<&Predicate<D>> {
        for member in &self.members {
            if member.id() == id {
                return Some(member);
            }
            if let Some(found) = member.group().and_then(|g| g.find_predicate(id)) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_predicate_mut(&mut self, id: PredicateId) -> Option<&mut Predicate<D>> {
        for member in &mut self.members {
            if member.id() == id {
                return Some(member);
            }
            if let Some(found) = member.group_mut().and_then(|g| g.find_predicate_mut(id)) {
                return Some(found);
            }
        }
        None
    }

    /// Visit every predicate below this group, pre-order
    pub fn for_each_predicate(&mut self, mut visit: impl FnMut(&mut Predicate<D>)) {
        self.visit_predicates(&mut visit);
    }

    fn visit_predicates<F: FnMut(&mut Predicate<D>)>(&mut self, visit: &mut F) {
        for member in &mut self.members {
            visit(member);
            if let Some(group) = member.group_mut() {
                group.visit_predicates(visit);
            }
        }
    }

    /// Visit this group and every nested group, pre-order
    pub fn for_each_holder(&mut self, mut visit: impl FnMut(&mut PredicateGroup<D>)) {
        self.visit_holders(&mut visit);
    }

    fn visit_holders<F: FnMut(&mut PredicateGroup<D>)>(&mut self, visit: &mut F) {
        visit(self);
        for member in &mut self.members {
            if let Some(group) = member.group_mut() {
                group.visit_holders(visit);
            }
        }
    }
}
