//! Structural editing of a [`FilterTree`]
//!
//! Insert and remove report bad arguments as errors. Reorder and
//! cross-group move never fail: an invalid request is a silent no-op
//! reported through [`MoveOutcome::Rejected`], and nothing is mutated.

use std::time::Instant;

use sift_core_types::{GroupId, HolderId, PredicateId};

use super::tree::FilterTree;
use crate::domain::Domain;
use crate::errors::{Result, SiftError};
use crate::model::{Combinator, Predicate, SelectionKind, TypedPredicate};
use crate::{log_op_end, log_op_error, log_op_start};

/// Why a move or reorder left the tree untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UnknownSourceGroup,
    /// Destination is missing or its holder does not accept moves
    UnknownDestination,
    SourceIndexOutOfRange,
    /// The dragged predicate is an ancestor of the destination
    WouldCreateCycle,
}

/// Result of a reorder or cross-group move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The original now sits at the destination
    Moved(PredicateId),
    /// A copy with this id was inserted; the original stayed put
    Duplicated(PredicateId),
    Rejected(Rejection),
}

impl MoveOutcome {
    pub fn is_applied(&self) -> bool {
        !matches!(self, MoveOutcome::Rejected(_))
    }

    fn placed(id: PredicateId, duplicate: bool) -> Self {
        if duplicate {
            MoveOutcome::Duplicated(id)
        } else {
            MoveOutcome::Moved(id)
        }
    }
}

impl<D: Domain> FilterTree<D> {
    /// Insert `predicate` into a group, appending when `index` is `None`
    ///
    /// # Errors
    ///
    /// - `GroupNotFound` if no group in this tree has `group_id`
    /// - `IndexOutOfRange` if `index` is past the end of the group
    pub fn add(
        &mut self,
        group_id: GroupId,
        predicate: Predicate<D>,
        index: Option<usize>,
    ) -> Result<PredicateId> {
        log_op_start!("add_predicate", group_id = %group_id, kind = predicate.kind());
        let start = Instant::now();

        let id = self
            .group
            .find_group_mut(group_id)
            .ok_or(SiftError::GroupNotFound { group_id })
            .and_then(|group| group.add(predicate, index))
            .map_err(|e| {
                log_op_error!(
                    "add_predicate",
                    e,
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;
        self.resolve_placed(id);
        self.mark_changed();

        log_op_end!(
            "add_predicate",
            duration_ms = start.elapsed().as_millis() as u64,
            predicate_id = %id
        );
        Ok(id)
    }

    /// Remove the listed members of one group; returns how many went
    ///
    /// Ids that are not direct members of the group are ignored.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` if no group in this tree has `group_id`.
    pub fn remove(&mut self, group_id: GroupId, ids: &[PredicateId]) -> Result<usize> {
        log_op_start!("remove_predicates", group_id = %group_id, requested = ids.len());
        let start = Instant::now();

        let Some(group) = self.group.find_group_mut(group_id) else {
            let err = SiftError::GroupNotFound { group_id };
            log_op_error!(
                "remove_predicates",
                err,
                duration_ms = start.elapsed().as_millis() as u64
            );
            return Err(err);
        };
        let removed = group.remove(ids);
        if removed > 0 {
            self.mark_changed();
        }

        log_op_end!(
            "remove_predicates",
            duration_ms = start.elapsed().as_millis() as u64,
            removed = removed
        );
        Ok(removed)
    }

    /// Move or duplicate a member within one group
    ///
    /// See [`crate::model::PredicateGroup::reorder`] for index semantics.
    pub fn reorder(
        &mut self,
        group_id: GroupId,
        from: usize,
        to: usize,
        duplicate: bool,
    ) -> MoveOutcome {
        log_op_start!("reorder", group_id = %group_id, from = from, to = to, duplicate = duplicate);
        let start = Instant::now();

        let outcome = match self.group.find_group_mut(group_id) {
            None => MoveOutcome::Rejected(Rejection::UnknownSourceGroup),
            Some(group) => match group.reorder(from, to, duplicate) {
                Some(id) => MoveOutcome::placed(id, duplicate),
                None => MoveOutcome::Rejected(Rejection::SourceIndexOutOfRange),
            },
        };
        self.finish_move("reorder", outcome, start);
        outcome
    }

    /// Move or duplicate a member from one group into another
    ///
    /// Only groups whose holder accepts moves (the root and acceptor kinds)
    /// can receive. The move is refused when the dragged predicate appears
    /// in the destination holder's ancestor chain, which also covers a
    /// holder dropped into its own group. The same check applies when
    /// duplicating. `to` clamps to an append.
    pub fn move_across(
        &mut self,
        source: GroupId,
        from: usize,
        destination: GroupId,
        to: usize,
        duplicate: bool,
    ) -> MoveOutcome {
        if source == destination {
            return self.reorder(source, from, to, duplicate);
        }

        log_op_start!(
            "move_across",
            source_group = %source,
            destination_group = %destination,
            duplicate = duplicate
        );
        let start = Instant::now();

        let outcome = match self.check_move(source, from, destination) {
            Err(rejection) => MoveOutcome::Rejected(rejection),
            Ok(()) => self.apply_move(source, from, destination, to, duplicate),
        };
        self.finish_move("move_across", outcome, start);
        outcome
    }

    fn check_move(
        &self,
        source: GroupId,
        from: usize,
        destination: GroupId,
    ) -> std::result::Result<(), Rejection> {
        let dragged = self
            .group
            .find_group(source)
            .ok_or(Rejection::UnknownSourceGroup)?
            .members()
            .get(from)
            .ok_or(Rejection::SourceIndexOutOfRange)?
            .id();
        let target = self
            .group
            .find_acceptor(destination, true)
            .ok_or(Rejection::UnknownDestination)?;

        if self
            .ancestors(target.holder())
            .contains(&HolderId::Predicate(dragged))
        {
            return Err(Rejection::WouldCreateCycle);
        }
        Ok(())
    }

    fn apply_move(
        &mut self,
        source: GroupId,
        from: usize,
        destination: GroupId,
        to: usize,
        duplicate: bool,
    ) -> MoveOutcome {
        let Some(src) = self.group.find_group_mut(source) else {
            return MoveOutcome::Rejected(Rejection::UnknownSourceGroup);
        };
        let moving = if duplicate {
            src.members().get(from).map(Predicate::duplicate)
        } else {
            src.take(from)
        };
        let Some(moving) = moving else {
            return MoveOutcome::Rejected(Rejection::SourceIndexOutOfRange);
        };

        // The cycle check guarantees the destination is not inside `moving`.
        match self.group.find_group_mut(destination) {
            Some(dest) => MoveOutcome::placed(dest.insert_clamped(to, moving), duplicate),
            None => {
                tracing::error!(
                    destination_group = %destination,
                    "destination vanished during move; predicate dropped"
                );
                MoveOutcome::Rejected(Rejection::UnknownDestination)
            }
        }
    }

    fn finish_move(&mut self, op: &'static str, outcome: MoveOutcome, start: Instant) {
        match outcome {
            MoveOutcome::Rejected(rejection) => {
                tracing::debug!(op = op, rejection = ?rejection, "structural edit rejected");
            }
            MoveOutcome::Moved(id) | MoveOutcome::Duplicated(id) => {
                self.resolve_placed(id);
                self.mark_changed();
            }
        }
        log_op_end!(
            op,
            duration_ms = start.elapsed().as_millis() as u64,
            outcome = ?outcome
        );
    }

    /// Change how a group combines its members
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` if no group in this tree has `group_id`.
    pub fn set_combinator(&mut self, group_id: GroupId, combinator: Combinator) -> Result<()> {
        let group = self
            .group
            .find_group_mut(group_id)
            .ok_or(SiftError::GroupNotFound { group_id })?;
        if group.combinator() != combinator {
            group.set_combinator(combinator);
            self.mark_changed();
        }
        Ok(())
    }

    /// Mutate one predicate in place and mark the tree changed
    ///
    /// # Errors
    ///
    /// Returns `PredicateNotFound` if no predicate in this tree has `id`.
    pub fn edit<R>(&mut self, id: PredicateId, f: impl FnOnce(&mut Predicate<D>) -> R) -> Result<R> {
        let predicate = self
            .group
            .find_predicate_mut(id)
            .ok_or(SiftError::PredicateNotFound { predicate_id: id })?;
        let result = f(predicate);
        self.mark_changed();
        Ok(result)
    }

    /// Record a user's choice of selection on a typed predicate
    ///
    /// Unlike resolution, this fires the kind's `post_chosen` hook.
    ///
    /// # Errors
    ///
    /// - `PredicateNotFound` if no predicate in this tree has `id`
    /// - `KindMismatch` if the predicate is not a `TypedPredicate<D, K>`
    pub fn choose<K: SelectionKind<D>>(
        &mut self,
        id: PredicateId,
        value: Option<K::Value>,
    ) -> Result<()> {
        let typed = self
            .group
            .find_predicate_mut(id)
            .ok_or(SiftError::PredicateNotFound { predicate_id: id })?
            .filter_as_mut::<TypedPredicate<D, K>>()
            .ok_or_else(|| SiftError::KindMismatch {
                predicate_id: id,
                expected: std::any::type_name::<K>().to_string(),
            })?;
        typed.choose(value);
        self.mark_changed();
        Ok(())
    }
}
