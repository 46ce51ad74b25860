pub mod group;
pub mod predicate;
pub mod typed;

pub use group::{Combinator, FilterScratch, PredicateGroup};
pub use predicate::{Filter, Predicate};
pub use typed::{Scope, Selection, SelectionKind, Tier, TypedPredicate, NULL_MARKER};
