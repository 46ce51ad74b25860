pub mod edit;
pub mod tree;

pub use edit::{MoveOutcome, Rejection};
pub use tree::{FilterTree, RootKind};
