pub mod join_pruner;
pub use join_pruner::*;

pub mod diagnostic;
pub use diagnostic::*;
