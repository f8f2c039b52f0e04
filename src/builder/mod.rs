pub mod query_builder;
pub use query_builder::*;

pub mod query_error;
pub use query_error::*;
