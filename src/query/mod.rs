pub mod query;
pub use query::*;

pub mod expr;
pub use expr::*;

pub mod from;
pub use from::*;

pub mod join;
pub use join::*;

pub mod order_by;
pub use order_by::*;
