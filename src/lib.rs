pub mod query;
pub use query::{ConditionType, Expr, FromItem, Join, JoinType, OrderBy, Query, SortDir};

pub mod builder;
pub use builder::{QueryBuilder, QueryError};

pub mod optimizer;
pub use optimizer::{DiagnosticSink, JoinPruner, TracingSink};
