use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    DuplicateAlias(String),
    EmptyAlias { target: String },
    UnknownParentAlias { target: String, alias: String },
    EmptyFrom,
}

impl QueryError {
    pub fn err<T>(self) -> Result<T, QueryError> {
        Err(self)
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::DuplicateAlias(alias) => {
                write!(f, "QueryError: alias '{}' is already declared", alias)
            }
            QueryError::EmptyAlias { target } => {
                write!(f, "QueryError: target '{}' is declared with a blank alias", target)
            }
            QueryError::UnknownParentAlias { target, alias } => {
                write!(
                    f,
                    "QueryError: join '{}' for alias '{}' references an undeclared parent",
                    target, alias
                )
            }
            QueryError::EmptyFrom => {
                write!(f, "QueryError: query has no FROM clause")
            }
        }
    }
}

impl std::error::Error for QueryError {}
