use std::fmt;

use serde::{Deserialize, Serialize};

/// A root entity in the FROM clause, with its binding alias and an optional
/// INDEX BY expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromItem {
    pub target: String,
    pub alias: String,
    pub index_by: Option<String>,
}

impl FromItem {
    pub fn new(target: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            alias: alias.into(),
            index_by: None,
        }
    }

    pub fn indexed_by(mut self, index_by: impl Into<String>) -> Self {
        self.index_by = Some(index_by.into());
        self
    }
}

impl fmt::Display for FromItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.target, self.alias)?;
        if let Some(index_by) = &self.index_by {
            write!(f, " INDEX BY {}", index_by)?;
        }
        Ok(())
    }
}
