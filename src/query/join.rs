use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::Left => write!(f, "LEFT"),
        }
    }
}

/// How a join condition binds: WITH adds to the association condition,
/// ON replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ConditionType {
    #[default]
    With,
    On,
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionType::With => write!(f, "WITH"),
            ConditionType::On => write!(f, "ON"),
        }
    }
}

/// A single join declaration. The alias is unique within a query; the target
/// may reference another join's alias (nested joins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub join_type: JoinType,
    pub target: String,
    pub alias: String,
    pub condition_type: Option<ConditionType>,
    pub condition: Option<Expr>,
    pub index_by: Option<String>,
}

impl Join {
    pub fn new(join_type: JoinType, target: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            join_type,
            target: target.into(),
            alias: alias.into(),
            condition_type: None,
            condition: None,
            index_by: None,
        }
    }

    pub fn left(target: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new(JoinType::Left, target, alias)
    }

    pub fn inner(target: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new(JoinType::Inner, target, alias)
    }

    pub fn with_condition(mut self, condition_type: ConditionType, condition: Expr) -> Self {
        self.condition_type = Some(condition_type);
        self.condition = Some(condition);
        self
    }

    pub fn indexed_by(mut self, index_by: impl Into<String>) -> Self {
        self.index_by = Some(index_by.into());
        self
    }

    /// Leading segment of the join target, used to resolve the root alias
    /// this join hangs under. `None` for targets without a dotted path.
    pub fn parent_alias(&self) -> Option<&str> {
        self.target.split_once('.').map(|(lead, _)| lead)
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} JOIN {} {}", self.join_type, self.target, self.alias)?;
        if let Some(index_by) = &self.index_by {
            write!(f, " INDEX BY {}", index_by)?;
        }
        if let Some(condition) = &self.condition {
            let condition_type = self.condition_type.unwrap_or_default();
            write!(f, " {} {}", condition_type, condition)?;
        }
        Ok(())
    }
}
