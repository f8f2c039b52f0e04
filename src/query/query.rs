use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::query::{Expr, FromItem, Join, OrderBy};

/// A fully-built structured query: the clause tree an upstream builder
/// produces and a downstream executor renders.
///
/// Joins are grouped under the root alias they hang from; both the group
/// order and the join order within each group are insertion order, and both
/// are preserved by every transformation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
    pub select: Vec<Expr>,
    pub from: Vec<FromItem>,
    pub joins: IndexMap<String, Vec<Join>>,
    pub criteria: Option<Expr>,
    pub group_by: Vec<String>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderBy>,
}

impl Query {
    /// All joins in declaration order, flattened across root aliases.
    pub fn all_joins(&self) -> impl Iterator<Item = &Join> {
        self.joins.values().flatten()
    }

    pub fn join_count(&self) -> usize {
        self.joins.values().map(Vec::len).sum()
    }

    pub fn find_join(&self, alias: &str) -> Option<&Join> {
        self.all_joins().find(|join| join.alias == alias)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        for (i, item) in self.select.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }

        write!(f, " FROM ")?;
        for (i, from) in self.from.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", from)?;
        }

        for join in self.all_joins() {
            write!(f, " {}", join)?;
        }

        if let Some(criteria) = &self.criteria {
            write!(f, " WHERE {}", criteria)?;
        }

        if !self.group_by.is_empty() {
            write!(f, " GROUP BY {}", self.group_by.join(", "))?;
        }

        if let Some(having) = &self.having {
            write!(f, " HAVING {}", having)?;
        }

        if !self.order_by.is_empty() {
            write!(f, " ORDER BY ")?;
            for (i, order) in self.order_by.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", order)?;
            }
        }

        Ok(())
    }
}
