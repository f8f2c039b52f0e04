use indexmap::IndexMap;

use crate::builder::QueryError;
use crate::query::{ConditionType, Expr, FromItem, Join, OrderBy, Query};

/// Fluent builder producing a [`Query`].
///
/// Joins are declared in order and grouped under their root alias when the
/// query is built: the leading segment of a join target is resolved through
/// previously declared joins until it reaches a FROM root. A join target
/// without a dotted path falls back to the first root.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    select: Vec<Expr>,
    from: Vec<FromItem>,
    joins: Vec<Join>,
    criteria: Option<Expr>,
    group_by: Vec<String>,
    having: Option<Expr>,
    order_by: Vec<OrderBy>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, items: Vec<Expr>) -> Self {
        self.select = items;
        self
    }

    pub fn add_select(mut self, item: impl Into<Expr>) -> Self {
        self.select.push(item.into());
        self
    }

    pub fn from(mut self, target: impl Into<String>, alias: impl Into<String>) -> Self {
        self.from.push(FromItem::new(target, alias));
        self
    }

    pub fn add_from(mut self, from: FromItem) -> Self {
        self.from.push(from);
        self
    }

    pub fn left_join(self, target: impl Into<String>, alias: impl Into<String>) -> Self {
        self.add_join(Join::left(target, alias))
    }

    pub fn left_join_with(
        self,
        target: impl Into<String>,
        alias: impl Into<String>,
        condition_type: ConditionType,
        condition: impl Into<Expr>,
    ) -> Self {
        self.add_join(Join::left(target, alias).with_condition(condition_type, condition.into()))
    }

    pub fn inner_join(self, target: impl Into<String>, alias: impl Into<String>) -> Self {
        self.add_join(Join::inner(target, alias))
    }

    pub fn inner_join_with(
        self,
        target: impl Into<String>,
        alias: impl Into<String>,
        condition_type: ConditionType,
        condition: impl Into<Expr>,
    ) -> Self {
        self.add_join(Join::inner(target, alias).with_condition(condition_type, condition.into()))
    }

    pub fn add_join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn where_expr(mut self, expr: impl Into<Expr>) -> Self {
        self.criteria = Some(expr.into());
        self
    }

    pub fn and_where(mut self, expr: impl Into<Expr>) -> Self {
        self.criteria = Some(match self.criteria {
            Some(current) => current.and_with(expr.into()),
            None => expr.into(),
        });
        self
    }

    pub fn or_where(mut self, expr: impl Into<Expr>) -> Self {
        self.criteria = Some(match self.criteria {
            Some(current) => current.or_with(expr.into()),
            None => expr.into(),
        });
        self
    }

    pub fn group_by(mut self, expr: impl Into<String>) -> Self {
        self.group_by = vec![expr.into()];
        self
    }

    pub fn add_group_by(mut self, expr: impl Into<String>) -> Self {
        self.group_by.push(expr.into());
        self
    }

    pub fn having(mut self, expr: impl Into<Expr>) -> Self {
        self.having = Some(expr.into());
        self
    }

    pub fn and_having(mut self, expr: impl Into<Expr>) -> Self {
        self.having = Some(match self.having {
            Some(current) => current.and_with(expr.into()),
            None => expr.into(),
        });
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = vec![order];
        self
    }

    pub fn add_order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Validates alias uniqueness and parent resolution, then assembles the
    /// query with joins grouped under their root alias.
    pub fn build(self) -> Result<Query, QueryError> {
        if self.from.is_empty() {
            return QueryError::EmptyFrom.err();
        }

        let mut roots: IndexMap<String, String> = IndexMap::new();
        for from in &self.from {
            if from.alias.trim().is_empty() {
                return QueryError::EmptyAlias { target: from.target.clone() }.err();
            }
            if roots.contains_key(&from.alias) {
                return QueryError::DuplicateAlias(from.alias.clone()).err();
            }
            roots.insert(from.alias.clone(), from.alias.clone());
        }

        let mut joins: IndexMap<String, Vec<Join>> = IndexMap::new();
        for join in self.joins {
            if join.alias.trim().is_empty() {
                return QueryError::EmptyAlias { target: join.target.clone() }.err();
            }
            if roots.contains_key(&join.alias) {
                return QueryError::DuplicateAlias(join.alias.clone()).err();
            }

            let root = match join.parent_alias() {
                Some(parent) => match roots.get(parent) {
                    Some(root) => root.clone(),
                    None => {
                        return QueryError::UnknownParentAlias {
                            target: join.target.clone(),
                            alias: join.alias.clone(),
                        }
                        .err();
                    }
                },
                // Unqualified target: hang under the first declared root.
                None => self.from[0].alias.clone(),
            };

            roots.insert(join.alias.clone(), root.clone());
            joins.entry(root).or_default().push(join);
        }

        Ok(Query {
            select: self.select,
            from: self.from,
            joins,
            criteria: self.criteria,
            group_by: self.group_by,
            having: self.having,
            order_by: self.order_by,
        })
    }
}
