use indexmap::IndexMap;
use regex::Regex;

use crate::optimizer::DiagnosticSink;
use crate::query::{Expr, Join, JoinType, Query};

/// Matches an alias as a whole identifier, case-insensitively.
///
/// A plain substring search would falsely find short aliases inside unrelated
/// words (alias `a` inside `name`), so the alias must be delimited by
/// non-identifier characters or the ends of the fragment.
struct AliasMatcher {
    pattern: Option<Regex>,
}

impl AliasMatcher {
    fn new(alias: &str) -> Self {
        let pattern = format!(
            r"(?i)(^|[^A-Za-z0-9_]){}($|[^A-Za-z0-9_])",
            regex::escape(alias)
        );
        Self {
            pattern: Regex::new(&pattern).ok(),
        }
    }

    /// An unbuildable pattern reports every fragment as a reference, so the
    /// join is kept rather than wrongly dropped.
    fn is_match(&self, text: &str) -> bool {
        self.pattern
            .as_ref()
            .map(|pattern| pattern.is_match(text))
            .unwrap_or(true)
    }
}

/// Removes LEFT joins whose alias is never referenced outside their own
/// declaration. INNER joins constrain result cardinality and are always kept.
///
/// The pass mutates the query in place, preserving join order and every join
/// parameter for the joins it keeps. With a diagnostic sink attached, the
/// query text is rendered before and after the pass and a single message with
/// both renderings is emitted when they differ; without a sink nothing is
/// rendered at all.
pub struct JoinPruner {
    sink: Option<Box<dyn DiagnosticSink>>,
}

impl Default for JoinPruner {
    fn default() -> Self {
        Self::new()
    }
}

impl JoinPruner {
    pub fn new() -> Self {
        Self { sink: None }
    }

    pub fn with_sink(sink: Box<dyn DiagnosticSink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn prune(&self, query: &mut Query) {
        let original = self.sink.as_ref().map(|_| query.to_string());

        let mut live = std::mem::take(&mut query.joins);

        // Liveness is recomputed until a round removes nothing; a dropped
        // join's condition does not count as a reference.
        loop {
            let mut next: IndexMap<String, Vec<Join>> = IndexMap::new();
            let mut removed = false;
            for (root, group) in &live {
                for join in group {
                    if Self::is_join_used(join, query, &live) {
                        next.entry(root.clone()).or_default().push(join.clone());
                    } else {
                        tracing::debug!(alias = %join.alias, "removed unreferenced left join");
                        removed = true;
                    }
                }
            }
            live = next;
            if !removed {
                break;
            }
        }

        query.joins = live;

        if let (Some(sink), Some(original)) = (self.sink.as_ref(), original) {
            let rewritten = query.to_string();
            if rewritten != original {
                sink.notice(&format!(
                    "query optimized:\n   original : {}\n   rewritten: {}",
                    original, rewritten
                ));
            }
        }
    }

    /// A join is live when it is an INNER join, or when its alias is
    /// referenced by any clause other than its own declaration: the select
    /// list, the FROM targets, the condition of another still-live join,
    /// GROUP BY, ORDER BY, or the WHERE/HAVING trees.
    fn is_join_used(join: &Join, query: &Query, live: &IndexMap<String, Vec<Join>>) -> bool {
        if join.join_type == JoinType::Inner {
            return true;
        }

        let matcher = AliasMatcher::new(&join.alias);

        if query.select.iter().any(|item| Self::expr_references(item, &matcher)) {
            return true;
        }

        if query.from.iter().any(|from| matcher.is_match(&from.target)) {
            return true;
        }

        for other in live.values().flatten() {
            if other.alias == join.alias {
                continue;
            }
            if let Some(condition) = &other.condition {
                if Self::expr_references(condition, &matcher) {
                    return true;
                }
            }
        }

        if query.group_by.iter().any(|expr| matcher.is_match(expr)) {
            return true;
        }

        if query.order_by.iter().any(|order| matcher.is_match(&order.expr)) {
            return true;
        }

        if let Some(criteria) = &query.criteria {
            if Self::expr_references(criteria, &matcher) {
                return true;
            }
        }

        if let Some(having) = &query.having {
            if Self::expr_references(having, &matcher) {
                return true;
            }
        }

        false
    }

    /// Recursive search through AND/OR groups and function arguments down to
    /// raw leaves. Function names are not searched, only their arguments.
    fn expr_references(expr: &Expr, matcher: &AliasMatcher) -> bool {
        match expr {
            Expr::Raw(text) => matcher.is_match(text),
            Expr::And(parts) | Expr::Or(parts) => {
                parts.iter().any(|part| Self::expr_references(part, matcher))
            }
            Expr::Func { name: _, args } => {
                args.iter().any(|arg| Self::expr_references(arg, matcher))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::builder::QueryBuilder;
    use crate::optimizer::{DiagnosticSink, JoinPruner};
    use crate::query::{ConditionType, Expr, OrderBy, Query};

    struct CaptureSink {
        messages: Arc<Mutex<Vec<String>>>,
    }

    impl DiagnosticSink for CaptureSink {
        fn notice(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    fn capture_sink() -> (Box<CaptureSink>, Arc<Mutex<Vec<String>>>) {
        let messages = Arc::new(Mutex::new(vec![]));
        let sink = Box::new(CaptureSink { messages: Arc::clone(&messages) });
        (sink, messages)
    }

    fn prune(query: &mut Query) {
        JoinPruner::new().prune(query);
    }

    #[test]
    pub fn test_query_without_left_joins_is_untouched() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .inner_join_with("u.company", "c", ConditionType::With, "c.active = 1")
            .build()
            .expect("Failed to build query");
        let before = query.clone();

        prune(&mut query);

        assert_eq!(query, before);
    }

    #[test]
    pub fn test_unreferenced_left_join_is_removed() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .left_join("u.address", "a")
            .build()
            .expect("Failed to build query");

        prune(&mut query);

        assert_eq!(query.join_count(), 0);
        assert_eq!(query.to_string(), "SELECT u.id FROM User u");
    }

    #[test]
    pub fn test_unreferenced_inner_join_is_kept() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .inner_join("u.address", "a")
            .build()
            .expect("Failed to build query");

        prune(&mut query);

        assert_eq!(query.join_count(), 1);
    }

    #[test]
    pub fn test_left_join_kept_when_referenced_in_select() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .add_select("a.city")
            .from("User", "u")
            .left_join("u.address", "a")
            .build()
            .expect("Failed to build query");
        let join_before = query.find_join("a").expect("Missing join").clone();

        prune(&mut query);

        match query.find_join("a") {
            Some(join) => assert_eq!(*join, join_before),
            None => panic!(),
        }
    }

    #[test]
    pub fn test_left_join_kept_when_referenced_in_where() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .left_join("u.company", "c")
            .where_expr("c.name = 'Acme'")
            .build()
            .expect("Failed to build query");

        prune(&mut query);

        assert_eq!(query.join_count(), 1);
    }

    #[test]
    pub fn test_left_join_kept_when_referenced_in_group_by() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .left_join("u.company", "c")
            .group_by("c.name")
            .build()
            .expect("Failed to build query");

        prune(&mut query);

        assert_eq!(query.join_count(), 1);
    }

    #[test]
    pub fn test_left_join_kept_when_referenced_in_order_by() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .left_join("u.company", "c")
            .add_order_by(OrderBy::asc("c.name"))
            .build()
            .expect("Failed to build query");

        prune(&mut query);

        assert_eq!(query.join_count(), 1);
    }

    #[test]
    pub fn test_left_join_kept_when_referenced_in_having() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .left_join("u.orders", "o")
            .group_by("u.id")
            .having(Expr::func("COUNT", vec![Expr::raw("o.id")]).and_with(Expr::raw("1 = 1")))
            .build()
            .expect("Failed to build query");

        prune(&mut query);

        assert_eq!(query.join_count(), 1);
    }

    #[test]
    pub fn test_left_join_kept_when_referenced_in_another_join_condition() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .left_join("u.address", "a")
            .left_join_with("u.company", "c", ConditionType::With, "c.address = a.id")
            .where_expr("c.name = 'Acme'")
            .build()
            .expect("Failed to build query");

        prune(&mut query);

        assert_eq!(query.join_count(), 2);
    }

    #[test]
    pub fn test_own_condition_does_not_keep_join() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .left_join_with("u.address", "addr", ConditionType::With, "addr.active = 1")
            .build()
            .expect("Failed to build query");

        prune(&mut query);

        assert_eq!(query.join_count(), 0);
    }

    #[test]
    pub fn test_short_alias_is_not_matched_inside_words() {
        // Worked example: alias `a` must not match the `a` inside `c.name` or
        // `'Acme'`, so only the join referenced by the WHERE clause survives.
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .left_join("u.address", "a")
            .left_join("u.company", "c")
            .where_expr("c.name = 'Acme'")
            .build()
            .expect("Failed to build query");

        prune(&mut query);

        assert_eq!(query.join_count(), 1);
        assert!(query.find_join("a").is_none());

        match query.find_join("c") {
            Some(join) => assert_eq!(join.target, "u.company"),
            None => panic!(),
        }
    }

    #[test]
    pub fn test_alias_match_is_case_insensitive() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .left_join("u.address", "ADDR")
            .where_expr("addr.city = 'Porto'")
            .build()
            .expect("Failed to build query");

        prune(&mut query);

        assert_eq!(query.join_count(), 1);
    }

    #[test]
    pub fn test_nested_join_child_dropped_parent_kept() {
        let mut query = QueryBuilder::new()
            .add_select("a.city")
            .from("User", "u")
            .left_join("u.address", "a")
            .left_join("a.country", "co")
            .build()
            .expect("Failed to build query");

        prune(&mut query);

        assert_eq!(query.join_count(), 1);
        assert!(query.find_join("a").is_some());
        assert!(query.find_join("co").is_none());
    }

    #[test]
    pub fn test_join_order_preserved_across_removal() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .left_join("u.orders", "o")
            .left_join("u.address", "a")
            .left_join("u.company", "c")
            .where_expr("o.total > 100 AND c.name = 'Acme'")
            .build()
            .expect("Failed to build query");

        prune(&mut query);

        let group = query.joins.get("u").expect("Missing join group");
        assert_eq!(group.len(), 2);
        assert_eq!(group[0].alias, "o");
        assert_eq!(group[1].alias, "c");
    }

    #[test]
    pub fn test_reference_found_inside_or_group() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .left_join("u.company", "c")
            .where_expr(Expr::or(vec![
                Expr::raw("u.active = 1"),
                Expr::raw("c.name = 'Acme'"),
            ]))
            .build()
            .expect("Failed to build query");

        prune(&mut query);

        assert_eq!(query.join_count(), 1);
    }

    #[test]
    pub fn test_reference_found_inside_function_arguments() {
        let mut query = QueryBuilder::new()
            .add_select(Expr::func("COALESCE", vec![Expr::raw("a.zip"), Expr::raw("'00000'")]))
            .from("User", "u")
            .left_join("u.address", "a")
            .build()
            .expect("Failed to build query");

        prune(&mut query);

        assert_eq!(query.join_count(), 1);
    }

    #[test]
    pub fn test_prune_is_idempotent() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .left_join("u.address", "a")
            .left_join("u.company", "c")
            .where_expr("c.name = 'Acme'")
            .build()
            .expect("Failed to build query");

        prune(&mut query);
        let after_first = query.clone();
        prune(&mut query);

        assert_eq!(query, after_first);
    }

    #[test]
    pub fn test_condition_of_dropped_join_is_not_a_reference() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .left_join("u.address", "a")
            .left_join_with("u.company", "c", ConditionType::With, "c.ref = a.id")
            .build()
            .expect("Failed to build query");

        prune(&mut query);

        assert_eq!(query.join_count(), 0);
        assert_eq!(query.to_string(), "SELECT u.id FROM User u");
    }

    #[test]
    pub fn test_prune_is_idempotent_across_dead_join_chain() {
        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .left_join("u.address", "a")
            .left_join_with("u.company", "c", ConditionType::With, "c.ref = a.id")
            .build()
            .expect("Failed to build query");

        prune(&mut query);
        let after_first = query.clone();
        prune(&mut query);

        assert_eq!(query, after_first);
    }

    #[test]
    pub fn test_sink_receives_single_message_with_both_renderings() {
        let (sink, messages) = capture_sink();
        let pruner = JoinPruner::with_sink(sink);

        let mut query = QueryBuilder::new()
            .add_select("u.id")
            .from("User", "u")
            .left_join("u.address", "a")
            .build()
            .expect("Failed to build query");

        pruner.prune(&mut query);

        let messages = messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("SELECT u.id FROM User u LEFT JOIN u.address a"));
        assert!(messages[0].contains("rewritten: SELECT u.id FROM User u"));
    }

    #[test]
    pub fn test_sink_silent_when_nothing_changes() {
        let (sink, messages) = capture_sink();
        let pruner = JoinPruner::with_sink(sink);

        let mut query = QueryBuilder::new()
            .add_select("a.city")
            .from("User", "u")
            .left_join("u.address", "a")
            .build()
            .expect("Failed to build query");

        pruner.prune(&mut query);

        assert!(messages.lock().unwrap().is_empty());
    }
}
