//! Fuzzy search and key filter translation
//!
//! Wildcard arguments (`*`) become SQL `LIKE` patterns; arguments without a
//! wildcard are compared for equality. Key arrays become AND/OR predicate
//! groups for whitelist and blacklist searches.

use sea_orm::Value;

use confstore_common::{generate_like_argument, is_blank, utils::FUZZY_SEARCH_SIGN};

use crate::projection::ConfigKey;

/// `column like ?` for wildcard patterns, `column = ?` otherwise.
///
/// With `negate` the operators become `not like` and `!=`.
pub fn fuzzy_predicate(column: &str, pattern: &str, negate: bool) -> (String, Value) {
    let wildcard = pattern.contains(FUZZY_SEARCH_SIGN);
    let op = match (wildcard, negate) {
        (true, false) => "like",
        (true, true) => "not like",
        (false, false) => "=",
        (false, true) => "!=",
    };
    (
        format!("{} {} ?", column, op),
        generate_like_argument(pattern).into(),
    )
}

/// `column like ?`, or `not like` when negated. No exact-match shortcut.
fn like_predicate(column: &str, pattern: &str, negate: bool) -> (String, Value) {
    let op = if negate { "not like" } else { "like" };
    (
        format!("{} {} ?", column, op),
        generate_like_argument(pattern).into(),
    )
}

/// Accumulates `and`-joined predicates with their bind values.
#[derive(Debug, Default, Clone)]
pub struct WhereClause {
    predicates: Vec<String>,
    values: Vec<Value>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix columns with `alias.` when given.
    fn column(alias: Option<&str>, column: &str) -> String {
        match alias {
            Some(a) => format!("{}.{}", a, column),
            None => column.to_string(),
        }
    }

    /// Add a raw predicate with its values.
    pub fn and(&mut self, predicate: impl Into<String>, values: Vec<Value>) -> &mut Self {
        self.predicates.push(predicate.into());
        self.values.extend(values);
        self
    }

    /// `column = ?`
    pub fn and_eq(
        &mut self,
        alias: Option<&str>,
        column: &str,
        value: impl Into<Value>,
    ) -> &mut Self {
        let col = Self::column(alias, column);
        self.and(format!("{} = ?", col), vec![value.into()])
    }

    /// `column = ?` only when `value` is not blank.
    pub fn and_eq_opt(&mut self, alias: Option<&str>, column: &str, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) if !is_blank(v) => self.and_eq(alias, column, v.to_string()),
            _ => self,
        }
    }

    /// Wildcard-aware match, added even for a blank pattern.
    pub fn and_match(&mut self, alias: Option<&str>, column: &str, pattern: &str) -> &mut Self {
        let (predicate, value) = fuzzy_predicate(&Self::column(alias, column), pattern, false);
        self.and(predicate, vec![value])
    }

    /// Wildcard-aware match only when `pattern` is not blank.
    pub fn and_fuzzy(&mut self, alias: Option<&str>, column: &str, pattern: Option<&str>) -> &mut Self {
        match pattern {
            Some(p) if !is_blank(p) => self.and_match(alias, column, p),
            _ => self,
        }
    }

    /// `column in (?, ...)`; an empty list matches nothing.
    pub fn and_in(&mut self, alias: Option<&str>, column: &str, values: Vec<Value>) -> &mut Self {
        if values.is_empty() {
            return self.and("1 = 0", vec![]);
        }
        let col = Self::column(alias, column);
        let predicate = format!("{} in ({})", col, placeholders(values.len()));
        self.and(predicate, values)
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// ` where a and b`, or an empty string when nothing was added.
    pub fn to_sql(&self) -> String {
        if self.predicates.is_empty() {
            String::new()
        } else {
            format!(" where {}", self.predicates.join(" and "))
        }
    }

    pub fn values(&self) -> Vec<Value> {
        self.values.clone()
    }
}

/// `?, ?, ?`
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Result of translating a whitelist or blacklist key array
#[derive(Debug, Clone, PartialEq)]
pub enum KeyFilter {
    /// No effective blacklist entry
    MatchAll,
    /// No effective whitelist entry
    MatchNone,
    Predicate { sql: String, values: Vec<Value> },
}

/// Translate a key array into a predicate over `data_id`, `group_id`, `app_name`.
///
/// Blacklist groups are `(data_id not like ? or group_id not like ? or app_name != ?)`
/// joined with `and`; whitelist groups are `(data_id like ? and group_id like ? and app_name = ?)`
/// joined with `or`. Only non-blank fields of each key participate. Translation
/// stops at the first key whose fields are all blank.
pub fn build_key_filter(keys: &[ConfigKey], blacklist: bool) -> KeyFilter {
    let mut groups: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    for key in keys {
        if is_blank(&key.data_id) && is_blank(&key.group) && is_blank(&key.app_name) {
            break;
        }

        let mut parts: Vec<String> = Vec::with_capacity(3);
        if !is_blank(&key.data_id) {
            let (p, v) = like_predicate("data_id", &key.data_id, blacklist);
            parts.push(p);
            values.push(v);
        }
        if !is_blank(&key.group) {
            let (p, v) = like_predicate("group_id", &key.group, blacklist);
            parts.push(p);
            values.push(v);
        }
        if !is_blank(&key.app_name) {
            parts.push(if blacklist {
                "app_name != ?".to_string()
            } else {
                "app_name = ?".to_string()
            });
            values.push(key.app_name.clone().into());
        }

        let inner = if blacklist { " or " } else { " and " };
        groups.push(format!("({})", parts.join(inner)));
    }

    if groups.is_empty() {
        return if blacklist {
            KeyFilter::MatchAll
        } else {
            KeyFilter::MatchNone
        };
    }

    let outer = if blacklist { " and " } else { " or " };
    KeyFilter::Predicate {
        sql: format!("({})", groups.join(outer)),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzzy_predicate_wildcard() {
        let (sql, value) = fuzzy_predicate("data_id", "app*", false);
        assert_eq!(sql, "data_id like ?");
        assert_eq!(value, Value::from("app%"));
    }

    #[test]
    fn test_fuzzy_predicate_exact() {
        let (sql, value) = fuzzy_predicate("data_id", "app.yaml", false);
        assert_eq!(sql, "data_id = ?");
        assert_eq!(value, Value::from("app.yaml"));

        let (sql, _) = fuzzy_predicate("data_id", "app.yaml", true);
        assert_eq!(sql, "data_id != ?");

        let (sql, _) = fuzzy_predicate("data_id", "*.yaml", true);
        assert_eq!(sql, "data_id not like ?");
    }

    #[test]
    fn test_where_clause_skips_blank() {
        let mut w = WhereClause::new();
        w.and_eq(None, "tenant_id", "")
            .and_fuzzy(None, "data_id", Some(""))
            .and_fuzzy(None, "group_id", Some("G*"))
            .and_eq_opt(None, "app_name", None);
        assert_eq!(w.to_sql(), " where tenant_id = ? and group_id like ?");
        assert_eq!(w.values().len(), 2);
    }

    #[test]
    fn test_where_clause_blank_match_is_exact() {
        let mut w = WhereClause::new();
        w.and_match(None, "tenant_id", "");
        assert_eq!(w.to_sql(), " where tenant_id = ?");
        assert_eq!(w.values(), vec![Value::from("")]);
    }

    #[test]
    fn test_where_clause_alias_and_in() {
        let mut w = WhereClause::new();
        w.and_eq(Some("a"), "tenant_id", "t1").and_in(
            Some("b"),
            "tag_name",
            vec!["x".into(), "y".into()],
        );
        assert_eq!(
            w.to_sql(),
            " where a.tenant_id = ? and b.tag_name in (?, ?)"
        );
    }

    #[test]
    fn test_where_clause_empty_in_matches_nothing() {
        let mut w = WhereClause::new();
        w.and_in(None, "id", vec![]);
        assert_eq!(w.to_sql(), " where 1 = 0");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn test_empty_blacklist_matches_all() {
        assert_eq!(build_key_filter(&[], true), KeyFilter::MatchAll);
    }

    #[test]
    fn test_empty_whitelist_matches_none() {
        assert_eq!(build_key_filter(&[], false), KeyFilter::MatchNone);
        let blank = ConfigKey::new("", " ", "");
        assert_eq!(build_key_filter(&[blank], false), KeyFilter::MatchNone);
    }

    #[test]
    fn test_blacklist_groups() {
        let keys = vec![
            ConfigKey::new("a*", "G1", ""),
            ConfigKey::new("", "", "svc"),
        ];
        match build_key_filter(&keys, true) {
            KeyFilter::Predicate { sql, values } => {
                assert_eq!(
                    sql,
                    "((data_id not like ? or group_id not like ?) and (app_name != ?))"
                );
                assert_eq!(values.len(), 3);
            }
            other => panic!("unexpected filter: {:?}", other),
        }
    }

    #[test]
    fn test_whitelist_groups() {
        let keys = vec![
            ConfigKey::new("a*", "G1", "svc"),
            ConfigKey::new("b", "", ""),
        ];
        match build_key_filter(&keys, false) {
            KeyFilter::Predicate { sql, values } => {
                assert_eq!(
                    sql,
                    "((data_id like ? and group_id like ? and app_name = ?) or (data_id like ?))"
                );
                assert_eq!(values[0], Value::from("a%"));
                assert_eq!(values.len(), 4);
            }
            other => panic!("unexpected filter: {:?}", other),
        }
    }

    #[test]
    fn test_translation_stops_at_blank_key() {
        let keys = vec![
            ConfigKey::new("a", "", ""),
            ConfigKey::new("", "", ""),
            ConfigKey::new("c", "", ""),
        ];
        match build_key_filter(&keys, false) {
            KeyFilter::Predicate { sql, values } => {
                assert_eq!(sql, "((data_id like ?))");
                assert_eq!(values.len(), 1);
            }
            other => panic!("unexpected filter: {:?}", other),
        }
    }
}
