use std::fmt;

use crate::types::Value;

/// Separator between a field name and its operator suffix: `age__gte`.
pub const SUFFIX_SEPARATOR: &str = "__";

/// Comparison selected by a filter key's suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Between,
    Like,
}

impl Operator {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Neq => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::Between => "between",
            Operator::Like => "like",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A filter key split into field, operator, and the raw suffix it came from.
///
/// The suffix is kept verbatim because literal rendering needs it: a `like` built from
/// `starts` renders differently from one built from `contains`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterKey {
    pub field: String,
    pub operator: Operator,
    pub code: String,
}

impl FilterKey {
    /// Resolve a key such as `name__starts` or `id`.
    ///
    /// Never fails: a missing suffix and an unknown suffix both resolve to equality, and the
    /// unknown suffix still travels in `code`. Segments after the second are ignored.
    ///
    /// ```rust
    /// use deebee::filter::{FilterKey, Operator};
    ///
    /// let key = FilterKey::parse("age__gte");
    /// assert_eq!(key.field, "age");
    /// assert_eq!(key.operator, Operator::Gte);
    ///
    /// let loose = FilterKey::parse("age__around");
    /// assert_eq!(loose.operator, Operator::Eq);
    /// assert_eq!(loose.code, "around");
    /// ```
    #[must_use]
    pub fn parse(key: &str) -> Self {
        let mut segments = key.split(SUFFIX_SEPARATOR);
        let field = segments.next().unwrap_or_default().to_string();
        let code = segments.next().unwrap_or_default().to_string();
        let operator = operator_for_code(&code);
        Self {
            field,
            operator,
            code,
        }
    }
}

fn operator_for_code(code: &str) -> Operator {
    match code {
        "in" => Operator::In,
        "nin" => Operator::NotIn,
        "neq" => Operator::Neq,
        "gt" => Operator::Gt,
        "gte" => Operator::Gte,
        "lt" => Operator::Lt,
        "lte" => Operator::Lte,
        "between" | "bw" => Operator::Between,
        "starts" | "st" | "ends" | "ed" | "contains" | "ct" => Operator::Like,
        _ => Operator::Eq,
    }
}

/// Ordered set of `key → value` conditions, ANDed together when rendered.
///
/// ```rust
/// use deebee::prelude::*;
///
/// let adults = Filter::new().and("age__gte", 18).and("name__starts", "A");
/// assert_eq!(adults.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    entries: Vec<(String, Value)>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single equality condition.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and(field, value)
    }

    #[must_use]
    pub fn and(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Append every condition of `other` after the existing ones.
    pub fn extend(&mut self, other: Filter) {
        self.entries.extend(other.entries);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_table() {
        let cases = [
            ("f__in", Operator::In),
            ("f__nin", Operator::NotIn),
            ("f__eq", Operator::Eq),
            ("f__neq", Operator::Neq),
            ("f__gt", Operator::Gt),
            ("f__gte", Operator::Gte),
            ("f__lt", Operator::Lt),
            ("f__lte", Operator::Lte),
            ("f__between", Operator::Between),
            ("f__bw", Operator::Between),
            ("f__starts", Operator::Like),
            ("f__st", Operator::Like),
            ("f__ends", Operator::Like),
            ("f__ed", Operator::Like),
            ("f__contains", Operator::Like),
            ("f__ct", Operator::Like),
        ];
        for (key, expected) in cases {
            let parsed = FilterKey::parse(key);
            assert_eq!(parsed.field, "f", "{key}");
            assert_eq!(parsed.operator, expected, "{key}");
            assert_eq!(parsed.code, key.trim_start_matches("f__"), "{key}");
        }
    }

    #[test]
    fn bare_key_is_equality_with_empty_code() {
        let key = FilterKey::parse("id");
        assert_eq!(key.field, "id");
        assert_eq!(key.operator, Operator::Eq);
        assert_eq!(key.code, "");
    }

    #[test]
    fn unknown_suffix_degrades_to_equality() {
        let key = FilterKey::parse("age__approx");
        assert_eq!(key.operator, Operator::Eq);
        assert_eq!(key.code, "approx");
    }

    #[test]
    fn extra_segments_are_ignored() {
        let key = FilterKey::parse("name__starts__ignored");
        assert_eq!(key.field, "name");
        assert_eq!(key.operator, Operator::Like);
        assert_eq!(key.code, "starts");
    }

    #[test]
    fn filter_keeps_insertion_order() {
        let f: Filter = vec![("b", 1), ("a", 2)].into_iter().collect();
        let keys: Vec<&str> = f.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["b", "a"]);
    }
}
