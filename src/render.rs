//! SQL literal rendering.
//!
//! Every value that ends up inlined into command text passes through [`render_literal`];
//! [`quote_text`] is the only place quotes are escaped.

use crate::error::DbError;
use crate::types::Value;

/// Strings with this prefix are spatial-function calls and are emitted verbatim.
pub const RAW_EXPRESSION_PREFIX: &str = "ST_";

/// Right single quote that went through a latin-1 round trip.
const MISENCODED_QUOTE: &str = "\u{e2}\u{20ac}\u{2122}";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeMatch {
    Prefix,
    Suffix,
    Substring,
}

/// Render `value` as SQL literal text for use after an operator built from `code`.
///
/// `code` is the raw filter suffix (`"starts"`, `"in"`, ...) or `""` for plain values such as
/// insert payloads.
///
/// ```rust
/// use deebee::prelude::*;
/// use deebee::render::render_literal;
///
/// assert_eq!(render_literal(&Value::from("O'Brien"), "").unwrap(), "'O''Brien'");
/// assert_eq!(render_literal(&Value::from("A"), "starts").unwrap(), "'A%'");
/// assert_eq!(render_literal(&Value::from(vec![1, 2]), "in").unwrap(), "(1,2)");
/// ```
///
/// # Errors
/// Returns `DbError::RenderError` when the value's shape cannot be used with the operator
/// (a list under `like`, a scalar under `between`, an empty `in` list) or when a float is
/// not finite.
pub fn render_literal(value: &Value, code: &str) -> Result<String, DbError> {
    if let Some(mode) = like_match(code) {
        return render_like(value, mode);
    }
    match code {
        "between" | "bw" => render_between(value),
        "in" | "nin" => render_members(value),
        _ => render_plain(value),
    }
}

/// Quote a string, doubling embedded single quotes.
#[must_use]
pub fn quote_text(text: &str) -> String {
    format!("'{}'", escape_text(text))
}

fn escape_text(text: &str) -> String {
    text.replace('\'', "''").replace(MISENCODED_QUOTE, "''")
}

fn like_match(code: &str) -> Option<LikeMatch> {
    match code {
        "starts" | "st" => Some(LikeMatch::Prefix),
        "ends" | "ed" => Some(LikeMatch::Suffix),
        "contains" | "ct" => Some(LikeMatch::Substring),
        _ => None,
    }
}

fn render_like(value: &Value, mode: LikeMatch) -> Result<String, DbError> {
    let text = escape_text(&bare_text(value)?);
    Ok(match mode {
        LikeMatch::Prefix => format!("'{text}%'"),
        LikeMatch::Suffix => format!("'%{text}'"),
        LikeMatch::Substring => format!("'%{text}%'"),
    })
}

fn render_between(value: &Value) -> Result<String, DbError> {
    let (low, high) = match value {
        Value::Range(low, high) => (low.as_ref(), high.as_ref()),
        Value::List(items) if items.len() == 2 => (&items[0], &items[1]),
        other => {
            return Err(DbError::RenderError(format!(
                "between expects a pair of values, got {other:?}"
            )));
        }
    };
    // Numeric-ness is decided by the bounds themselves, not by the container.
    if low.is_numeric() && high.is_numeric() {
        return Ok(format!("{} and {}", number_text(low)?, number_text(high)?));
    }
    Ok(format!(
        "{} and {}",
        quote_text(&bare_text(low)?),
        quote_text(&bare_text(high)?)
    ))
}

fn render_members(value: &Value) -> Result<String, DbError> {
    let Value::List(items) = value else {
        return Err(DbError::RenderError(format!(
            "in/nin expects a list of values, got {value:?}"
        )));
    };
    if items.is_empty() {
        return Err(DbError::RenderError(
            "in/nin list must contain at least one value".to_string(),
        ));
    }
    let members = items
        .iter()
        .map(|item| match item {
            Value::Int(_) | Value::Float(_) => number_text(item),
            Value::Bool(b) => Ok(bool_text(*b).to_string()),
            Value::Null => Ok("null".to_string()),
            other => Ok(quote_text(&bare_text(other)?)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("({})", members.join(",")))
}

fn render_plain(value: &Value) -> Result<String, DbError> {
    match value {
        Value::Int(_) | Value::Float(_) => number_text(value),
        Value::Bool(b) => Ok(bool_text(*b).to_string()),
        Value::Timestamp(ts) => Ok(quote_text(&ts.format(TIMESTAMP_FORMAT).to_string())),
        Value::Date(d) => Ok(quote_text(&d.format(DATE_FORMAT).to_string())),
        Value::Null => Ok("null".to_string()),
        Value::Text(s) if s.starts_with(RAW_EXPRESSION_PREFIX) => Ok(s.clone()),
        Value::Text(s) => Ok(quote_text(s)),
        Value::Range(..) => render_between(value),
        Value::List(_) => render_members(value),
    }
}

fn number_text(value: &Value) -> Result<String, DbError> {
    match value {
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(f) if f.is_finite() => Ok(f.to_string()),
        Value::Float(f) => Err(DbError::RenderError(format!(
            "non-finite float {f} has no SQL literal form"
        ))),
        other => Err(DbError::RenderError(format!("{other:?} is not a number"))),
    }
}

fn bool_text(b: bool) -> &'static str {
    if b { "true" } else { "false" }
}

/// Unquoted text form of a scalar, used inside quoted and pattern contexts.
fn bare_text(value: &Value) -> Result<String, DbError> {
    match value {
        Value::Text(s) => Ok(s.clone()),
        Value::Int(_) | Value::Float(_) => number_text(value),
        Value::Bool(b) => Ok(bool_text(*b).to_string()),
        Value::Date(d) => Ok(d.format(DATE_FORMAT).to_string()),
        Value::Timestamp(ts) => Ok(ts.format(TIMESTAMP_FORMAT).to_string()),
        Value::Null | Value::Range(..) | Value::List(_) => Err(DbError::RenderError(format!(
            "{value:?} cannot be used where a single scalar is expected"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn plain(v: impl Into<Value>) -> String {
        render_literal(&v.into(), "").unwrap()
    }

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(plain("O'Brien"), "'O''Brien'");
        assert_eq!(plain("it''s"), "'it''''s'");
    }

    #[test]
    fn misencoded_right_quote_is_normalized() {
        assert_eq!(plain("don\u{e2}\u{20ac}\u{2122}t"), "'don''t'");
    }

    #[test]
    fn scalars() {
        assert_eq!(plain(30), "30");
        assert_eq!(plain(2.5), "2.5");
        assert_eq!(plain(true), "true");
        assert_eq!(plain(false), "false");
        assert_eq!(plain(Value::Null), "null");
    }

    #[test]
    fn dates_and_timestamps() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(plain(day), "'2024-02-29'");
        let ts = day.and_hms_opt(13, 5, 9).unwrap();
        assert_eq!(plain(ts), "'2024-02-29T13:05:09'");
        let precise = day.and_hms_micro_opt(13, 5, 9, 250_000).unwrap();
        assert_eq!(plain(precise), "'2024-02-29T13:05:09.250'");
    }

    #[test]
    fn spatial_calls_pass_through() {
        assert_eq!(
            plain("ST_GeomFromText('POINT(1 2)')"),
            "ST_GeomFromText('POINT(1 2)')"
        );
    }

    #[test]
    fn like_patterns() {
        let v = Value::from("ab");
        assert_eq!(render_literal(&v, "starts").unwrap(), "'ab%'");
        assert_eq!(render_literal(&v, "st").unwrap(), "'ab%'");
        assert_eq!(render_literal(&v, "ends").unwrap(), "'%ab'");
        assert_eq!(render_literal(&v, "ed").unwrap(), "'%ab'");
        assert_eq!(render_literal(&v, "contains").unwrap(), "'%ab%'");
        assert_eq!(render_literal(&v, "ct").unwrap(), "'%ab%'");
        assert_eq!(
            render_literal(&Value::from("O'B"), "starts").unwrap(),
            "'O''B%'"
        );
    }

    #[test]
    fn between_checks_the_bounds() {
        assert_eq!(
            render_literal(&Value::from((1, 10)), "between").unwrap(),
            "1 and 10"
        );
        assert_eq!(
            render_literal(&Value::from(vec![1.5, 2.0]), "bw").unwrap(),
            "1.5 and 2"
        );
        assert_eq!(
            render_literal(&Value::from(("a", "m")), "between").unwrap(),
            "'a' and 'm'"
        );
        let lo = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let hi = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(
            render_literal(&Value::from((lo, hi)), "between").unwrap(),
            "'2024-01-01' and '2024-12-31'"
        );
    }

    #[test]
    fn between_rejects_non_pairs() {
        assert!(render_literal(&Value::from(5), "between").is_err());
        assert!(render_literal(&Value::from(vec![1, 2, 3]), "bw").is_err());
    }

    #[test]
    fn membership_lists() {
        assert_eq!(
            render_literal(&Value::from(vec![1, 2, 3]), "in").unwrap(),
            "(1,2,3)"
        );
        assert_eq!(
            render_literal(&Value::from(vec!["a", "b'c"]), "nin").unwrap(),
            "('a','b''c')"
        );
        let mixed = Value::List(vec![Value::Bool(true), Value::Int(2), Value::from("x")]);
        assert_eq!(render_literal(&mixed, "in").unwrap(), "(true,2,'x')");
    }

    #[test]
    fn membership_rejects_scalars_and_empty_lists() {
        assert!(render_literal(&Value::from(1), "in").is_err());
        assert!(render_literal(&Value::List(vec![]), "nin").is_err());
    }

    #[test]
    fn unknown_codes_render_plainly() {
        assert_eq!(render_literal(&Value::from("x"), "approx").unwrap(), "'x'");
    }

    #[test]
    fn non_finite_floats_fail() {
        assert!(render_literal(&Value::Float(f64::NAN), "").is_err());
        assert!(render_literal(&Value::Float(f64::INFINITY), "").is_err());
    }

    #[test]
    fn composite_values_without_operator_still_render() {
        assert_eq!(plain(vec![1, 2]), "(1,2)");
        assert_eq!(plain((1, 2)), "1 and 2");
    }
}
