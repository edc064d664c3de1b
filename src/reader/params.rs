//! Named parameter binding
//!
//! Statements are written with `:name` placeholders. Before execution the
//! placeholders are rewritten to positional `?` markers and the values are
//! collected in order, so the warehouse binds them and the SQL text never
//! contains caller-supplied values.

use crate::{Result, SalesvizError};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A value bound to a named placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Date(NaiveDate),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => write!(f, "{}", s),
            ParamValue::Integer(n) => write!(f, "{}", n),
            ParamValue::Real(n) => write!(f, "{}", n),
            ParamValue::Boolean(b) => write!(f, "{}", b),
            ParamValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(value as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Real(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Boolean(value)
    }
}

impl From<NaiveDate> for ParamValue {
    fn from(value: NaiveDate) -> Self {
        ParamValue::Date(value)
    }
}

/// Named parameter values for one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }
}

/// A statement with positional markers and the values to bind, in order
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub bindings: Vec<ParamValue>,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// End index (exclusive) of a quoted section starting at `start`.
///
/// A doubled quote character is an escaped quote. Inside single-quoted
/// strings a backslash escapes the next character.
fn scan_quoted(chars: &[char], start: usize, quote: char) -> usize {
    let mut j = start + 1;
    while j < chars.len() {
        let c = chars[j];
        if c == quote {
            if chars.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return j + 1;
        }
        if quote == '\'' && c == '\\' {
            j += 2;
            continue;
        }
        j += 1;
    }
    chars.len()
}

/// End index (exclusive) of the first occurrence of `terminator` at or after `from`.
fn scan_until(chars: &[char], from: usize, terminator: &[char]) -> usize {
    let mut j = from;
    while j + terminator.len() <= chars.len() {
        if chars[j..j + terminator.len()] == *terminator {
            return j + terminator.len();
        }
        j += 1;
    }
    chars.len()
}

/// Rewrite `:name` placeholders to `?` and collect their values in order.
///
/// Quoted strings, quoted identifiers, `$$` blocks, comments, `::` casts and
/// semi-structured paths (`v:field`) are left untouched. A placeholder may
/// appear several times; each occurrence binds its value again.
///
/// # Errors
///
/// Returns `SalesvizError::QueryError` when a placeholder has no value.
pub fn bind_named(sql: &str, params: &Params) -> Result<BoundStatement> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut bindings = Vec::new();
    let mut used: BTreeSet<&str> = BTreeSet::new();

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        let end = match (c, next) {
            ('\'', _) | ('"', _) => scan_quoted(&chars, i, c),
            ('-', Some('-')) => scan_until(&chars, i + 2, &['\n']),
            ('/', Some('*')) => scan_until(&chars, i + 2, &['*', '/']),
            ('$', Some('$')) => scan_until(&chars, i + 2, &['$', '$']),
            (':', Some(n)) if n == ':' => i + 2,
            (':', Some(n)) if (n.is_alphabetic() || n == '_') => {
                let preceded_by_word = i > 0 && {
                    let prev = chars[i - 1];
                    is_word_char(prev) || prev == ':' || prev == '\\'
                };
                if preceded_by_word {
                    i + 1
                } else {
                    let mut j = i + 1;
                    while j < chars.len() && is_word_char(chars[j]) {
                        j += 1;
                    }
                    let name: String = chars[i + 1..j].iter().collect();
                    let value = params.get(&name).ok_or_else(|| {
                        SalesvizError::QueryError(format!(
                            "No value supplied for parameter :{}",
                            name
                        ))
                    })?;
                    bindings.push(value.clone());
                    if let Some((known, _)) = params.values.get_key_value(&name) {
                        used.insert(known.as_str());
                    }
                    out.push('?');
                    i = j;
                    continue;
                }
            }
            _ => i + 1,
        };

        out.extend(&chars[i..end]);
        i = end;
    }

    for name in params.names().filter(|n| !used.contains(n)) {
        tracing::debug!("Parameter :{} is not referenced by the statement", name);
    }

    Ok(BoundStatement {
        sql: out,
        bindings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_binds_in_order_of_appearance() {
        let params = Params::new()
            .with("end_date", date(2012, 12, 31))
            .with("start_date", date(2012, 1, 1));
        let bound = bind_named(
            "SELECT * FROM f WHERE d BETWEEN :start_date AND :end_date",
            &params,
        )
        .unwrap();

        assert_eq!(bound.sql, "SELECT * FROM f WHERE d BETWEEN ? AND ?");
        assert_eq!(
            bound.bindings,
            vec![
                ParamValue::Date(date(2012, 1, 1)),
                ParamValue::Date(date(2012, 12, 31))
            ]
        );
    }

    #[test]
    fn test_values_never_reach_sql_text() {
        let params = Params::new().with("name", "x'; DROP TABLE stores; --");
        let bound = bind_named("SELECT 1 WHERE store_type = :name", &params).unwrap();
        assert_eq!(bound.sql, "SELECT 1 WHERE store_type = ?");
        assert!(!bound.sql.contains("DROP"));
        assert_eq!(bound.bindings.len(), 1);
    }

    #[test]
    fn test_repeated_placeholder_binds_twice() {
        let params = Params::new().with("n", 5i64);
        let bound = bind_named("SELECT :n + :n", &params).unwrap();
        assert_eq!(bound.sql, "SELECT ? + ?");
        assert_eq!(
            bound.bindings,
            vec![ParamValue::Integer(5), ParamValue::Integer(5)]
        );
    }

    #[test]
    fn test_missing_parameter_is_error() {
        let err = bind_named("SELECT :missing", &Params::new())
            .unwrap_err()
            .to_string();
        assert!(err.contains(":missing"));
    }

    #[test]
    fn test_skips_literals_identifiers_and_comments() {
        let params = Params::new().with("x", 1i64);
        let sql = "SELECT ':not_a_param', \"col:weird\", 'it''s :x' -- :comment\n\
                   /* :block */ $$ :dollar $$ FROM t WHERE a = :x";
        let bound = bind_named(sql, &params).unwrap();
        assert!(bound.sql.contains("':not_a_param'"));
        assert!(bound.sql.contains("\"col:weird\""));
        assert!(bound.sql.contains("'it''s :x'"));
        assert!(bound.sql.contains("-- :comment"));
        assert!(bound.sql.contains("/* :block */"));
        assert!(bound.sql.contains("$$ :dollar $$"));
        assert!(bound.sql.ends_with("WHERE a = ?"));
        assert_eq!(bound.bindings.len(), 1);
    }

    #[test]
    fn test_casts_and_paths_are_not_placeholders() {
        let params = Params::new().with("d", "2012-01-01");
        let bound = bind_named("SELECT v:field, :d::DATE, x::int FROM t", &params).unwrap();
        assert_eq!(bound.sql, "SELECT v:field, ?::DATE, x::int FROM t");
        assert_eq!(bound.bindings, vec![ParamValue::Text("2012-01-01".into())]);
    }

    #[test]
    fn test_unused_parameters_are_ignored() {
        let params = Params::new().with("start_date", "2011-01-01");
        let bound = bind_named("SELECT 1", &params).unwrap();
        assert_eq!(bound.sql, "SELECT 1");
        assert!(bound.bindings.is_empty());
    }

    #[test]
    fn test_non_ascii_text_is_preserved() {
        let params = Params::new().with("city", "Zürich");
        let bound = bind_named("SELECT 'café' WHERE c = :city", &params).unwrap();
        assert_eq!(bound.sql, "SELECT 'café' WHERE c = ?");
    }

    #[test]
    fn test_display_formats_dates_as_iso() {
        assert_eq!(ParamValue::Date(date(2011, 3, 4)).to_string(), "2011-03-04");
        assert_eq!(ParamValue::Boolean(true).to_string(), "true");
    }
}
