//! Metadata filtering for vector search.
//!
//! A filter is a conjunction of per-field constraints. Each field maps either
//! to a bare scalar (sugar for `eq`) or to an explicit operator map. A record
//! matches a filter only if every field constraint matches; a field missing
//! from the record's metadata never matches, regardless of operator.

use serde_json::Value;
use std::collections::HashMap;

pub type Metadata = HashMap<String, Value>;

/// A single field's constraint: either equality sugar or an operator map.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum FieldFilter {
    Eq(Value),
    Ops(HashMap<String, Value>),
}

/// A metadata filter: AND of per-field constraints.
pub type Filter = HashMap<String, FieldFilter>;

/// Returns true if `metadata` satisfies every field constraint in `filter`.
///
/// An empty or absent filter matches everything.
pub fn matches(filter: Option<&Filter>, metadata: &Metadata) -> bool {
    let filter = match filter {
        Some(f) if !f.is_empty() => f,
        _ => return true,
    };
    filter
        .iter()
        .all(|(field, constraint)| matches_field(field, constraint, metadata))
}

fn matches_field(field: &str, constraint: &FieldFilter, metadata: &Metadata) -> bool {
    let actual = match metadata.get(field) {
        Some(v) => v,
        None => return false,
    };
    match constraint {
        FieldFilter::Eq(expected) => apply_operator("eq", actual, expected),
        FieldFilter::Ops(ops) => ops
            .iter()
            .all(|(op, expected)| apply_operator(op, actual, expected)),
    }
}

fn apply_operator(op: &str, actual: &Value, expected: &Value) -> bool {
    match op {
        "eq" => actual == expected,
        "ne" => actual != expected,
        "gt" => compare(actual, expected).map_or(false, |o| o == std::cmp::Ordering::Greater),
        "gte" => compare(actual, expected).map_or(false, |o| o != std::cmp::Ordering::Less),
        "lt" => compare(actual, expected).map_or(false, |o| o == std::cmp::Ordering::Less),
        "lte" => compare(actual, expected).map_or(false, |o| o != std::cmp::Ordering::Greater),
        "contains" => contains(actual, expected),
        "in" => expected.as_array().map_or(false, |arr| arr.contains(actual)),
        "nin" => expected.as_array().map_or(false, |arr| !arr.contains(actual)),
        // Unknown operators are permissive: they never exclude a record.
        _ => true,
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<std::cmp::Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// String-coerces a value the way `contains` needs: bare text for strings,
/// numbers, and bools, not a JSON-quoted representation.
fn stringify(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn contains(actual: &Value, expected: &Value) -> bool {
    stringify(actual).to_lowercase().contains(&stringify(expected).to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(pairs: &[(&str, Value)]) -> Metadata {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn no_filter_matches_everything() {
        let m = meta(&[]);
        assert!(matches(None, &m));
    }

    #[test]
    fn bare_scalar_is_eq_sugar() {
        let m = meta(&[("category", json!("a"))]);
        let mut f: Filter = HashMap::new();
        f.insert("category".into(), FieldFilter::Eq(json!("a")));
        assert!(matches(Some(&f), &m));
        f.insert("category".into(), FieldFilter::Eq(json!("b")));
        assert!(!matches(Some(&f), &m));
    }

    #[test]
    fn missing_field_never_matches() {
        let m = meta(&[]);
        let mut f: Filter = HashMap::new();
        f.insert("category".into(), FieldFilter::Eq(json!("a")));
        assert!(!matches(Some(&f), &m));
    }

    #[test]
    fn unknown_operator_is_permissive() {
        let m = meta(&[("x", json!(1))]);
        let mut ops = HashMap::new();
        ops.insert("frobnicate".to_string(), json!(42));
        let mut f: Filter = HashMap::new();
        f.insert("x".into(), FieldFilter::Ops(ops));
        assert!(matches(Some(&f), &m));
    }

    #[test]
    fn type_mismatch_on_ordering_is_false() {
        let m = meta(&[("x", json!("not a number"))]);
        let mut ops = HashMap::new();
        ops.insert("gt".to_string(), json!(5));
        let mut f: Filter = HashMap::new();
        f.insert("x".into(), FieldFilter::Ops(ops));
        assert!(!matches(Some(&f), &m));
    }

    #[test]
    fn contains_is_case_insensitive_substring() {
        let m = meta(&[("title", json!("Rust Vector DB"))]);
        let mut ops = HashMap::new();
        ops.insert("contains".to_string(), json!("vector"));
        let mut f: Filter = HashMap::new();
        f.insert("title".into(), FieldFilter::Ops(ops));
        assert!(matches(Some(&f), &m));
    }

    #[test]
    fn contains_coerces_numbers_to_strings() {
        let m = meta(&[("year", json!(2024))]);
        let mut ops = HashMap::new();
        ops.insert("contains".to_string(), json!("202"));
        let mut f: Filter = HashMap::new();
        f.insert("year".into(), FieldFilter::Ops(ops));
        assert!(matches(Some(&f), &m));
    }

    #[test]
    fn in_and_nin_operate_on_lists() {
        let m = meta(&[("tag", json!("a"))]);
        let mut ops = HashMap::new();
        ops.insert("in".to_string(), json!(["a", "b"]));
        let mut f: Filter = HashMap::new();
        f.insert("tag".into(), FieldFilter::Ops(ops.clone()));
        assert!(matches(Some(&f), &m));

        let mut nin_ops = HashMap::new();
        nin_ops.insert("nin".to_string(), json!(["a", "b"]));
        f.insert("tag".into(), FieldFilter::Ops(nin_ops));
        assert!(!matches(Some(&f), &m));
    }
}
