//! Field-by-field freshness checks between stored and freshly fetched rows.
//!
//! Koios returns lovelace amounts as strings while older stored rows may hold
//! numbers, so a number and a string compare by value. Nested objects compare
//! structurally: key order inside `meta_json` and friends never matters.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Number, Value};

use crate::reconcile::SyncRecord;

/// Bookkeeping columns that never count as a change.
pub const EXCLUDED_KEYS: &[&str] = &["created_at", "updated_at"];

/// Whether `fetched` carries any value that differs from `stored`.
///
/// Only the keys present in `fetched` are inspected, so fields attached later
/// by enrichment (and therefore absent from a fresh fetch) are ignored.
pub fn should_update(stored: &Value, fetched: &Value) -> bool {
    let Some(fetched) = fetched.as_object() else {
        return !values_equal(stored, fetched);
    };
    let Some(stored) = stored.as_object() else {
        return true;
    };

    fetched
        .iter()
        .filter(|(key, _)| !EXCLUDED_KEYS.contains(&key.as_str()))
        .any(|(key, value)| !values_equal(stored.get(key).unwrap_or(&Value::Null), value))
}

/// Loose equality: numbers match their string spelling, containers compare
/// element-wise, everything else must match exactly.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            number_matches_str(n, s)
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| values_equal(value, other)))
        }
        _ => a == b,
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    match (as_integer(x), as_integer(y)) {
        (Some(a), Some(b)) => a == b,
        _ => x.as_f64() == y.as_f64(),
    }
}

fn number_matches_str(n: &Number, s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }
    if n.to_string() == s {
        return true;
    }
    if let (Ok(parsed), Some(int)) = (s.parse::<i128>(), as_integer(n)) {
        return parsed == int;
    }
    match (s.parse::<f64>(), n.as_f64()) {
        (Ok(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Serialize both records and compare them with [`should_update`].
pub fn record_changed<R: Serialize>(stored: &R, fetched: &R) -> bool {
    match (serde_json::to_value(stored), serde_json::to_value(fetched)) {
        (Ok(stored), Ok(fetched)) => should_update(&stored, &fetched),
        _ => true,
    }
}

/// Fetched records that are new or differ from their stored counterpart.
pub fn diff_records<R: SyncRecord>(stored: &[R], fetched: Vec<R>) -> Vec<R> {
    let by_key: HashMap<R::Key, &R> = stored.iter().map(|r| (r.key(), r)).collect();
    fetched
        .into_iter()
        .filter(|record| match by_key.get(&record.key()) {
            Some(existing) => record_changed(*existing, record),
            None => true,
        })
        .collect()
}
