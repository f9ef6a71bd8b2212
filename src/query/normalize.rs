//! Row value normalization.
//!
//! Every 64-bit integer becomes a double. Values above 2^53 lose precision;
//! consumers render numbers as doubles anyway, so the loss is accepted.

use crate::db::{Row, Value};

/// Converts a single value to its normalized form.
pub fn normalize_value(value: Value) -> Value {
    match value {
        Value::BigInt(i) => Value::Number(i as f64),
        other => other,
    }
}

/// Normalizes every value of every row in place. Nothing else is touched.
pub fn normalize_rows(rows: &mut [Row]) {
    for row in rows.iter_mut() {
        for value in row.values_mut() {
            *value = normalize_value(std::mem::take(value));
        }
    }
}
