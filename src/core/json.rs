//! Structural equality over JSON values.
//!
//! Keys and values are `serde_json::Value`; the merge matches keys by
//! structure, not by serialized text. Numbers compare by their parsed
//! representation, so `1` and `1.0` are distinct keys.

use serde_json::Value;

/// Structural JSON equality.
///
/// Arrays are position-sensitive; objects compare by key set with per-key
/// recursion. Reflexive and symmetric.
pub fn equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| equals(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| equals(x, y)))
        }
        _ => false,
    }
}
