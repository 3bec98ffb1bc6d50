//! Cell-level conversions shared by the relation recipes

use serde_json::Value;

use crate::table::cell_text;

/// `-2^63` and `2^63`, both exact as `f64`.
const I64_MIN_F64: f64 = -9_223_372_036_854_775_808.0;
const I64_MAX_F64: f64 = 9_223_372_036_854_775_808.0;

/// Join a list cell into one string. Null stays null; non-list values pass through.
pub fn join_list(value: Value, sep: &str) -> Value {
    match value {
        Value::Array(items) => Value::String(
            items
                .iter()
                .map(|v| cell_text(v).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(sep),
        ),
        other => other,
    }
}

/// Serialize a cell to compact JSON text. Null stays null.
pub fn to_json_text(value: Value) -> Value {
    match value {
        Value::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

/// First element of a list cell as an integer; numeric strings are parsed.
pub fn first_as_int(value: &Value) -> Value {
    let first = match value {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    first.and_then(as_int).map_or(Value::Null, Value::from)
}

/// Integer reading of a cell: integers, integral floats and numeric strings.
/// Floats outside the `i64` range read as `None` rather than saturating.
pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && (I64_MIN_F64..I64_MAX_F64).contains(f))
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
