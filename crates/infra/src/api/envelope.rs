//! Response envelope handling
//!
//! Successful responses arrive wrapped as `{ <namespace>: { <key>: payload } }`.
//! Exactly one level is removed, and only when it is unambiguous.

use serde_json::{Map, Value};

/// Strip the `{namespace: {key: payload}}` wrapper
///
/// - one namespace holding exactly one key: returns the payload
/// - one namespace holding zero or several keys: returns the namespace
///   object unmodified
/// - anything else (arrays, scalars, several top-level keys, a single
///   top-level key whose value is not an object): returned unchanged
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(outer) if is_single_namespace(&outer) => match outer.into_iter().next() {
            Some((_, Value::Object(namespace))) if namespace.len() == 1 => {
                namespace.into_iter().next().map_or(Value::Null, |(_, payload)| payload)
            }
            Some((_, namespace)) => namespace,
            None => Value::Null,
        },
        other => other,
    }
}

fn is_single_namespace(outer: &Map<String, Value>) -> bool {
    outer.len() == 1 && outer.values().all(Value::is_object)
}
