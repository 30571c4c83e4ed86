//! Entity type extraction from response payloads.
//!
//! Payloads are schema-less JSON trees. Entities nest inside other entities
//! and inside arrays of mixed union members, so every branch is visited.

use std::collections::BTreeSet;

use serde_json::Value;

use super::keys::TypeTag;

/// Conventional discriminator field on GraphQL entity objects.
pub const DEFAULT_TYPENAME_FIELD: &str = "__typename";

/// Collect every distinct `__typename` found anywhere in `payload`.
pub fn collect_typenames(payload: &Value) -> BTreeSet<TypeTag> {
    collect_typenames_with(payload, DEFAULT_TYPENAME_FIELD)
}

/// Collect every distinct value of `field` found anywhere in `payload`.
///
/// Uses an explicit stack, so nesting depth is bounded by memory only.
/// A discriminator that is not a string is ignored rather than rejected.
pub fn collect_typenames_with(payload: &Value, field: &str) -> BTreeSet<TypeTag> {
    let mut tags = BTreeSet::new();
    let mut stack = vec![payload];

    while let Some(value) = stack.pop() {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(name)) = map.get(field) {
                    tags.insert(TypeTag::from(name.as_str()));
                }
                stack.extend(map.values());
            }
            Value::Array(items) => stack.extend(items),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
        }
    }

    tags
}
