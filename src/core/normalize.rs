// src/core/normalize.rs

//! Total, non-throwing coercion of arbitrary configuration values into
//! canonical typed shapes.
//!
//! Every operation here follows the same policy: accept a structural match
//! as-is, otherwise attempt one well-defined conversion, otherwise log the
//! mismatch at debug level and return the caller's default. Nothing in this
//! module returns an error; downstream code relies on these being total
//! functions.

use crate::models::ConfigValue;
use std::collections::BTreeMap;

/// Coerces `value` into a `String`.
///
/// Strings pass through; bool, integer, and float values are stringified.
/// Structured shapes (list, mapping) and absent values yield `default`.
pub fn ensure_string(value: Option<&ConfigValue>, default: &str) -> String {
    match value {
        Some(ConfigValue::String(s)) => s.clone(),
        Some(ConfigValue::Bool(b)) => b.to_string(),
        Some(ConfigValue::Integer(i)) => i.to_string(),
        Some(ConfigValue::Float(x)) => x.to_string(),
        Some(other) => {
            log::debug!(
                "ensure_string: cannot stringify {} value '{}', using default '{}'",
                other.type_name(),
                other,
                default
            );
            default.to_string()
        }
        None => default.to_string(),
    }
}

/// Coerces `value` into a list.
///
/// Lists pass through; a scalar wraps into a one-element list. Mappings and
/// absent values yield `default`.
pub fn ensure_list(value: Option<&ConfigValue>, default: &[ConfigValue]) -> Vec<ConfigValue> {
    match value {
        Some(ConfigValue::List(items)) => items.clone(),
        Some(ConfigValue::Mapping(map)) => {
            log::debug!(
                "ensure_list: mapping with {} entries is not a list, using default",
                map.len()
            );
            default.to_vec()
        }
        Some(scalar) => vec![scalar.clone()],
        None => default.to_vec(),
    }
}

/// Coerces `value` into a structured mapping. Anything that is not already
/// a mapping yields an empty map.
pub fn to_structured_mapping(value: Option<&ConfigValue>) -> BTreeMap<String, ConfigValue> {
    match value {
        Some(ConfigValue::Mapping(map)) => map.clone(),
        Some(other) => {
            log::debug!(
                "to_structured_mapping: {} value '{}' is not a mapping, using empty map",
                other.type_name(),
                other
            );
            BTreeMap::new()
        }
        None => BTreeMap::new(),
    }
}

/// Coerces `value` into a structured sequence. Lists pass through, a scalar
/// wraps into a one-element sequence, everything else yields empty.
pub fn to_structured_sequence(value: Option<&ConfigValue>) -> Vec<ConfigValue> {
    match value {
        Some(ConfigValue::List(items)) => items.clone(),
        Some(ConfigValue::Mapping(map)) => {
            log::debug!(
                "to_structured_sequence: mapping with {} entries is not a sequence, using empty",
                map.len()
            );
            Vec::new()
        }
        Some(scalar) => vec![scalar.clone()],
        None => Vec::new(),
    }
}

/// Looks up `key` in `mapping`, cloning the value if present and falling
/// back to `default` (with a debug trail) if not.
pub fn map_get_value(
    mapping: &BTreeMap<String, ConfigValue>,
    key: &str,
    default: ConfigValue,
) -> ConfigValue {
    match mapping.get(key) {
        Some(value) => value.clone(),
        None => {
            log::debug!(
                "map_get_value: key '{}' absent, using default '{}'",
                key,
                default
            );
            default
        }
    }
}
