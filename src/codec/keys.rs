//! Case-insensitive field matching.
//!
//! Files are hand edited, so `RunsOn`, `runson` and `runsOn` must all land in
//! the same field. Before a mapping is handed to serde, every key that matches
//! a known field name ignoring case is rewritten to its canonical lower camel
//! case spelling. Null values are dropped so that absent and `~` fields decode
//! identically.
//!
//! Unquoted scalars such as `name: 1234` or `model: 2960` parse as numbers;
//! text fields take them back as strings.

use serde_yaml::{Mapping, Value};

/// Every field name used by the resource model, in canonical spelling.
pub const KNOWN_FIELDS: &[&str] = &[
    "kind", "name", "tags", "model", "cpus", "cores", "threads", "ram", "size", "mts", "drives",
    "type", "nics", "speed", "ports", "gpus", "vram", "ipmi", "managed", "poe", "count", "va",
    "os", "runsOn", "network", "ip", "port", "protocol", "url",
];

/// Fields holding free text. Numeric and boolean scalars under these keys
/// are read as their string form.
pub const TEXT_FIELDS: &[&str] = &[
    "name", "model", "type", "os", "runsOn", "ip", "protocol", "url",
];

/// Fields holding a list of free-text items.
pub const TEXT_LIST_FIELDS: &[&str] = &["tags"];

/// Canonical spelling of `key`, if it names a known field.
pub fn canonical_field(key: &str) -> Option<&'static str> {
    KNOWN_FIELDS
        .iter()
        .copied()
        .find(|field| field.eq_ignore_ascii_case(key))
}

/// Rewrite keys of `value` (recursively) to their canonical spelling.
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Mapping(mapping) => Value::Mapping(canonicalize_mapping(mapping)),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(canonicalize).collect()),
        Value::Tagged(mut tagged) => {
            tagged.value = canonicalize(tagged.value);
            Value::Tagged(tagged)
        }
        other => other,
    }
}

pub fn canonicalize_mapping(mapping: Mapping) -> Mapping {
    let mut out = Mapping::with_capacity(mapping.len());
    for (key, value) in mapping {
        if value.is_null() {
            continue;
        }
        let (key, value) = match key {
            Value::String(text) => match canonical_field(&text) {
                Some(field) => (Value::String(field.to_string()), coerce_text(field, value)),
                None => (Value::String(text), value),
            },
            other => (other, value),
        };
        out.insert(key, canonicalize(value));
    }
    out
}

/// Read numeric and boolean scalars of text fields as strings.
fn coerce_text(field: &str, value: Value) -> Value {
    if TEXT_FIELDS.contains(&field) {
        scalar_to_string(value)
    } else if TEXT_LIST_FIELDS.contains(&field) {
        match value {
            Value::Sequence(items) => {
                Value::Sequence(items.into_iter().map(scalar_to_string).collect())
            }
            other => other,
        }
    } else {
        value
    }
}

fn scalar_to_string(value: Value) -> Value {
    match value {
        Value::Number(number) => Value::String(number.to_string()),
        Value::Bool(flag) => Value::String(flag.to_string()),
        other => other,
    }
}

/// Find the value stored under `field` ignoring key case.
pub fn get_ignore_case<'a>(mapping: &'a Mapping, field: &str) -> Option<&'a Value> {
    mapping.iter().find_map(|(key, value)| match key {
        Value::String(text) if text.eq_ignore_ascii_case(field) => Some(value),
        _ => None,
    })
}
