//! Shared validation helpers.

use std::collections::{BTreeMap, HashSet};

/// Push an error if `value` is outside `[min, max]`.
pub(crate) fn validate_range(errors: &mut Vec<String>, name: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

/// Push an error for blank or repeated ids.
pub(crate) fn validate_ids(errors: &mut Vec<String>, name: &str, ids: &[String]) {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            errors.push(format!("{name} contains an empty id"));
        } else if !seen.insert(id.as_str()) {
            errors.push(format!("{name} contains '{id}' more than once"));
        }
    }
}

/// Push an error for every parameter entry that is not a table.
pub(crate) fn validate_object_params(
    errors: &mut Vec<String>,
    name: &str,
    params: &BTreeMap<String, serde_json::Value>,
) {
    for (id, value) in params {
        if !value.is_object() {
            errors.push(format!("{name}.\"{id}\" must be a table"));
        }
    }
}
