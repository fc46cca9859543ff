//! Target mapping templates and the descriptors they produce.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::domain::error::{ProxmoxResult, ValidationError};

const MISSING_NAME_OR_URI: &str =
    "You must provide a 'name' or 'uri' in 'target_mapping' for the Proxmox plugin";

/// Caller-supplied shape of a target.
///
/// String leaves are dotted attribute paths into a normalized record
/// (`fqdn`, `net.0.ip`, `vmid`); objects and arrays nest; any other JSON value
/// is copied through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(Map<String, Value>);

impl Template {
    /// Validates that the template names the target by `name` or `uri`.
    pub fn new(mapping: Map<String, Value>) -> ProxmoxResult<Self> {
        if !mapping.contains_key("name") && !mapping.contains_key("uri") {
            return Err(ValidationError::Plugin(MISSING_NAME_OR_URI.to_string()).into());
        }
        Ok(Self(mapping))
    }

    /// Top-level record attributes referenced by any path, in first-use order.
    #[must_use]
    pub fn required_attributes(&self) -> Vec<String> {
        let mut attributes = Vec::new();
        for value in self.0.values() {
            collect_attributes(value, &mut attributes);
        }
        attributes
    }

    /// Builds a descriptor by resolving every path against `data`.
    #[must_use]
    pub fn apply(&self, data: &Value) -> TargetDescriptor {
        let fields = self
            .0
            .iter()
            .map(|(key, value)| (key.clone(), apply_value(value, data)))
            .collect();
        TargetDescriptor(fields)
    }
}

fn collect_attributes(value: &Value, acc: &mut Vec<String>) {
    match value {
        Value::String(path) => {
            let head = path.split('.').next().unwrap_or_default();
            if !head.is_empty() && !acc.iter().any(|a| a == head) {
                acc.push(head.to_string());
            }
        }
        Value::Object(map) => map.values().for_each(|v| collect_attributes(v, acc)),
        Value::Array(items) => items.iter().for_each(|v| collect_attributes(v, acc)),
        _ => {}
    }
}

fn apply_value(value: &Value, data: &Value) -> Value {
    match value {
        Value::String(path) => lookup(path, data),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, v)| (key.clone(), apply_value(v, data)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| apply_value(v, data)).collect()),
        other => other.clone(),
    }
}

/// Resolves a dotted path; numeric segments index into arrays.
///
/// Anything missing along the way yields `null`.
#[must_use]
pub fn lookup(path: &str, data: &Value) -> Value {
    let mut current = data;
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Value::Null,
        }
    }
    current.clone()
}

/// A resolved target: `name` and/or `uri`, plus whatever else the template shaped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetDescriptor(Map<String, Value>);

impl TargetDescriptor {
    #[must_use]
    pub fn name(&self) -> Option<&Value> {
        self.0.get("name")
    }

    #[must_use]
    pub fn uri(&self) -> Option<&Value> {
        self.0.get("uri")
    }

    /// The `facts` mapping, when the template declares one.
    #[must_use]
    pub fn facts(&self) -> Option<&Map<String, Value>> {
        self.0.get("facts").and_then(Value::as_object)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::error::ProxmoxError;
    use serde_json::json;

    fn template(value: Value) -> ProxmoxResult<Template> {
        match value {
            Value::Object(map) => Template::new(map),
            _ => unreachable!("test templates are objects"),
        }
    }

    #[test]
    fn test_template_requires_name_or_uri() {
        let err = template(json!({"facts": {"os": "ostype"}})).unwrap_err();
        assert!(matches!(err, ProxmoxError::Validation { .. }));
        assert_eq!(err.message(), MISSING_NAME_OR_URI);

        assert!(template(json!({"uri": "fqdn"})).is_ok());
        assert!(template(json!({"name": "id"})).is_ok());
    }

    #[test]
    fn test_required_attributes() {
        let t = template(json!({
            "name": "id",
            "uri": "net.0.ip",
            "facts": {"fqdn": "fqdn", "bridge": "net.0.bridge", "tags": ["tags"]},
            "config": {"transport": 7}
        }))
        .unwrap();
        assert_eq!(t.required_attributes(), vec!["id", "net", "fqdn", "tags"]);
    }

    #[test]
    fn test_apply_template() {
        let t = template(json!({"name": "id", "uri": "fqdn"})).unwrap();
        let target = t.apply(&json!({"id": "100", "fqdn": "web1.example.com"}));
        assert_eq!(target.name(), Some(&json!("100")));
        assert_eq!(target.uri(), Some(&json!("web1.example.com")));
    }

    #[test]
    fn test_apply_nested_and_missing() {
        let t = template(json!({
            "uri": "net.0.ip",
            "facts": {"node": "node", "missing": "nothing.here", "second": "net.1.ip"},
            "features": ["puppet-agent"],
            "config": {"ssh": {"port": 22}}
        }))
        .unwrap();
        let data = json!({"node": "pve1", "net": [{"ip": "192.0.2.5"}, null]});
        let target = t.apply(&data);

        assert_eq!(target.uri(), Some(&json!("192.0.2.5")));
        let facts = target.facts().unwrap();
        assert_eq!(facts["node"], "pve1");
        assert_eq!(facts["missing"], Value::Null);
        assert_eq!(facts["second"], Value::Null);
        assert_eq!(target.get("features"), Some(&json!([null])));
        assert_eq!(target.get("config"), Some(&json!({"ssh": {"port": 22}})));
    }
}
