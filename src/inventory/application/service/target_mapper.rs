use serde_json::{Map, Value};
use tracing::debug;

use crate::core::domain::model::{
    normalized_record::NormalizedRecord,
    target::{TargetDescriptor, Template},
};

/// Projects normalized records through the caller's target template.
#[derive(Debug, Clone)]
pub struct TargetMapper {
    template: Template,
    attributes: Vec<String>,
}

impl TargetMapper {
    pub fn new(template: Template) -> Self {
        let attributes = template.required_attributes();
        Self {
            template,
            attributes,
        }
    }

    /// Top-level record attributes the template reads.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Maps every record, keeping their order.
    pub fn execute(&self, records: &[NormalizedRecord]) -> Vec<TargetDescriptor> {
        debug!(records = records.len(), attributes = ?self.attributes, "mapping targets");
        records
            .iter()
            .map(|record| self.template.apply(&self.extract(record)))
            .collect()
    }

    /// Picks the attributes the template reads; absent ones become `null`.
    fn extract(&self, record: &NormalizedRecord) -> Value {
        let mut data = match record.to_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let extracted = self
            .attributes
            .iter()
            .map(|attr| (attr.clone(), data.remove(attr).unwrap_or(Value::Null)))
            .collect();
        Value::Object(extracted)
    }
}
