use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::domain::{error::ProxmoxError, model::target::TargetDescriptor};

/// Successful task result: `{"value": [target, ...]}`.
#[derive(Debug, Serialize)]
pub struct TaskOutput {
    pub value: Vec<TargetDescriptor>,
}

/// Failed task result in the plugin error envelope.
#[derive(Debug, Serialize)]
pub struct TaskError {
    #[serde(rename = "_error")]
    pub error: TaskErrorBody,
}

#[derive(Debug, Serialize)]
pub struct TaskErrorBody {
    pub kind: String,
    pub msg: String,
    pub details: Map<String, Value>,
}

impl From<&ProxmoxError> for TaskError {
    fn from(error: &ProxmoxError) -> Self {
        let mut details = Map::new();
        if let ProxmoxError::Api { status, path, .. } = error {
            details.insert("status".to_string(), Value::from(*status));
            details.insert("path".to_string(), Value::from(path.as_str()));
        }
        Self {
            error: TaskErrorBody {
                kind: error.kind().to_string(),
                msg: error.message(),
                details,
            },
        }
    }
}
