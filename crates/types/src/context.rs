//! Structured metadata attached to an [`OperationError`](crate::OperationError).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Diagnostic context carried by an operation error.
///
/// The well-known keys are typed fields; domain keys such as `projectId` live
/// in `extra` and serialize flattened beside them. Everything here is plain
/// JSON so the context can be rendered into a tool response verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    /// Tool that raised the error (e.g. `project_manager`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Tool action being performed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Offending parameter name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    /// Offending parameter value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Per-field validation messages.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub validation_errors: BTreeMap<String, String>,
    /// Identifiers of resources related to the failure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_resources: Vec<String>,
    /// Domain keys (`projectId`, `ticketId`, `originalError`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ErrorContext {
    /// Context naming the tool and action that failed.
    pub fn for_tool(tool: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            tool: Some(tool.into()),
            action: Some(action.into()),
            ..Default::default()
        }
    }

    /// Set the owning tool.
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Set the action.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Set the offending parameter and its value.
    pub fn with_parameter(mut self, parameter: impl Into<String>, value: impl Serialize) -> Self {
        self.parameter = Some(parameter.into());
        self.value = serde_json::to_value(value).ok();
        self
    }

    /// Record a per-field validation message.
    pub fn with_validation_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.validation_errors.insert(field.into(), message.into());
        self
    }

    /// Record a related resource identifier.
    pub fn with_related_resource(mut self, resource: impl Into<String>) -> Self {
        self.related_resources.push(resource.into());
        self
    }

    /// Attach a domain key.
    ///
    /// The value is converted with [`serde_json::to_value`]; values that fail
    /// to serialize are skipped.
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.extra.insert(key.into(), value);
        }
        self
    }

    /// Domain key lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Domain key lookup returning only string values.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Project id, accepting both `projectId` and `project_id` spellings.
    pub fn project_id(&self) -> Option<String> {
        ["projectId", "project_id"]
            .iter()
            .find_map(|key| self.extra.get(*key))
            .and_then(|value| match value {
                Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            })
    }

    /// Whether the tool name matches.
    pub fn is_tool(&self, tool: &str) -> bool {
        self.tool.as_deref() == Some(tool)
    }

    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        self.tool.is_none()
            && self.action.is_none()
            && self.parameter.is_none()
            && self.value.is_none()
            && self.validation_errors.is_empty()
            && self.related_resources.is_empty()
            && self.extra.is_empty()
    }

    /// Fill unset fields from `other`; keys already present here win.
    pub fn merge(mut self, other: ErrorContext) -> Self {
        self.tool = self.tool.or(other.tool);
        self.action = self.action.or(other.action);
        self.parameter = self.parameter.or(other.parameter);
        self.value = self.value.or(other.value);
        for (field, message) in other.validation_errors {
            self.validation_errors.entry(field).or_insert(message);
        }
        for resource in other.related_resources {
            if !self.related_resources.contains(&resource) {
                self.related_resources.push(resource);
            }
        }
        for (key, value) in other.extra {
            self.extra.entry(key).or_insert(value);
        }
        self
    }
}
