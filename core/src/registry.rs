use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;

use crate::error::RegistryError;

// One entry of the tool catalog (matches the tools manifest format)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,

    // JSON Schema for the arguments object.
    // This is what the assistant reads to learn how to call the tool.
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Read-only catalog of the tools advertised to the assistant.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tools: Vec<ToolDefinition>,
}

impl Registry {
    pub fn new(tools: Vec<ToolDefinition>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for tool in &tools {
            if !seen.insert(tool.name.as_str()) {
                return Err(RegistryError::DuplicateTool(tool.name.clone()));
            }
        }
        Ok(Self { tools })
    }

    // Reads a JSON manifest and returns the catalog it describes
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let shown = path.display().to_string();

        let content = fs::read_to_string(path)
            .await
            .map_err(|source| RegistryError::Read {
                path: shown.clone(),
                source,
            })?;

        let tools: Vec<ToolDefinition> =
            serde_json::from_str(&content).map_err(|source| RegistryError::Parse {
                path: shown.clone(),
                source,
            })?;

        for tool in &tools {
            if !tool.parameters.is_object() {
                tracing::warn!(tool = %tool.name, path = %shown, "tool registered without an object schema");
            }
        }

        Self::new(tools)
    }

    pub fn list_tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Checks `arguments` against the tool's schema: it must be an object,
    /// `required` properties must be present, and present properties must
    /// match their declared `type` and `enum`. Extra properties pass.
    ///
    /// Returns `None` for tools this registry does not know.
    pub fn validate(&self, name: &str, arguments: &Value) -> Option<Result<(), String>> {
        self.get(name)
            .map(|tool| validate_against(&tool.parameters, arguments))
    }
}

fn validate_against(schema: &Value, arguments: &Value) -> Result<(), String> {
    let Some(args) = arguments.as_object() else {
        return Err("expected a JSON object".to_string());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(field) {
                return Err(format!("missing required field '{field}'"));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (field, value) in args {
        let Some(property) = properties.get(field) else {
            continue;
        };
        if let Some(expected) = property.get("type").and_then(Value::as_str) {
            if !matches_type(expected, value) {
                return Err(format!("field '{field}' must be of type {expected}"));
            }
        }
        if let Some(allowed) = property.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                return Err(format!("field '{field}' must be one of {}", Value::Array(allowed.clone())));
            }
        }
    }

    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}
