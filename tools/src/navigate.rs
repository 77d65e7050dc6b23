use async_trait::async_trait;
use navigator_core::ToolOutcome;
use serde_json::{json, Value};

use crate::Tool;

pub struct NavigateTool;

#[async_trait]
impl Tool for NavigateTool {
    fn name(&self) -> &str {
        "navigateTo"
    }

    fn description(&self) -> &str {
        "Navigate to a specific route in the web app"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "route": {
                    "type": "string",
                    "description": "The route to navigate to"
                }
            },
            "required": ["route"]
        })
    }

    async fn run(&self, arguments: Value) -> ToolOutcome {
        match arguments.get("route").and_then(Value::as_str) {
            Some(route) => ToolOutcome::success(format!("Navigated to {route}")),
            None => ToolOutcome::failure("Invalid arguments: missing required field 'route'"),
        }
    }
}
