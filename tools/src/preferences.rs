use async_trait::async_trait;
use navigator_core::ToolOutcome;
use serde_json::{json, Value};

use crate::Tool;

pub struct PreferencesTool;

#[async_trait]
impl Tool for PreferencesTool {
    fn name(&self) -> &str {
        "updateUserPreferences"
    }

    fn description(&self) -> &str {
        "Update user preferences including theme"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "theme": {
                    "type": "string",
                    "enum": ["dark", "light", "system"],
                    "description": "The theme preference"
                },
                "otherPreferences": {
                    "type": "object",
                    "description": "Other user preferences to update"
                }
            }
        })
    }

    // Preferences live in the browser; this only confirms what was asked for.
    async fn run(&self, arguments: Value) -> ToolOutcome {
        ToolOutcome::acknowledged(format!("Updated preferences: {arguments}"))
    }
}
