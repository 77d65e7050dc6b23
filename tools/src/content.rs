use async_trait::async_trait;
use navigator_core::ToolOutcome;
use serde_json::{json, Value};

use crate::Tool;

pub struct FetchContentTool;

#[async_trait]
impl Tool for FetchContentTool {
    fn name(&self) -> &str {
        "fetchContent"
    }

    fn description(&self) -> &str {
        "Retrieve content based on various criteria"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filters": {
                    "type": "object",
                    "description": "Filters to apply to the content search"
                },
                "sortBy": {
                    "type": "string",
                    "description": "Field to sort the content by"
                },
                "order": {
                    "type": "string",
                    "enum": ["asc", "desc"],
                    "description": "Sort order"
                },
                "page": {
                    "type": "integer",
                    "description": "Page number for pagination"
                },
                "pageSize": {
                    "type": "integer",
                    "description": "Number of items per page"
                }
            },
            "required": ["filters"]
        })
    }

    async fn run(&self, arguments: Value) -> ToolOutcome {
        ToolOutcome::acknowledged(format!("fetch content using {arguments}"))
    }
}
