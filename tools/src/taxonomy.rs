use async_trait::async_trait;
use navigator_core::ToolOutcome;
use serde_json::{json, Value};

use crate::Tool;

pub struct TaxonomyTool;

#[async_trait]
impl Tool for TaxonomyTool {
    fn name(&self) -> &str {
        "manageCategoriesAndTags"
    }

    fn description(&self) -> &str {
        "Manage categories and tags for content"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["createCategory", "listCategories", "addTags"],
                    "description": "Action to perform"
                },
                "categoryName": {
                    "type": "string",
                    "description": "Name of the category to create"
                },
                "contentId": {
                    "type": "string",
                    "description": "ID of the content to tag"
                },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Tags to add to the content"
                }
            },
            "required": ["action"]
        })
    }

    async fn run(&self, arguments: Value) -> ToolOutcome {
        let field = |name: &str| arguments.get(name).and_then(Value::as_str);

        match field("action") {
            Some("createCategory") => match field("categoryName") {
                Some(category) => ToolOutcome::acknowledged(format!("Created category {category}")),
                None => ToolOutcome::failure("createCategory requires 'categoryName'"),
            },
            Some("listCategories") => ToolOutcome::acknowledged("Listed categories"),
            Some("addTags") => {
                let tags: Vec<&str> = arguments
                    .get("tags")
                    .and_then(Value::as_array)
                    .map(|tags| tags.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                match field("contentId") {
                    Some(content_id) if !tags.is_empty() => ToolOutcome::acknowledged(format!(
                        "Added tags {} to content {content_id}",
                        tags.join(", ")
                    )),
                    _ => ToolOutcome::failure("addTags requires 'contentId' and 'tags'"),
                }
            }
            _ => ToolOutcome::failure("Unknown action"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn actions_are_acknowledged() {
        let created = TaxonomyTool
            .run(json!({ "action": "createCategory", "categoryName": "Recipes" }))
            .await;
        assert_eq!(
            created,
            ToolOutcome::Success(json!({ "success": true, "message": "Created category Recipes" }))
        );

        let tagged = TaxonomyTool
            .run(json!({ "action": "addTags", "contentId": "42", "tags": ["rust", "web"] }))
            .await;
        assert_eq!(
            tagged,
            ToolOutcome::Success(json!({ "success": true, "message": "Added tags rust, web to content 42" }))
        );

        assert!(TaxonomyTool.run(json!({ "action": "listCategories" })).await.is_success());
    }

    #[tokio::test]
    async fn incomplete_actions_fail() {
        assert!(!TaxonomyTool.run(json!({ "action": "createCategory" })).await.is_success());
        assert!(!TaxonomyTool
            .run(json!({ "action": "addTags", "contentId": "42" }))
            .await
            .is_success());
    }
}
