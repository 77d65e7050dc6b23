//! Tools the navigator assistant can call, and the dispatcher that runs them.

mod content;
mod navigate;
mod preferences;
mod taxonomy;

pub use content::FetchContentTool;
pub use navigate::NavigateTool;
pub use preferences::PreferencesTool;
pub use taxonomy::TaxonomyTool;

use async_trait::async_trait;
use navigator_core::{Registry, RegistryError, ToolDefinition, ToolExecutor, ToolOutcome};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub const UNKNOWN_TOOL: &str = "Unknown tool";

/// A tool the assistant can call
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;

    /// Execute with arguments already checked against `parameters`
    async fn run(&self, arguments: Value) -> ToolOutcome;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }
}

/// The built-in tools, in the order they are advertised
pub fn builtin_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(FetchContentTool),
        Arc::new(NavigateTool),
        Arc::new(PreferencesTool),
        Arc::new(TaxonomyTool),
    ]
}

/// Routes tool calls by name to their implementation.
///
/// Arguments are validated against the registry before a tool runs. Unknown
/// names and invalid arguments come back as failure payloads, so one bad
/// call never takes down the rest of a batch.
pub struct Dispatcher {
    tools: Vec<Arc<dyn Tool>>,
    registry: Registry,
}

impl Dispatcher {
    /// Built-in tools advertised with their own definitions
    pub fn builtin() -> Result<Self, RegistryError> {
        let tools = builtin_tools();
        let registry = Registry::new(tools.iter().map(|t| t.definition()).collect())?;
        Ok(Self { tools, registry })
    }

    /// Built-in tools advertised through an external registry, e.g. a
    /// manifest loaded from disk. Tools missing from the registry are not
    /// callable.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            tools: builtin_tools(),
            registry,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    async fn dispatch(&self, name: &str, arguments: Value) -> ToolOutcome {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            return ToolOutcome::failure(UNKNOWN_TOOL);
        };

        match self.registry.validate(name, &arguments) {
            None => ToolOutcome::failure(UNKNOWN_TOOL),
            Some(Err(reason)) => ToolOutcome::failure(format!("Invalid arguments: {reason}")),
            Some(Ok(())) => tool.run(arguments).await,
        }
    }
}

#[async_trait]
impl ToolExecutor for Dispatcher {
    async fn execute(&self, name: &str, arguments: Value) -> ToolOutcome {
        info!(tool = name, args = %arguments, "Executing tool");
        let outcome = self.dispatch(name, arguments).await;
        info!(
            tool = name,
            success = outcome.is_success(),
            response = %outcome.render(),
            "Tool response"
        );
        outcome
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.list_tools().to_vec()
    }
}
