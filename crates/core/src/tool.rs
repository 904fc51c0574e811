//! Tool call and tool definition types.
//!
//! The tool set itself is a closed table in `pathcoach-tools`; this module only
//! holds the shapes shared with the provider.

use serde::{Deserialize, Serialize};

use crate::message::MessageToolCall;

/// A request to execute a tool, as issued by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Raw JSON arguments, parsed against the named tool's schema at dispatch
    pub arguments: String,
}

impl From<&MessageToolCall> for ToolCall {
    fn from(tc: &MessageToolCall) -> Self {
        Self {
            id: tc.id.clone(),
            name: tc.name.clone(),
            arguments: tc.arguments.clone(),
        }
    }
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}
