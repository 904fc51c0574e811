//! The closed table of coaching tools.
//!
//! Every tool is a [`CoachTool`] variant with a wire name, a description, a
//! JSON schema, and a typed argument struct. The model sees the same six
//! definitions on every round.

use pathcoach_core::error::ToolError;
use pathcoach_core::progress::ChatRole;
use pathcoach_core::tool::ToolDefinition;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoachTool {
    ListPathways,
    GetProgress,
    ListUserProgress,
    StartProgress,
    UpsertProgress,
    ChatAdd,
}

/// A tool call whose arguments decoded against the tool's schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    ListPathways,
    GetProgress(PathwayArgs),
    ListUserProgress(UserArgs),
    StartProgress(PathwayArgs),
    UpsertProgress(UpsertArgs),
    ChatAdd(ChatAddArgs),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserArgs {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwayArgs {
    pub user_id: String,
    pub pathway_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertArgs {
    pub user_id: String,
    pub pathway_id: String,
    pub step_id: String,
    pub answer: String,
    #[serde(default)]
    pub next_step_index: Option<u32>,
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAddArgs {
    pub user_id: String,
    pub role: ChatRole,
    pub text: String,
    #[serde(default)]
    pub pathway_id: Option<String>,
}

impl CoachTool {
    pub const ALL: [CoachTool; 6] = [
        CoachTool::ListPathways,
        CoachTool::GetProgress,
        CoachTool::ListUserProgress,
        CoachTool::StartProgress,
        CoachTool::UpsertProgress,
        CoachTool::ChatAdd,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CoachTool::ListPathways => "list_pathways",
            CoachTool::GetProgress => "get_progress",
            CoachTool::ListUserProgress => "list_user_progress",
            CoachTool::StartProgress => "start_progress",
            CoachTool::UpsertProgress => "upsert_progress",
            CoachTool::ChatAdd => "chat_add",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            CoachTool::ListPathways => "Lista rutas de coaching disponibles (provistas por el cliente)",
            CoachTool::GetProgress => "Obtiene progreso de usuario para una ruta",
            CoachTool::ListUserProgress => "Lista todas las rutas con progreso de un usuario",
            CoachTool::StartProgress => "Crea progreso inicial para una ruta (si no existe)",
            CoachTool::UpsertProgress => "Guarda respuesta del usuario y avanza pasos",
            CoachTool::ChatAdd => "Agrega mensaje a historial del chat",
        }
    }

    pub fn parameters_schema(&self) -> serde_json::Value {
        let user_and_pathway = json!({
            "type": "object",
            "properties": {
                "userId": { "type": "string" },
                "pathwayId": { "type": "string" }
            },
            "required": ["userId", "pathwayId"],
            "additionalProperties": false
        });

        match self {
            CoachTool::ListPathways => json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
            CoachTool::GetProgress | CoachTool::StartProgress => user_and_pathway,
            CoachTool::ListUserProgress => json!({
                "type": "object",
                "properties": { "userId": { "type": "string" } },
                "required": ["userId"],
                "additionalProperties": false
            }),
            CoachTool::UpsertProgress => json!({
                "type": "object",
                "properties": {
                    "userId": { "type": "string" },
                    "pathwayId": { "type": "string" },
                    "stepId": { "type": "string" },
                    "answer": { "type": "string" },
                    "nextStepIndex": { "type": ["integer", "null"] },
                    "completed": { "type": ["boolean", "null"] }
                },
                "required": ["userId", "pathwayId", "stepId", "answer"],
                "additionalProperties": false
            }),
            CoachTool::ChatAdd => json!({
                "type": "object",
                "properties": {
                    "userId": { "type": "string" },
                    "role": { "type": "string", "enum": ["user", "bot"] },
                    "text": { "type": "string" },
                    "pathwayId": { "type": ["string", "null"] }
                },
                "required": ["userId", "role", "text"],
                "additionalProperties": false
            }),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }

    /// Decode raw JSON arguments. An empty string counts as `{}`.
    pub fn parse(&self, raw_arguments: &str) -> Result<ToolInvocation, ToolError> {
        let raw = if raw_arguments.trim().is_empty() {
            "{}"
        } else {
            raw_arguments
        };

        Ok(match self {
            CoachTool::ListPathways => {
                // No parameters, but the payload still has to be JSON.
                self.decode::<serde_json::Value>(raw)?;
                ToolInvocation::ListPathways
            }
            CoachTool::GetProgress => ToolInvocation::GetProgress(self.decode(raw)?),
            CoachTool::ListUserProgress => ToolInvocation::ListUserProgress(self.decode(raw)?),
            CoachTool::StartProgress => ToolInvocation::StartProgress(self.decode(raw)?),
            CoachTool::UpsertProgress => ToolInvocation::UpsertProgress(self.decode(raw)?),
            CoachTool::ChatAdd => ToolInvocation::ChatAdd(self.decode(raw)?),
        })
    }

    fn decode<T: DeserializeOwned>(&self, raw: &str) -> Result<T, ToolError> {
        serde_json::from_str(raw).map_err(|e| ToolError::MalformedArguments {
            tool_name: self.name().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Definitions of every tool, in table order.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    CoachTool::ALL.iter().map(CoachTool::definition).collect()
}
