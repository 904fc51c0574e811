//! Tool dispatch against the progress store and chat log.
//!
//! Dispatch never fails the conversation: unknown tools, malformed arguments,
//! and store failures all come back as an `{"error": ...}` payload that is
//! handed to the model like any other tool result.

use std::sync::Arc;

use pathcoach_core::error::ToolError;
use pathcoach_core::pathway::PathwayCatalog;
use pathcoach_core::progress::{ChatLog, NewChatEntry, ProgressStore, UpsertProgress};
use pathcoach_core::tool::ToolCall;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::table::{CoachTool, ToolInvocation};

/// What a single dispatch touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolObservation {
    /// `list_pathways`: echoed the caller's catalog, no store access
    CatalogLookup,
    /// `get_progress`, and whether a record came back
    ProgressLookup { found: bool },
    /// Any other tool that reached the store or chat log
    StateAccess,
    /// Unknown tool, bad arguments, or a store failure
    Rejected,
}

/// The serialized result of one tool call plus what it observed.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub payload: Value,
    pub observation: ToolObservation,
}

impl DispatchOutcome {
    fn rejected(err: &ToolError) -> Self {
        Self {
            payload: json!({ "error": err.to_string() }),
            observation: ToolObservation::Rejected,
        }
    }

    /// The tool-result message content.
    pub fn content(&self) -> String {
        self.payload.to_string()
    }
}

/// Runs coaching tools against the external collaborators.
#[derive(Clone)]
pub struct ToolDispatcher {
    progress: Arc<dyn ProgressStore>,
    chat_log: Arc<dyn ChatLog>,
}

impl ToolDispatcher {
    pub fn new(progress: Arc<dyn ProgressStore>, chat_log: Arc<dyn ChatLog>) -> Self {
        Self { progress, chat_log }
    }

    /// Execute one tool call. `catalog` is the one supplied with the current
    /// conversation and is what `list_pathways` returns.
    pub async fn dispatch(&self, call: &ToolCall, catalog: &PathwayCatalog) -> DispatchOutcome {
        let Some(tool) = CoachTool::from_name(&call.name) else {
            warn!(tool = %call.name, "Model requested an unknown tool");
            return DispatchOutcome::rejected(&ToolError::UnknownTool(call.name.clone()));
        };

        let invocation = match tool.parse(&call.arguments) {
            Ok(invocation) => invocation,
            Err(e) => {
                warn!(tool = tool.name(), error = %e, "Rejected tool arguments");
                return DispatchOutcome::rejected(&e);
            }
        };

        debug!(tool = tool.name(), call_id = %call.id, "Dispatching tool call");

        let outcome = match self.run(invocation, catalog).await {
            Ok(outcome) => outcome,
            Err(source) => {
                let err = ToolError::Store {
                    tool_name: tool.name().to_string(),
                    source,
                };
                warn!(error = %err, "Tool call failed");
                DispatchOutcome::rejected(&err)
            }
        };

        debug!(
            tool = tool.name(),
            summary = %summarize(&outcome.payload),
            "Tool result"
        );
        outcome
    }

    async fn run(
        &self,
        invocation: ToolInvocation,
        catalog: &PathwayCatalog,
    ) -> Result<DispatchOutcome, pathcoach_core::error::StoreError> {
        let (payload, observation) = match invocation {
            ToolInvocation::ListPathways => {
                (catalog.document().clone(), ToolObservation::CatalogLookup)
            }
            ToolInvocation::GetProgress(args) => {
                let progress = self.progress.get(&args.user_id, &args.pathway_id).await?;
                let found = progress.is_some();
                (to_json(&progress), ToolObservation::ProgressLookup { found })
            }
            ToolInvocation::ListUserProgress(args) => {
                let records = self.progress.list_by_user(&args.user_id).await?;
                (to_json(&records), ToolObservation::StateAccess)
            }
            ToolInvocation::StartProgress(args) => {
                let id = self.progress.start(&args.user_id, &args.pathway_id).await?;
                (json!({ "id": id }), ToolObservation::StateAccess)
            }
            ToolInvocation::UpsertProgress(args) => {
                let id = self
                    .progress
                    .upsert_response(UpsertProgress {
                        user_id: args.user_id,
                        pathway_id: args.pathway_id,
                        step_id: args.step_id,
                        answer: args.answer,
                        next_step_index: args.next_step_index,
                        completed: args.completed,
                    })
                    .await?;
                (json!({ "id": id }), ToolObservation::StateAccess)
            }
            ToolInvocation::ChatAdd(args) => {
                let id = self
                    .chat_log
                    .append(NewChatEntry {
                        user_id: args.user_id,
                        role: args.role,
                        text: args.text,
                        pathway_id: args.pathway_id,
                    })
                    .await?;
                (json!({ "id": id }), ToolObservation::StateAccess)
            }
        };

        Ok(DispatchOutcome { payload, observation })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Short shape description for logs; payloads can hold user answers.
fn summarize(payload: &Value) -> String {
    match payload {
        Value::Null => "null".into(),
        Value::Array(items) => format!("array({})", items.len()),
        Value::Object(map) => format!("{:?}", map.keys().collect::<Vec<_>>()),
        other => other.to_string().chars().take(80).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathcoach_core::error::StoreError;
    use pathcoach_core::progress::{ChatEntry, ChatRole, Progress, RecordId};
    use pathcoach_store::InMemoryStore;

    fn dispatcher(store: &InMemoryStore) -> ToolDispatcher {
        ToolDispatcher::new(Arc::new(store.clone()), Arc::new(store.clone()))
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: format!("call_{name}"),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    fn catalog() -> PathwayCatalog {
        PathwayCatalog::parse_lenient(Some(
            r#"{"pathways":[{"pathwayId":"stress-checkin","title":"Chequeo de estrés","steps":[{"id":"s1","question":"¿Cómo estás?"}]}]}"#,
        ))
    }

    #[tokio::test]
    async fn list_pathways_echoes_catalog() {
        let store = InMemoryStore::new();
        let outcome = dispatcher(&store)
            .dispatch(&call("list_pathways", ""), &catalog())
            .await;

        assert_eq!(outcome.observation, ToolObservation::CatalogLookup);
        assert_eq!(outcome.payload, *catalog().document());
    }

    #[tokio::test]
    async fn list_pathways_keeps_unknown_fields_and_untitled_entries() {
        let text = r#"{"pathways":[
            {"pathwayId":"sleep","title":"Mejor sueño","description":"Dormir mejor",
             "steps":[{"id":"h","question":"¿Horas?","options":["5","6","7"]}]},
            {"pathwayId":"draft","steps":[]}
        ]}"#;
        let store = InMemoryStore::new();
        let outcome = dispatcher(&store)
            .dispatch(&call("list_pathways", "{}"), &PathwayCatalog::parse_lenient(Some(text)))
            .await;

        let expected: Value = serde_json::from_str(text).unwrap();
        assert_eq!(outcome.payload, expected);
        assert_eq!(outcome.payload["pathways"][0]["steps"][0]["options"][2], "7");
        assert_eq!(outcome.payload["pathways"][1]["pathwayId"], "draft");
    }

    #[tokio::test]
    async fn list_pathways_on_garbage_is_empty_list() {
        let store = InMemoryStore::new();
        let outcome = dispatcher(&store)
            .dispatch(&call("list_pathways", ""), &PathwayCatalog::parse_lenient(Some("{oops")))
            .await;
        assert_eq!(outcome.payload, json!({ "pathways": [] }));
    }

    #[tokio::test]
    async fn get_progress_reports_absence_then_presence() {
        let store = InMemoryStore::new();
        let tools = dispatcher(&store);
        let get = call("get_progress", r#"{"userId":"ana","pathwayId":"stress-checkin"}"#);

        let absent = tools.dispatch(&get, &catalog()).await;
        assert_eq!(absent.observation, ToolObservation::ProgressLookup { found: false });
        assert_eq!(absent.content(), "null");

        store.start("ana", "stress-checkin").await.unwrap();

        let present = tools.dispatch(&get, &catalog()).await;
        assert_eq!(present.observation, ToolObservation::ProgressLookup { found: true });
        assert_eq!(present.payload["pathwayId"], "stress-checkin");
        assert_eq!(present.payload["currentStepIndex"], 0);
    }

    #[tokio::test]
    async fn start_then_upsert_share_identity() {
        let store = InMemoryStore::new();
        let tools = dispatcher(&store);

        let started = tools
            .dispatch(
                &call("start_progress", r#"{"userId":"ana","pathwayId":"stress-checkin"}"#),
                &catalog(),
            )
            .await;
        let upserted = tools
            .dispatch(
                &call(
                    "upsert_progress",
                    r#"{"userId":"ana","pathwayId":"stress-checkin","stepId":"s1","answer":"tranquila","completed":true}"#,
                ),
                &catalog(),
            )
            .await;

        assert_eq!(started.observation, ToolObservation::StateAccess);
        assert_eq!(started.payload["id"], upserted.payload["id"]);

        let progress = store.get("ana", "stress-checkin").await.unwrap().unwrap();
        assert!(progress.completed);
        assert_eq!(progress.responses[0].answer, "tranquila");
    }

    #[tokio::test]
    async fn list_user_progress_and_chat_add() {
        let store = InMemoryStore::new();
        let tools = dispatcher(&store);
        store.start("ana", "stress-checkin").await.unwrap();

        let listed = tools
            .dispatch(&call("list_user_progress", r#"{"userId":"ana"}"#), &catalog())
            .await;
        assert_eq!(listed.payload.as_array().unwrap().len(), 1);

        let added = tools
            .dispatch(
                &call("chat_add", r#"{"userId":"ana","role":"user","text":"hola","pathwayId":null}"#),
                &catalog(),
            )
            .await;
        assert_eq!(added.observation, ToolObservation::StateAccess);
        assert!(added.payload["id"].is_string());

        let history = ChatLog::list_by_user(&store, "ana", None).await.unwrap();
        assert_eq!(history[0].role, ChatRole::User);
    }

    #[tokio::test]
    async fn unknown_tool_becomes_error_payload() {
        let store = InMemoryStore::new();
        let outcome = dispatcher(&store)
            .dispatch(&call("book_flight", "{}"), &catalog())
            .await;

        assert_eq!(outcome.observation, ToolObservation::Rejected);
        assert_eq!(outcome.payload, json!({ "error": "Unknown tool book_flight" }));
    }

    #[tokio::test]
    async fn malformed_arguments_become_error_payload() {
        let store = InMemoryStore::new();
        let outcome = dispatcher(&store)
            .dispatch(&call("start_progress", r#"{"userId":42}"#), &catalog())
            .await;

        assert_eq!(outcome.observation, ToolObservation::Rejected);
        let message = outcome.payload["error"].as_str().unwrap();
        assert!(message.starts_with("Invalid arguments for start_progress"));
        assert!(ProgressStore::list_by_user(&store, "42").await.unwrap().is_empty());
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl ProgressStore for BrokenStore {
        async fn get(&self, _: &str, _: &str) -> Result<Option<Progress>, StoreError> {
            Err(StoreError::Storage("disk on fire".into()))
        }
        async fn list_by_user(&self, _: &str) -> Result<Vec<Progress>, StoreError> {
            Err(StoreError::Storage("disk on fire".into()))
        }
        async fn start(&self, _: &str, _: &str) -> Result<RecordId, StoreError> {
            Err(StoreError::Storage("disk on fire".into()))
        }
        async fn upsert_response(&self, _: UpsertProgress) -> Result<RecordId, StoreError> {
            Err(StoreError::Storage("disk on fire".into()))
        }
    }

    #[async_trait::async_trait]
    impl ChatLog for BrokenStore {
        async fn append(&self, _: NewChatEntry) -> Result<RecordId, StoreError> {
            Err(StoreError::Storage("disk on fire".into()))
        }
        async fn list_by_user(&self, _: &str, _: Option<usize>) -> Result<Vec<ChatEntry>, StoreError> {
            Err(StoreError::Storage("disk on fire".into()))
        }
    }

    #[tokio::test]
    async fn store_failure_is_reported_to_the_model() {
        let tools = ToolDispatcher::new(Arc::new(BrokenStore), Arc::new(BrokenStore));
        let outcome = tools
            .dispatch(
                &call("get_progress", r#"{"userId":"ana","pathwayId":"sleep"}"#),
                &catalog(),
            )
            .await;

        assert_eq!(outcome.observation, ToolObservation::Rejected);
        let message = outcome.payload["error"].as_str().unwrap();
        assert!(message.contains("get_progress failed"));
        assert!(message.contains("disk on fire"));
    }

    #[test]
    fn summarize_shapes() {
        assert_eq!(summarize(&Value::Null), "null");
        assert_eq!(summarize(&json!([1, 2, 3])), "array(3)");
        assert_eq!(summarize(&json!({"id": "x"})), r#"["id"]"#);
    }
}
