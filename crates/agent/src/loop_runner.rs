//! The conversation loop: rounds of completion, tool dispatch, and budget
//! escalation until a final reply or a failure.

use std::sync::Arc;

use pathcoach_config::AppConfig;
use pathcoach_core::error::OrchestrationError;
use pathcoach_core::message::{Message, MessageToolCall};
use pathcoach_core::pathway::PathwayCatalog;
use pathcoach_core::progress::{ChatLog, ProgressStore};
use pathcoach_core::provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};
use pathcoach_core::tool::{ToolCall, ToolDefinition};
use pathcoach_providers::OpenAiCompatProvider;
use pathcoach_tools::{ToolDispatcher, tool_definitions};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::fallback::synthesize_reply;
use crate::round::{RoundBudget, RoundSummary};

/// Roles a caller may put in the initial transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
    System,
}

/// One caller-supplied transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: content.into(),
        }
    }
}

impl From<Turn> for Message {
    fn from(turn: Turn) -> Self {
        match turn.role {
            TurnRole::User => Message::user(turn.content),
            TurnRole::Assistant => Message::assistant(turn.content),
            TurnRole::System => Message::system(turn.content),
        }
    }
}

/// Everything one invocation needs from the caller.
#[derive(Debug, Clone)]
pub struct ConversationRequest {
    pub user_id: String,
    pub transcript: Vec<Turn>,
    /// Raw catalog JSON; unparseable input means an empty catalog
    pub pathways_json: Option<String>,
}

/// Where the final text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Model,
    Fallback,
}

/// The outcome of a successful invocation.
#[derive(Debug, Clone)]
pub struct FinalReply {
    pub content: String,
    pub source: ReplySource,
    /// Completion requests sent, escalations included
    pub rounds: u32,
    /// The full transcript, ending with the reply
    pub transcript: Vec<Message>,
}

/// Round limits and token budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopLimits {
    pub max_rounds: u32,
    pub initial_max_tokens: u32,
    pub max_tokens_ceiling: u32,
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self {
            max_rounds: 4,
            initial_max_tokens: 768,
            max_tokens_ceiling: 2048,
        }
    }
}

impl LoopLimits {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_rounds: config.conversation.max_rounds.max(1),
            initial_max_tokens: config.conversation.initial_max_tokens,
            max_tokens_ceiling: config.conversation.max_tokens_ceiling,
        }
    }
}

/// Per-invocation state, owned by one `run` and passed by `&mut`.
#[derive(Debug)]
pub struct RoundState {
    pub transcript: Vec<Message>,
    pub budget: RoundBudget,
    pub rounds: u32,
}

#[derive(Debug)]
enum LoopState {
    Sending,
    AwaitingToolResults(Vec<MessageToolCall>),
    Escalating,
    Done(Terminal),
}

#[derive(Debug)]
enum Terminal {
    Final { content: String, source: ReplySource },
    Failure(OrchestrationError),
}

/// Drives one conversation to a final reply.
pub struct ConversationLoop {
    provider: Arc<dyn Provider>,
    dispatcher: ToolDispatcher,
    tools: Vec<ToolDefinition>,
    limits: LoopLimits,
}

impl ConversationLoop {
    pub fn new(provider: Arc<dyn Provider>, dispatcher: ToolDispatcher) -> Self {
        Self {
            provider,
            dispatcher,
            tools: tool_definitions(),
            limits: LoopLimits::default(),
        }
    }

    /// Build against the configured completion service. A missing API key
    /// fails here, before any round.
    pub fn from_config(
        config: &AppConfig,
        progress: Arc<dyn ProgressStore>,
        chat_log: Arc<dyn ChatLog>,
    ) -> Result<Self, OrchestrationError> {
        let provider = OpenAiCompatProvider::from_config(config)?;
        Ok(
            Self::new(Arc::new(provider), ToolDispatcher::new(progress, chat_log))
                .with_limits(LoopLimits::from_config(config)),
        )
    }

    pub fn with_limits(mut self, limits: LoopLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> LoopLimits {
        self.limits
    }

    /// Run one invocation. On failure nothing of the transcript is returned.
    pub async fn run(&self, request: ConversationRequest) -> Result<FinalReply, OrchestrationError> {
        let catalog = PathwayCatalog::parse_lenient(request.pathways_json.as_deref());
        let mut state = RoundState {
            transcript: request.transcript.into_iter().map(Message::from).collect(),
            budget: RoundBudget::new(
                self.limits.initial_max_tokens,
                self.limits.max_tokens_ceiling,
            ),
            rounds: 0,
        };

        info!(
            user = %request.user_id,
            provider = self.provider.name(),
            messages = state.transcript.len(),
            pathways = catalog.pathways.len(),
            "Starting conversation"
        );

        let mut step = LoopState::Sending;
        loop {
            step = match step {
                LoopState::Sending => self.send(&mut state).await,
                LoopState::AwaitingToolResults(calls) => {
                    self.run_tools(&mut state, calls, &request.user_id, &catalog)
                        .await
                }
                LoopState::Escalating => {
                    state.budget.escalate();
                    debug!(budget = state.budget.current(), "Raised output budget");
                    LoopState::Sending
                }
                LoopState::Done(Terminal::Final { content, source }) => {
                    info!(
                        user = %request.user_id,
                        rounds = state.rounds,
                        ?source,
                        "Conversation finished"
                    );
                    return Ok(FinalReply {
                        content,
                        source,
                        rounds: state.rounds,
                        transcript: state.transcript,
                    });
                }
                LoopState::Done(Terminal::Failure(err)) => {
                    warn!(
                        user = %request.user_id,
                        rounds = state.rounds,
                        kind = ?err.kind(),
                        error = %err,
                        "Conversation failed"
                    );
                    return Err(err);
                }
            };
        }
    }

    async fn send(&self, state: &mut RoundState) -> LoopState {
        if state.rounds >= self.limits.max_rounds {
            return LoopState::Done(Terminal::Failure(
                OrchestrationError::NoResponseAfterRounds {
                    rounds: state.rounds,
                },
            ));
        }
        state.rounds += 1;

        let request = CompletionRequest {
            messages: state.transcript.clone(),
            tools: self.tools.clone(),
            max_completion_tokens: state.budget.current(),
        };

        debug!(
            round = state.rounds,
            budget = state.budget.current(),
            messages = request.messages.len(),
            "Sending round"
        );

        match self.provider.complete(request).await {
            Ok(response) => interpret(state, response),
            Err(e) => LoopState::Done(Terminal::Failure(e.into())),
        }
    }

    async fn run_tools(
        &self,
        state: &mut RoundState,
        calls: Vec<MessageToolCall>,
        user_id: &str,
        catalog: &PathwayCatalog,
    ) -> LoopState {
        let mut observations = Vec::with_capacity(calls.len());
        for tc in &calls {
            let outcome = self.dispatcher.dispatch(&ToolCall::from(tc), catalog).await;
            state
                .transcript
                .push(Message::tool_result(&tc.id, &tc.name, outcome.content()));
            observations.push(outcome.observation);
        }

        let summary = RoundSummary::from_observations(&observations);
        debug!(
            round = state.rounds,
            calls = summary.calls,
            only_catalog_lookup = summary.only_catalog_lookup,
            all_progress_absent = summary.all_progress_absent,
            "Tool round complete"
        );

        if summary.should_synthesize() {
            info!(user = user_id, "No progress found, answering with the pathway list");
            let content = synthesize_reply(user_id, catalog);
            state.transcript.push(Message::assistant(content.clone()));
            return LoopState::Done(Terminal::Final {
                content,
                source: ReplySource::Fallback,
            });
        }

        LoopState::Sending
    }
}

/// Decide what a completion means for the loop.
fn interpret(state: &mut RoundState, response: CompletionResponse) -> LoopState {
    let CompletionResponse {
        message,
        finish_reason,
        ..
    } = response;

    debug!(
        round = state.rounds,
        finish = ?finish_reason,
        tool_calls = message.tool_calls.len(),
        content_len = message.text().len(),
        "Round response"
    );

    if finish_reason == FinishReason::ToolCalls && !message.tool_calls.is_empty() {
        let calls = message.tool_calls.clone();
        state
            .transcript
            .push(Message::assistant_tool_calls(message.content, message.tool_calls));
        return LoopState::AwaitingToolResults(calls);
    }

    let text = message.text();
    let blank = text.trim().is_empty();

    if finish_reason == FinishReason::Length && blank && !state.budget.at_ceiling() {
        return LoopState::Escalating;
    }

    if blank {
        return LoopState::Done(Terminal::Failure(OrchestrationError::EmptyCompletion));
    }

    let content = text.to_string();
    state.transcript.push(Message::assistant(content.clone()));
    LoopState::Done(Terminal::Final {
        content,
        source: ReplySource::Model,
    })
}
