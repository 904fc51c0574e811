//! # PathCoach Core
//!
//! Domain types, traits, and error definitions for the PathCoach coaching
//! assistant. This crate has **no framework dependencies**: it defines the
//! model every other crate implements against.
//!
//! ## Layout
//!
//! - [`message`]: the transcript exchanged with the completion service
//! - [`provider`]: the completion-service abstraction
//! - [`tool`]: tool calls and the definitions advertised to the model
//! - [`pathway`]: the caller-supplied coaching catalog
//! - [`progress`]: progress records, chat log entries, and the stores behind them

pub mod error;
pub mod message;
pub mod pathway;
pub mod progress;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{FailureKind, OrchestrationError};
pub use message::{Message, MessageToolCall, Role};
pub use pathway::{Pathway, PathwayCatalog, PathwayStep};
pub use progress::{
    ChatEntry, ChatLog, ChatRole, NewChatEntry, Progress, ProgressStore, RecordId, StepResponse,
    UpsertProgress,
};
pub use provider::{CompletionRequest, CompletionResponse, FinishReason, Provider, Usage};
pub use tool::{ToolCall, ToolDefinition};
