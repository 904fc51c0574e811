//! The coaching tools the model may call mid-conversation.
//!
//! The tool set is closed: [`CoachTool`] enumerates every tool, owns its
//! schema, and parses raw arguments into a typed [`ToolInvocation`].
//! [`ToolDispatcher`] runs an invocation against the progress store and chat
//! log and reports what it observed so the conversation loop can detect a
//! stalled round.

pub mod table;
pub mod dispatcher;

pub use table::{CoachTool, ToolInvocation, tool_definitions};
pub use dispatcher::{DispatchOutcome, ToolDispatcher, ToolObservation};
