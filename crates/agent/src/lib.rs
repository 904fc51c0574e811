//! The PathCoach conversation loop.
//!
//! One invocation runs **rounds** against the completion service:
//!
//! 1. **Send** the transcript, the six coaching tools, and the output budget
//! 2. **Tool calls**: dispatch each in order, append the results, go again
//! 3. **Truncated and empty**: double the budget and resend
//! 4. **Text**: that is the reply
//!
//! A round that only listed the catalog and found no progress for the user
//! ends with a templated pathway list instead of another request. The loop
//! gives up after a fixed number of rounds.

pub mod fallback;
pub mod loop_runner;
pub mod progress_flow;
pub mod round;

pub use fallback::synthesize_reply;
pub use loop_runner::{
    ConversationLoop, ConversationRequest, FinalReply, LoopLimits, ReplySource, RoundState, Turn,
    TurnRole,
};
pub use progress_flow::{FlowStep, advance};
pub use round::{RoundBudget, RoundSummary};
