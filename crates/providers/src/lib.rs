//! Completion service transport for PathCoach.
//!
//! The conversation loop talks to the model through the
//! `pathcoach_core::Provider` trait; [`OpenAiCompatProvider`] is the HTTP
//! implementation, with rate-limit backoff handled by [`RetryPolicy`].

pub mod openai_compat;
pub mod retry;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::RetryPolicy;
