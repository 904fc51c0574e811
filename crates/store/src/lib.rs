//! Progress and chat history stores for PathCoach.
//!
//! Both backends implement `ProgressStore` and `ChatLog` from
//! `pathcoach-core`. The conversation loop only ever sees the traits.

pub mod file_backend;
pub mod in_memory;

pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;
