//! Progress records, chat log entries, and the collaborator traits that
//! store them.
//!
//! The conversation loop never owns persistence. Tools reach user state only
//! through [`ProgressStore`] and [`ChatLog`]; implementations live in
//! `pathcoach-store`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Opaque identity of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's position in one pathway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub id: RecordId,
    pub user_id: String,
    pub pathway_id: String,
    pub current_step_index: u32,
    pub completed: bool,
    #[serde(default)]
    pub responses: Vec<StepResponse>,
}

/// An answer recorded against a pathway step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResponse {
    pub step_id: String,
    pub answer: String,
}

/// Arguments of an append-response upsert.
///
/// `next_step_index` and `completed` overwrite the stored values only when
/// present.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertProgress {
    pub user_id: String,
    pub pathway_id: String,
    pub step_id: String,
    pub answer: String,
    pub next_step_index: Option<u32>,
    pub completed: Option<bool>,
}

/// Who wrote a chat log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Bot,
}

/// A chat log entry to append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChatEntry {
    pub user_id: String,
    pub role: ChatRole,
    pub text: String,
    pub pathway_id: Option<String>,
}

/// A stored chat log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub id: RecordId,
    pub user_id: String,
    pub role: ChatRole,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pathway_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Progress {
    /// A fresh record: first step, not completed, no responses.
    pub fn fresh(id: RecordId, user_id: &str, pathway_id: &str) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            pathway_id: pathway_id.to_string(),
            current_step_index: 0,
            completed: false,
            responses: Vec::new(),
        }
    }

    /// Apply an upsert to an existing record.
    pub fn apply(&mut self, upsert: &UpsertProgress) {
        self.responses.push(StepResponse {
            step_id: upsert.step_id.clone(),
            answer: upsert.answer.clone(),
        });
        if let Some(index) = upsert.next_step_index {
            self.current_step_index = index;
        }
        if let Some(completed) = upsert.completed {
            self.completed = completed;
        }
    }

    /// A new record seeded from an upsert.
    pub fn seeded(id: RecordId, upsert: &UpsertProgress) -> Self {
        Self {
            id,
            user_id: upsert.user_id.clone(),
            pathway_id: upsert.pathway_id.clone(),
            current_step_index: upsert.next_step_index.unwrap_or(0),
            completed: upsert.completed.unwrap_or(false),
            responses: vec![StepResponse {
                step_id: upsert.step_id.clone(),
                answer: upsert.answer.clone(),
            }],
        }
    }
}

/// Storage for per-user pathway progress.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// The progress for one (user, pathway) pair, if any.
    async fn get(&self, user_id: &str, pathway_id: &str)
    -> Result<Option<Progress>, StoreError>;

    /// Every progress record of a user.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Progress>, StoreError>;

    /// Create a fresh record unless one exists. Returns the record's id either way.
    async fn start(&self, user_id: &str, pathway_id: &str) -> Result<RecordId, StoreError>;

    /// Append an answer, creating the record if needed.
    async fn upsert_response(&self, upsert: UpsertProgress) -> Result<RecordId, StoreError>;
}

/// Append-only chat history.
#[async_trait]
pub trait ChatLog: Send + Sync {
    async fn append(&self, entry: NewChatEntry) -> Result<RecordId, StoreError>;

    /// Entries of a user in creation order; with a limit, only the most recent ones.
    async fn list_by_user(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ChatEntry>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert(next: Option<u32>, completed: Option<bool>) -> UpsertProgress {
        UpsertProgress {
            user_id: "ana".into(),
            pathway_id: "stress-checkin".into(),
            step_id: "s1".into(),
            answer: "bien".into(),
            next_step_index: next,
            completed,
        }
    }

    #[test]
    fn apply_keeps_unspecified_fields() {
        let mut progress = Progress::fresh(RecordId("p1".into()), "ana", "stress-checkin");
        progress.current_step_index = 2;

        progress.apply(&upsert(None, None));
        assert_eq!(progress.current_step_index, 2);
        assert!(!progress.completed);
        assert_eq!(progress.responses.len(), 1);

        progress.apply(&upsert(Some(3), Some(true)));
        assert_eq!(progress.current_step_index, 3);
        assert!(progress.completed);
        assert_eq!(progress.responses.len(), 2);
    }

    #[test]
    fn seeded_record_defaults() {
        let progress = Progress::seeded(RecordId("p1".into()), &upsert(None, None));
        assert_eq!(progress.current_step_index, 0);
        assert!(!progress.completed);
        assert_eq!(progress.responses[0].answer, "bien");
    }

    #[test]
    fn progress_serializes_camel_case() {
        let progress = Progress::fresh(RecordId("p1".into()), "ana", "sleep");
        let value = serde_json::to_value(&progress).unwrap();
        assert_eq!(value["id"], "p1");
        assert_eq!(value["pathwayId"], "sleep");
        assert_eq!(value["currentStepIndex"], 0);
    }
}
