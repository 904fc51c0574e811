//! Deterministic step-by-step flow through a pathway, without the model.
//!
//! Each call records one answer against the user's current step and reports
//! the next question.

use pathcoach_core::error::StoreError;
use pathcoach_core::pathway::PathwayCatalog;
use pathcoach_core::progress::{ProgressStore, UpsertProgress};
use serde::Serialize;
use tracing::debug;

/// Pathway started for users with nothing in progress.
pub const INTRO_PATHWAY: &str = "intro-get-to-know";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStep {
    /// The question to ask next, empty when there is none
    pub next_question: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pathway_id: Option<String>,
}

impl FlowStep {
    fn idle() -> Self {
        Self {
            next_question: String::new(),
            completed: false,
            pathway_id: None,
        }
    }
}

/// Record `answer` against the user's active pathway and move on.
///
/// The active pathway is the first incomplete progress record. When there is
/// none, the intro pathway (or else the first catalog entry) is started.
pub async fn advance(
    store: &dyn ProgressStore,
    user_id: &str,
    catalog: &PathwayCatalog,
    answer: &str,
) -> Result<FlowStep, StoreError> {
    let records = store.list_by_user(user_id).await?;
    let (pathway_id, step_index) = match records.into_iter().find(|p| !p.completed) {
        Some(active) => (active.pathway_id, active.current_step_index),
        None => {
            let Some(start) = catalog.get(INTRO_PATHWAY).or_else(|| catalog.pathways.first())
            else {
                debug!(user = user_id, "No pathways to start");
                return Ok(FlowStep::idle());
            };
            store.start(user_id, &start.pathway_id).await?;
            (start.pathway_id.clone(), 0)
        }
    };

    let Some(pathway) = catalog.get(&pathway_id) else {
        debug!(user = user_id, pathway = %pathway_id, "Active pathway is not in the catalog");
        return Ok(FlowStep::idle());
    };

    if pathway.steps.is_empty() {
        return Ok(FlowStep {
            next_question: String::new(),
            completed: true,
            pathway_id: Some(pathway_id),
        });
    }

    let last = pathway.steps.len() - 1;
    let index = (step_index as usize).min(last);
    let next = index + 1;
    let completed = next > last;

    store
        .upsert_response(UpsertProgress {
            user_id: user_id.to_string(),
            pathway_id: pathway_id.clone(),
            step_id: pathway.steps[index].id.clone(),
            answer: answer.to_string(),
            next_step_index: Some(if completed { index as u32 } else { next as u32 }),
            completed: Some(completed),
        })
        .await?;

    debug!(user = user_id, pathway = %pathway_id, step = index, completed, "Advanced progress");

    let next_question = if completed {
        String::new()
    } else {
        pathway.steps[next].question.clone()
    };

    Ok(FlowStep {
        next_question,
        completed,
        pathway_id: Some(pathway_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathcoach_store::InMemoryStore;

    fn catalog() -> PathwayCatalog {
        PathwayCatalog::parse_lenient(Some(
            r#"{"pathways":[
                {"pathwayId":"intro-get-to-know","title":"Conozcámonos","steps":[
                    {"id":"name","question":"¿Cómo te llamas?"},
                    {"id":"goal","question":"¿Qué quieres lograr?"}
                ]},
                {"pathwayId":"stress-checkin","title":"Chequeo de estrés","steps":[
                    {"id":"s1","question":"¿Cómo te sientes hoy?"}
                ]},
                {"pathwayId":"empty","title":"Vacía","steps":[]}
            ]}"#,
        ))
    }

    #[tokio::test]
    async fn starts_intro_and_walks_to_completion() {
        let store = InMemoryStore::new();

        let first = advance(&store, "ana", &catalog(), "Ana").await.unwrap();
        assert_eq!(first.pathway_id.as_deref(), Some(INTRO_PATHWAY));
        assert_eq!(first.next_question, "¿Qué quieres lograr?");
        assert!(!first.completed);

        let second = advance(&store, "ana", &catalog(), "Dormir mejor").await.unwrap();
        assert!(second.completed);
        assert!(second.next_question.is_empty());

        let progress = store.get("ana", INTRO_PATHWAY).await.unwrap().unwrap();
        assert!(progress.completed);
        assert_eq!(progress.current_step_index, 1);
        let steps: Vec<&str> = progress.responses.iter().map(|r| r.step_id.as_str()).collect();
        assert_eq!(steps, vec!["name", "goal"]);
    }

    #[tokio::test]
    async fn continues_first_incomplete_pathway() {
        let store = InMemoryStore::new();
        store.start("ana", "stress-checkin").await.unwrap();

        let step = advance(&store, "ana", &catalog(), "cansada").await.unwrap();
        assert_eq!(step.pathway_id.as_deref(), Some("stress-checkin"));
        assert!(step.completed);
        assert!(store.get("ana", INTRO_PATHWAY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn out_of_range_index_is_clamped() {
        let store = InMemoryStore::new();
        store
            .upsert_response(UpsertProgress {
                user_id: "ana".into(),
                pathway_id: "stress-checkin".into(),
                step_id: "s1".into(),
                answer: "bien".into(),
                next_step_index: Some(9),
                completed: Some(false),
            })
            .await
            .unwrap();

        let step = advance(&store, "ana", &catalog(), "otra vez").await.unwrap();
        assert!(step.completed);

        let progress = store.get("ana", "stress-checkin").await.unwrap().unwrap();
        assert_eq!(progress.responses.last().unwrap().step_id, "s1");
        assert_eq!(progress.current_step_index, 0);
    }

    #[tokio::test]
    async fn falls_back_to_first_pathway_without_intro() {
        let store = InMemoryStore::new();
        let catalog = PathwayCatalog::parse_lenient(Some(
            r#"{"pathways":[{"pathwayId":"sleep","title":"Mejor sueño","steps":[
                {"id":"h","question":"¿Cuántas horas duermes?"},
                {"id":"q","question":"¿Te despiertas de noche?"}
            ]}]}"#,
        ));

        let step = advance(&store, "luis", &catalog, "seis").await.unwrap();
        assert_eq!(step.pathway_id.as_deref(), Some("sleep"));
        assert_eq!(step.next_question, "¿Te despiertas de noche?");
    }

    #[tokio::test]
    async fn empty_catalog_is_idle() {
        let store = InMemoryStore::new();
        let step = advance(&store, "ana", &PathwayCatalog::default(), "hola").await.unwrap();
        assert_eq!(step, FlowStep::idle());
        assert!(store.list_by_user("ana").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_active_pathway_is_idle() {
        let store = InMemoryStore::new();
        store.start("ana", "retired-pathway").await.unwrap();

        let step = advance(&store, "ana", &catalog(), "hola").await.unwrap();
        assert_eq!(step, FlowStep::idle());
    }

    #[tokio::test]
    async fn pathway_without_steps_is_completed() {
        let store = InMemoryStore::new();
        store.start("ana", "empty").await.unwrap();

        let step = advance(&store, "ana", &catalog(), "hola").await.unwrap();
        assert!(step.completed);
        assert_eq!(step.pathway_id.as_deref(), Some("empty"));
    }
}
