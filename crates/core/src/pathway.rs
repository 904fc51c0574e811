//! The coaching pathway catalog supplied by the caller.
//!
//! The catalog arrives as JSON text with each conversation. The document
//! itself is handed back to the model untouched; the loop only needs a typed
//! view of it for listing entries and looking up steps. Text that is not a
//! JSON object degrades to an empty catalog instead of failing the call, and
//! entries the typed view cannot read are skipped.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

/// An ordered list of coaching pathways, together with the document it was
/// read from.
#[derive(Debug, Clone, PartialEq)]
pub struct PathwayCatalog {
    document: Value,
    pub pathways: Vec<Pathway>,
}

/// One coaching pathway: a stable id, a title, and its ordered steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pathway {
    pub pathway_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub steps: Vec<PathwayStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayStep {
    pub id: String,
    pub question: String,
}

impl Default for PathwayCatalog {
    fn default() -> Self {
        Self {
            document: json!({ "pathways": [] }),
            pathways: Vec::new(),
        }
    }
}

impl PathwayCatalog {
    /// Parse a catalog document, falling back to an empty catalog.
    pub fn parse_lenient(json: Option<&str>) -> Self {
        let Some(json) = json else {
            return Self::default();
        };
        match serde_json::from_str::<Value>(json) {
            Ok(document) if document.is_object() => Self::from_document(document),
            Ok(_) => {
                debug!("Pathway catalog is not a JSON object, using an empty one");
                Self::default()
            }
            Err(e) => {
                debug!(error = %e, "Pathway catalog did not parse, using an empty one");
                Self::default()
            }
        }
    }

    /// Build the typed view over an already parsed document.
    pub fn from_document(document: Value) -> Self {
        let pathways = document
            .get("pathways")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .enumerate()
                    .filter_map(|(index, entry)| {
                        match serde_json::from_value::<Pathway>(entry.clone()) {
                            Ok(pathway) => Some(pathway),
                            Err(e) => {
                                debug!(index, error = %e, "Skipping unreadable pathway entry");
                                None
                            }
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { document, pathways }
    }

    /// Look up a pathway by id.
    pub fn get(&self, pathway_id: &str) -> Option<&Pathway> {
        self.pathways.iter().find(|p| p.pathway_id == pathway_id)
    }

    pub fn is_empty(&self) -> bool {
        self.pathways.is_empty()
    }

    /// The document as the caller supplied it, echoed to the model.
    pub fn document(&self) -> &Value {
        &self.document
    }
}

impl Pathway {
    pub fn step(&self, step_id: &str) -> Option<&PathwayStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// The title, or the id when the catalog left it blank.
    pub fn label(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.pathway_id
        } else {
            &self.title
        }
    }
}
