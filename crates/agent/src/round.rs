//! Per-round bookkeeping: the token budget and the reducer over tool
//! observations that decides whether the model has stalled.

use pathcoach_tools::ToolObservation;

/// Output-token budget for one invocation. Only ever grows, never past the
/// ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundBudget {
    current: u32,
    ceiling: u32,
}

impl RoundBudget {
    pub fn new(initial: u32, ceiling: u32) -> Self {
        Self {
            current: initial.min(ceiling),
            ceiling,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn at_ceiling(&self) -> bool {
        self.current >= self.ceiling
    }

    /// Double the budget, capped at the ceiling. Returns `false` when the
    /// budget was already at the ceiling.
    pub fn escalate(&mut self) -> bool {
        if self.at_ceiling() {
            return false;
        }
        self.current = self.current.saturating_mul(2).min(self.ceiling);
        true
    }
}

/// What one tool round amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSummary {
    pub calls: usize,
    /// Every call was `list_pathways`
    pub only_catalog_lookup: bool,
    /// Every `get_progress` call came back empty (true when there were none)
    pub all_progress_absent: bool,
}

impl RoundSummary {
    /// Fold the round's observations, in dispatch order.
    pub fn from_observations(observations: &[ToolObservation]) -> Self {
        observations.iter().fold(
            Self {
                calls: 0,
                only_catalog_lookup: true,
                all_progress_absent: true,
            },
            |summary, observation| Self {
                calls: summary.calls + 1,
                only_catalog_lookup: summary.only_catalog_lookup
                    && *observation == ToolObservation::CatalogLookup,
                all_progress_absent: summary.all_progress_absent
                    && !matches!(observation, ToolObservation::ProgressLookup { found: true }),
            },
        )
    }

    /// The model only browsed the catalog and found nothing about the user.
    pub fn should_synthesize(&self) -> bool {
        self.calls > 0 && self.only_catalog_lookup && self.all_progress_absent
    }
}
