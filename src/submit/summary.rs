// src/submit/summary.rs
// Folds per-item outcomes into one BatchSummary. Pure counting, so running it
// again over the same list always gives the same answer.

use crate::model::{BatchItemOutcome, BatchSummary, ItemStatus};

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[BatchItemOutcome]) -> Self {
        outcomes.iter().fold(
            BatchSummary {
                total: outcomes.len(),
                ..BatchSummary::default()
            },
            |mut summary, outcome| {
                match outcome.status {
                    ItemStatus::Success { .. } => summary.success_count += 1,
                    ItemStatus::Failed { .. } => summary.fail_count += 1,
                    ItemStatus::Skipped { .. } => {}
                }
                summary
            },
        )
    }

    pub fn skipped_count(&self) -> usize {
        self.total - self.success_count - self.fail_count
    }
}
