//! Batch re-matching of the reassignment queue.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::dispatch::{AutoDispatcher, DispatchDecision};
use crate::error::PortError;
use crate::ports::MissionRepository;

/// Drains the "needs reassignment" queue through the dispatcher.
pub struct ReassignmentHandler {
    repository: Arc<dyn MissionRepository>,
    dispatcher: AutoDispatcher,
}

impl ReassignmentHandler {
    pub fn new(repository: Arc<dyn MissionRepository>, dispatcher: AutoDispatcher) -> Self {
        Self {
            repository,
            dispatcher,
        }
    }

    /// One pass: read the queue and roster, dispatch once, commit each
    /// decision. Missions without a candidate stay queued.
    ///
    /// A failed commit stops the pass; decisions committed before it stand.
    #[instrument(skip(self), name = "reassignment_pass")]
    pub async fn run_once(&self) -> Result<Vec<DispatchDecision>, PortError> {
        let missions = self.repository.list_reassign_queue().await?;
        let pilots = self.repository.list_available_pilots().await?;

        let decisions = self.dispatcher.dispatch(&missions, &pilots);

        for decision in &decisions {
            if let Err(e) = self
                .repository
                .mark_reassigned(decision.mission_id, decision.pilot_id)
                .await
            {
                warn!(
                    mission_id = %decision.mission_id,
                    pilot_id = %decision.pilot_id,
                    error = %e,
                    "Failed to commit reassignment"
                );
                return Err(e);
            }
        }

        info!(
            queued = missions.len(),
            reassigned = decisions.len(),
            "Reassignment pass complete"
        );

        Ok(decisions)
    }
}
