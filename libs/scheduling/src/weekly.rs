//! Weekly planning job.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info, instrument};

use crate::error::PortError;
use crate::ports::{AuditWriter, WeeklyPlanner, JOB_OUTCOME_SUCCESS};

pub struct WeeklyPlanningJob {
    planner: Arc<dyn WeeklyPlanner>,
    audit: Arc<dyn AuditWriter>,
}

impl WeeklyPlanningJob {
    pub fn new(planner: Arc<dyn WeeklyPlanner>, audit: Arc<dyn AuditWriter>) -> Self {
        Self { planner, audit }
    }

    /// Plans the week starting `week_start` and records one audit entry.
    ///
    /// A planner failure propagates and nothing is audited.
    #[instrument(skip(self), fields(%week_start, %correlation_id))]
    pub async fn run(&self, week_start: NaiveDate, correlation_id: &str) -> Result<u32, PortError> {
        let planned = match self.planner.plan_week(week_start, correlation_id).await {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Weekly planner failed");
                return Err(e);
            }
        };

        self.audit
            .append_job_log(correlation_id, JOB_OUTCOME_SUCCESS, planned)
            .await?;

        info!(planned, "Weekly planning complete");
        Ok(planned)
    }
}
