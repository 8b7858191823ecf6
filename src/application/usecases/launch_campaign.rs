use uuid::Uuid;

use crate::{
    application::handlers::dispatch_engine::{DispatchEngine, DispatchError, DispatchReport},
    domain::errors::StateError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Launched { run_id: Uuid, recipients: usize },
    Rejected(StateError),
}

pub struct LaunchCampaignUseCase {
    engine: DispatchEngine,
}

impl LaunchCampaignUseCase {
    pub fn new(engine: DispatchEngine) -> Self {
        Self { engine }
    }

    /// Starts the run in the background once the launch has been accepted, so the
    /// caller only learns whether it was accepted. Recipient outcomes go to the
    /// attempt log.
    pub async fn execute(&self, campaign_id: Uuid) -> Result<LaunchOutcome, DispatchError> {
        let run = match self.engine.prepare(campaign_id).await {
            Ok(run) => run,
            Err(DispatchError::State(rejection)) => {
                tracing::warn!(%campaign_id, %rejection, "launch rejected");
                return Ok(LaunchOutcome::Rejected(rejection));
            }
            Err(err) => return Err(err),
        };

        let outcome = LaunchOutcome::Launched {
            run_id: run.run_id(),
            recipients: run.recipient_count(),
        };
        tokio::spawn(async move {
            let report = run.execute().await;
            if report.degraded() {
                tracing::error!(
                    campaign_id = %report.campaign_id,
                    run_id = %report.run_id,
                    unrecorded = report.unrecorded,
                    "dispatch run finished with unrecorded attempts"
                );
            }
        });
        Ok(outcome)
    }

    pub async fn run_to_completion(
        &self,
        campaign_id: Uuid,
    ) -> Result<DispatchReport, DispatchError> {
        self.engine.run(campaign_id).await
    }
}
