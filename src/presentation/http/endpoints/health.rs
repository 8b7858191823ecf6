use std::sync::Arc;

use poem_openapi::{
    OpenApi,
    payload::{Json, PlainText},
};

use crate::presentation::http::{
    endpoints::root::{ApiState, EndpointsTags},
    errors::map_error,
    responses::SummaryDto,
};

#[derive(Clone)]
pub struct HealthEndpoints {
    state: Arc<ApiState>,
}

impl HealthEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl HealthEndpoints {
    #[oai(path = "/health", method = "get", tag = EndpointsTags::Health)]
    pub async fn health(&self) -> PlainText<&'static str> {
        PlainText("OK")
    }

    /// Totals shown on the dashboard.
    #[oai(path = "/summary", method = "get", tag = EndpointsTags::Health)]
    pub async fn summary(&self) -> poem::Result<Json<SummaryDto>> {
        let summary = self
            .state
            .summary_usecase
            .execute()
            .await
            .map_err(map_error)?;

        Ok(Json(SummaryDto {
            campaigns_total: summary.campaigns_total,
            campaigns_launched: summary.campaigns_launched,
            clients_total: summary.clients_total,
        }))
    }
}
