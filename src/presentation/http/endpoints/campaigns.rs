use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{
    OpenApi,
    param::{Path, Query},
    payload::{Json, PlainText},
};
use uuid::Uuid;

use crate::{
    application::{
        handlers::dispatch_engine::DispatchError,
        usecases::{launch_campaign::LaunchOutcome, manage_campaigns::CreateCampaignRequest},
    },
    domain::repositories::Pagination,
    presentation::{
        http::{
            endpoints::{
                attempts::to_paginated_dto,
                root::{ApiState, EndpointsTags},
            },
            errors::map_error,
            mappers::map_campaign,
            requests::{
                CreateCampaignRequestDto, SetDisabledRequestDto, SetMessageRequestDto,
                SetRecipientsRequestDto,
            },
            responses::{CampaignDto, LaunchCampaignResponse, LaunchResultDto, PaginatedAttemptsDto},
        },
        models::LaunchOutcomeKind,
    },
};

#[derive(Clone)]
pub struct CampaignsEndpoints {
    state: Arc<ApiState>,
}

impl CampaignsEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl CampaignsEndpoints {
    #[oai(path = "/campaigns", method = "post", tag = EndpointsTags::Campaigns)]
    pub async fn create_campaign(
        &self,
        request: Json<CreateCampaignRequestDto>,
    ) -> PoemResult<Json<CampaignDto>> {
        let request = request.0;
        let campaign = self
            .state
            .campaigns_usecase
            .create(CreateCampaignRequest {
                message_id: request.message_id,
                recipient_ids: request.recipient_ids,
                disabled: request.disabled,
                owner_id: request.owner_id,
            })
            .await
            .map_err(map_error)?;

        Ok(Json(map_campaign(&campaign)))
    }

    #[oai(path = "/campaigns", method = "get", tag = EndpointsTags::Campaigns)]
    pub async fn list_campaigns(&self) -> PoemResult<Json<Vec<CampaignDto>>> {
        let campaigns = self
            .state
            .campaigns_usecase
            .list()
            .await
            .map_err(map_error)?;

        Ok(Json(campaigns.iter().map(map_campaign).collect()))
    }

    #[oai(path = "/campaigns/:id", method = "get", tag = EndpointsTags::Campaigns)]
    pub async fn get_campaign(&self, id: Path<Uuid>) -> PoemResult<Json<CampaignDto>> {
        let campaign = self
            .state
            .campaigns_usecase
            .get(id.0)
            .await
            .map_err(map_error)?;

        Ok(Json(map_campaign(&campaign)))
    }

    #[oai(path = "/campaigns/:id", method = "delete", tag = EndpointsTags::Campaigns)]
    pub async fn delete_campaign(&self, id: Path<Uuid>) -> PoemResult<()> {
        self.state
            .campaigns_usecase
            .delete(id.0)
            .await
            .map_err(map_error)
    }

    /// Only a campaign that has not been launched accepts a new recipient list.
    #[oai(
        path = "/campaigns/:id/recipients",
        method = "put",
        tag = EndpointsTags::Campaigns,
    )]
    pub async fn set_recipients(
        &self,
        id: Path<Uuid>,
        request: Json<SetRecipientsRequestDto>,
    ) -> PoemResult<Json<CampaignDto>> {
        let campaign = self
            .state
            .campaigns_usecase
            .set_recipients(id.0, request.0.recipient_ids)
            .await
            .map_err(map_error)?;

        Ok(Json(map_campaign(&campaign)))
    }

    #[oai(
        path = "/campaigns/:id/message",
        method = "put",
        tag = EndpointsTags::Campaigns,
    )]
    pub async fn set_message(
        &self,
        id: Path<Uuid>,
        request: Json<SetMessageRequestDto>,
    ) -> PoemResult<Json<CampaignDto>> {
        let campaign = self
            .state
            .campaigns_usecase
            .set_message(id.0, request.message_id)
            .await
            .map_err(map_error)?;

        Ok(Json(map_campaign(&campaign)))
    }

    #[oai(
        path = "/campaigns/:id/disabled",
        method = "put",
        tag = EndpointsTags::Campaigns,
    )]
    pub async fn set_disabled(
        &self,
        id: Path<Uuid>,
        request: Json<SetDisabledRequestDto>,
    ) -> PoemResult<Json<CampaignDto>> {
        let campaign = self
            .state
            .campaigns_usecase
            .set_disabled(id.0, request.disabled)
            .await
            .map_err(map_error)?;

        Ok(Json(map_campaign(&campaign)))
    }

    /// Starts sending the campaign. Returns as soon as the launch is accepted;
    /// per-recipient results appear in the attempt log.
    #[oai(
        path = "/campaigns/:id/launch",
        method = "post",
        tag = EndpointsTags::Campaigns,
    )]
    pub async fn launch_campaign(&self, id: Path<Uuid>) -> PoemResult<LaunchCampaignResponse> {
        let campaign_id = id.0;
        match self.state.launch_campaign_usecase.execute(campaign_id).await {
            Ok(LaunchOutcome::Launched { run_id, recipients }) => {
                let outcome = LaunchOutcomeKind::Launched;
                Ok(LaunchCampaignResponse::Launched(Json(LaunchResultDto {
                    campaign_id,
                    outcome,
                    message: outcome.label().to_string(),
                    run_id: Some(run_id),
                    recipients: Some(recipients as u32),
                })))
            }
            Ok(LaunchOutcome::Rejected(rejection)) => Ok(rejected(campaign_id, rejection.into())),
            Err(DispatchError::State(rejection)) => Ok(rejected(campaign_id, rejection.into())),
            Err(
                err @ (DispatchError::CampaignNotFound(_)
                | DispatchError::MessageNotFound(_)
                | DispatchError::RecipientNotFound { .. }),
            ) => Ok(LaunchCampaignResponse::NotFound(PlainText(err.to_string()))),
            Err(err @ DispatchError::TransportUnavailable(_)) => {
                tracing::error!(%campaign_id, error = %err, "launch aborted");
                Ok(LaunchCampaignResponse::TransportUnavailable(PlainText(
                    err.to_string(),
                )))
            }
            Err(DispatchError::Persistence(err)) => Err(map_error(err)),
        }
    }

    /// Closes a launched campaign whose run stopped before reaching every recipient.
    #[oai(
        path = "/campaigns/:id/complete",
        method = "post",
        tag = EndpointsTags::Campaigns,
    )]
    pub async fn complete_campaign(&self, id: Path<Uuid>) -> PoemResult<Json<CampaignDto>> {
        let campaign = self
            .state
            .complete_campaign_usecase
            .execute(id.0)
            .await
            .map_err(map_error)?;

        Ok(Json(map_campaign(&campaign)))
    }

    #[oai(
        path = "/campaigns/:id/attempts",
        method = "get",
        tag = EndpointsTags::Campaigns,
    )]
    pub async fn list_campaign_attempts(
        &self,
        id: Path<Uuid>,
        limit: Query<Option<u32>>,
        offset: Query<Option<u32>>,
    ) -> PoemResult<Json<PaginatedAttemptsDto>> {
        let page = self
            .state
            .list_attempts_usecase
            .execute(
                Some(id.0),
                Pagination {
                    limit: limit.0,
                    offset: offset.0,
                },
            )
            .await
            .map_err(map_error)?;

        Ok(Json(to_paginated_dto(&page)))
    }
}

fn rejected(campaign_id: Uuid, outcome: LaunchOutcomeKind) -> LaunchCampaignResponse {
    LaunchCampaignResponse::Rejected(Json(LaunchResultDto {
        campaign_id,
        outcome,
        message: outcome.label().to_string(),
        run_id: None,
        recipients: None,
    }))
}
