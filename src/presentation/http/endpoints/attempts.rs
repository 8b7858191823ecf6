use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{
    OpenApi,
    param::{Path, Query},
    payload::Json,
};
use uuid::Uuid;

use crate::{
    application::usecases::list_attempts::PaginatedAttempts,
    domain::repositories::Pagination,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        errors::map_error,
        mappers::map_attempt,
        responses::{DeliveryAttemptDto, PaginatedAttemptsDto},
    },
};

#[derive(Clone)]
pub struct AttemptsEndpoints {
    state: Arc<ApiState>,
}

impl AttemptsEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl AttemptsEndpoints {
    /// Newest attempts first, optionally narrowed to one campaign.
    #[oai(path = "/attempts", method = "get", tag = EndpointsTags::Attempts)]
    pub async fn list_attempts(
        &self,
        campaign_id: Query<Option<Uuid>>,
        limit: Query<Option<u32>>,
        offset: Query<Option<u32>>,
    ) -> PoemResult<Json<PaginatedAttemptsDto>> {
        let page = self
            .state
            .list_attempts_usecase
            .execute(
                campaign_id.0,
                Pagination {
                    limit: limit.0,
                    offset: offset.0,
                },
            )
            .await
            .map_err(map_error)?;

        Ok(Json(to_paginated_dto(&page)))
    }

    #[oai(path = "/attempts/:id", method = "get", tag = EndpointsTags::Attempts)]
    pub async fn get_attempt(&self, id: Path<Uuid>) -> PoemResult<Json<DeliveryAttemptDto>> {
        let attempt = self
            .state
            .list_attempts_usecase
            .get(id.0)
            .await
            .map_err(map_error)?;

        Ok(Json(map_attempt(&attempt)))
    }
}

pub(crate) fn to_paginated_dto(page: &PaginatedAttempts) -> PaginatedAttemptsDto {
    PaginatedAttemptsDto {
        attempts: page.attempts.iter().map(map_attempt).collect(),
        has_more: page.has_more,
        next_offset: page.next_offset,
    }
}
