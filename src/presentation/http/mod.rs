use std::sync::Arc;

use poem::Route;
use poem_openapi::OpenApiService;

use crate::presentation::http::endpoints::{
    attempts::AttemptsEndpoints, campaigns::CampaignsEndpoints, clients::ClientsEndpoints,
    health::HealthEndpoints, messages::MessagesEndpoints, root::ApiState,
};

pub mod endpoints;
pub mod errors;
pub mod mappers;
pub mod requests;
pub mod responses;

/// Routes the API under `/api` and the swagger UI under `/`.
pub fn build_app(state: ApiState, server_url: &str) -> Route {
    let state = Arc::new(state);
    let api_service = OpenApiService::new(
        (
            HealthEndpoints::new(Arc::clone(&state)),
            ClientsEndpoints::new(Arc::clone(&state)),
            MessagesEndpoints::new(Arc::clone(&state)),
            CampaignsEndpoints::new(Arc::clone(&state)),
            AttemptsEndpoints::new(state),
        ),
        "Mailing API",
        env!("CARGO_PKG_VERSION"),
    )
    .server(format!("{server_url}/api"));
    let ui = api_service.swagger_ui();

    Route::new().nest("/api", api_service).nest("/", ui)
}
