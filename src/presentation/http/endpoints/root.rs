use std::sync::Arc;

use poem_openapi::Tags;

use crate::{
    application::{
        handlers::dispatch_engine::{DispatchConfig, DispatchEngine},
        services::{attempt_log::AttemptLog, transport::MailTransport},
        usecases::{
            complete_campaign::CompleteCampaignUseCase, launch_campaign::LaunchCampaignUseCase,
            list_attempts::ListAttemptsUseCase, manage_campaigns::CampaignsUseCase,
            manage_clients::ClientsUseCase, manage_messages::MessagesUseCase,
            summary::SummaryUseCase,
        },
    },
    infrastructure::repositories::Stores,
};

#[derive(Clone)]
pub struct ApiState {
    pub clients_usecase: Arc<ClientsUseCase>,
    pub messages_usecase: Arc<MessagesUseCase>,
    pub campaigns_usecase: Arc<CampaignsUseCase>,
    pub launch_campaign_usecase: Arc<LaunchCampaignUseCase>,
    pub complete_campaign_usecase: Arc<CompleteCampaignUseCase>,
    pub list_attempts_usecase: Arc<ListAttemptsUseCase>,
    pub summary_usecase: Arc<SummaryUseCase>,
}

impl ApiState {
    pub fn new(
        stores: Stores,
        transport: Arc<dyn MailTransport>,
        dispatch: DispatchConfig,
    ) -> Self {
        let attempt_log = AttemptLog::new(Arc::clone(&stores.attempts));
        let engine = DispatchEngine::new(
            Arc::clone(&stores.campaigns),
            Arc::clone(&stores.clients),
            Arc::clone(&stores.messages),
            attempt_log.clone(),
            transport,
            dispatch,
        );
        let active_runs = engine.active_runs().clone();

        Self {
            clients_usecase: Arc::new(ClientsUseCase::new(
                Arc::clone(&stores.clients),
                Arc::clone(&stores.campaigns),
            )),
            messages_usecase: Arc::new(MessagesUseCase::new(Arc::clone(&stores.messages))),
            campaigns_usecase: Arc::new(CampaignsUseCase::new(
                Arc::clone(&stores.campaigns),
                Arc::clone(&stores.clients),
                Arc::clone(&stores.messages),
                active_runs.clone(),
            )),
            launch_campaign_usecase: Arc::new(LaunchCampaignUseCase::new(engine)),
            complete_campaign_usecase: Arc::new(CompleteCampaignUseCase::new(
                Arc::clone(&stores.campaigns),
                active_runs,
            )),
            list_attempts_usecase: Arc::new(ListAttemptsUseCase::new(
                attempt_log,
                Arc::clone(&stores.campaigns),
            )),
            summary_usecase: Arc::new(SummaryUseCase::new(stores.campaigns, stores.clients)),
        }
    }
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Clients,
    Messages,
    Campaigns,
    Attempts,
}
