use std::sync::Arc;

use crate::domain::repositories::{
    AttemptRepository, CampaignRepository, ClientRepository, MessageRepository,
};

pub mod in_memory;
pub mod postgres;

/// One backend for every store the service uses.
#[derive(Clone)]
pub struct Stores {
    pub clients: Arc<dyn ClientRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub campaigns: Arc<dyn CampaignRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            clients: Arc::new(in_memory::InMemoryClientRepository::new()),
            messages: Arc::new(in_memory::InMemoryMessageRepository::new()),
            campaigns: Arc::new(in_memory::InMemoryCampaignRepository::new()),
            attempts: Arc::new(in_memory::InMemoryAttemptRepository::new()),
        }
    }

    pub fn postgres(pool: postgres::PgPool) -> Self {
        Self {
            clients: postgres::PostgresClientRepository::new(pool.clone()),
            messages: postgres::PostgresMessageRepository::new(pool.clone()),
            campaigns: postgres::PostgresCampaignRepository::new(pool.clone()),
            attempts: postgres::PostgresAttemptRepository::new(pool),
        }
    }
}
