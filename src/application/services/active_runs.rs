use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

/// Campaigns that some operation currently owns: a dispatch run between its launch
/// and its completion, or a manual complete or delete.
///
/// Claims are exclusive per campaign and released when the [`RunClaim`] drops.
/// The registry is local to one process.
#[derive(Clone, Default)]
pub struct ActiveRuns {
    inner: Arc<Mutex<HashSet<Uuid>>>,
}

impl ActiveRuns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` while another claim on the campaign is alive.
    pub fn claim(&self, campaign_id: Uuid) -> Option<RunClaim> {
        let mut active = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        active.insert(campaign_id).then(|| RunClaim {
            campaign_id,
            registry: self.clone(),
        })
    }

    pub fn is_active(&self, campaign_id: Uuid) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&campaign_id)
    }
}

pub struct RunClaim {
    campaign_id: Uuid,
    registry: ActiveRuns,
}

impl Drop for RunClaim {
    fn drop(&mut self) {
        self.registry
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.campaign_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_is_exclusive_until_dropped() {
        let runs = ActiveRuns::new();
        let id = Uuid::new_v4();

        let claim = runs.claim(id).unwrap();
        assert!(runs.is_active(id));
        assert!(runs.claim(id).is_none());
        assert!(runs.claim(Uuid::new_v4()).is_some());

        drop(claim);
        assert!(!runs.is_active(id));
        assert!(runs.claim(id).is_some());
    }
}
