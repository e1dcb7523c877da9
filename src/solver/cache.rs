use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::{
    config::ProviderConfig,
    dns::{huawei::HuaweiDns, RecordStore},
    error::SolverResult,
};

pub type StoreHandle = Arc<dyn RecordStore>;

/// Builds an authenticated record store from a provider config.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, config: &ProviderConfig) -> SolverResult<StoreHandle>;
}

/// Connects to the Huawei Cloud DNS API.
#[derive(Debug, Clone)]
pub struct HuaweiConnector {
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

#[async_trait]
impl StoreConnector for HuaweiConnector {
    async fn connect(&self, config: &ProviderConfig) -> SolverResult<StoreHandle> {
        let dns = HuaweiDns::new(config, self.endpoint.as_deref(), self.timeout)?;
        Ok(Arc::new(dns))
    }
}

type Slot = Arc<OnceCell<StoreHandle>>;

/// One record store per zone id, built on first use and then shared.
///
/// The map lock is only held to find or insert a zone's slot. Construction runs on the slot
/// itself, so callers for the same new zone wait on a single construction while other zones
/// proceed in parallel. A failed construction leaves the slot empty and the next caller tries
/// again.
pub struct ZoneClientCache {
    connector: Arc<dyn StoreConnector>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl ZoneClientCache {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        ZoneClientCache {
            connector,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_handle(&self, config: &ProviderConfig) -> SolverResult<StoreHandle> {
        let slot = {
            let mut slots = self.slots.lock();
            slots.entry(config.zone_id.clone()).or_default().clone()
        };

        if let Some(handle) = slot.get() {
            return Ok(handle.clone());
        }

        let handle = slot
            .get_or_try_init(|| async {
                debug!(zone_id = %config.zone_id, region = %config.region, "Connecting to DNS provider");
                let handle = self.connector.connect(config).await?;
                info!(zone_id = %config.zone_id, "DNS client ready");
                Ok::<_, crate::error::SolverError>(handle)
            })
            .await?;

        Ok(handle.clone())
    }

    /// Drop every cached handle.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }
}
