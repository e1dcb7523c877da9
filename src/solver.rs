pub mod cache;
pub mod reconcile;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use self::{
    cache::{HuaweiConnector, StoreConnector, StoreHandle, ZoneClientCache},
    reconcile::{ChallengeRecord, Outcome},
};
use crate::{
    challenge::{ChallengeAction, ChallengeRequest},
    config::ProviderConfig,
    dns::derive_record_name,
    error::{SolverError, SolverResult},
    settings::Settings,
};

pub const SOLVER_NAME: &str = "huawei-dns";

/// The interface a challenge host drives.
#[async_trait]
pub trait Solver: Send + Sync {
    /// Identifier the host uses to route challenges to this solver.
    fn name(&self) -> &'static str;

    /// One-time setup. `stop` flips to `true` when the host is shutting down.
    async fn initialize(&self, settings: &Settings, stop: watch::Receiver<bool>)
        -> SolverResult<()>;

    async fn present(&self, request: &ChallengeRequest) -> SolverResult<()>;

    async fn cleanup(&self, request: &ChallengeRequest) -> SolverResult<()>;

    async fn handle(&self, request: &ChallengeRequest) -> SolverResult<()> {
        match request.action {
            ChallengeAction::Present => self.present(request).await,
            ChallengeAction::CleanUp => self.cleanup(request).await,
        }
    }
}

/// DNS-01 solver backed by Huawei Cloud DNS.
pub struct HuaweiSolver {
    connector: Option<Arc<dyn StoreConnector>>,
    cache: RwLock<Option<Arc<ZoneClientCache>>>,
}

impl HuaweiSolver {
    pub fn new() -> Self {
        HuaweiSolver {
            connector: None,
            cache: RwLock::new(None),
        }
    }

    /// Use `connector` instead of connecting to the Huawei API.
    pub fn with_connector(connector: Arc<dyn StoreConnector>) -> Self {
        HuaweiSolver {
            connector: Some(connector),
            cache: RwLock::new(None),
        }
    }

    fn cache(&self) -> SolverResult<Arc<ZoneClientCache>> {
        self.cache.read().clone().ok_or(SolverError::NotInitialized)
    }

    async fn prepare(
        &self,
        request: &ChallengeRequest,
    ) -> SolverResult<(StoreHandle, ChallengeRecord)> {
        let cache = self.cache()?;
        let config = ProviderConfig::load(request.config.as_ref())?;
        debug!(?config, "Parsed config");

        let store = cache.get_handle(&config).await.map_err(|e| {
            warn!(error = %e, "Failed to get DNS client");
            e
        })?;

        let record = ChallengeRecord {
            name: derive_record_name(&request.resolved_fqdn, &request.resolved_zone),
            zone_id: config.zone_id,
            key: request.key.clone(),
        };
        Ok((store, record))
    }
}

impl Default for HuaweiSolver {
    fn default() -> Self {
        Self::new()
    }
}

fn finish(action: &str, result: SolverResult<Outcome>) -> SolverResult<()> {
    match result {
        Ok(outcome) => {
            debug!(?outcome, "{action} finished");
            Ok(())
        }
        Err(e) if e.is_provider() => {
            warn!(error = %e, "{action} failed at the DNS provider");
            Err(e)
        }
        Err(e) => {
            error!(error = %e, "{action} failed");
            Err(e)
        }
    }
}

#[async_trait]
impl Solver for HuaweiSolver {
    fn name(&self) -> &'static str {
        SOLVER_NAME
    }

    async fn initialize(
        &self,
        settings: &Settings,
        mut stop: watch::Receiver<bool>,
    ) -> SolverResult<()> {
        let cache = {
            let mut slot = self.cache.write();
            if slot.is_some() {
                warn!("Solver already initialized");
                return Ok(());
            }

            let connector: Arc<dyn StoreConnector> = match self.connector.clone() {
                Some(connector) => connector,
                None => Arc::new(HuaweiConnector {
                    endpoint: settings.api_endpoint.clone(),
                    timeout: settings.request_timeout(),
                }),
            };
            let cache = Arc::new(ZoneClientCache::new(connector));
            *slot = Some(cache.clone());
            cache
        };

        tokio::spawn(async move {
            while !*stop.borrow() {
                if stop.changed().await.is_err() {
                    break;
                }
            }
            debug!("Stop signal received, dropping DNS clients");
            cache.clear();
        });

        info!(solver = self.name(), group_name = %settings.group_name, "Solver initialized");
        Ok(())
    }

    #[instrument(skip_all, fields(uid = %request.uid, fqdn = %request.resolved_fqdn, zone = %request.resolved_zone))]
    async fn present(&self, request: &ChallengeRequest) -> SolverResult<()> {
        info!(key = %request.key, "Adding TXT record");
        let (store, record) = self.prepare(request).await?;
        finish("present", reconcile::present(store.as_ref(), &record).await)
    }

    #[instrument(skip_all, fields(uid = %request.uid, fqdn = %request.resolved_fqdn, zone = %request.resolved_zone))]
    async fn cleanup(&self, request: &ChallengeRequest) -> SolverResult<()> {
        info!(key = %request.key, "Removing TXT record");
        let (store, record) = self.prepare(request).await?;
        finish("cleanup", reconcile::cleanup(store.as_ref(), &record).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::memory::{Call, MemoryStore};
    use std::time::Duration;

    /// Hands out one shared store for every zone.
    struct SharedStore(Arc<MemoryStore>);

    #[async_trait]
    impl StoreConnector for SharedStore {
        async fn connect(&self, config: &ProviderConfig) -> SolverResult<StoreHandle> {
            if config.region.is_empty() {
                return Err(SolverError::Config("Invalid region name ''".to_string()));
            }
            Ok(self.0.clone())
        }
    }

    fn settings() -> Settings {
        Settings {
            group_name: "acme.example.com".to_string(),
            ..Default::default()
        }
    }

    fn request(action: ChallengeAction, key: &str) -> ChallengeRequest {
        ChallengeRequest::new(
            action,
            "_acme-challenge.example.com.",
            "example.com.",
            key,
            Some(serde_json::json!({
                "region": "cn-north-4",
                "zoneId": "zone-1",
                "appKey": "ak",
                "appSecret": "sk",
            })),
        )
    }

    async fn solver() -> (HuaweiSolver, Arc<MemoryStore>, watch::Sender<bool>) {
        let store = Arc::new(MemoryStore::new());
        let solver = HuaweiSolver::with_connector(Arc::new(SharedStore(store.clone())));
        let (tx, rx) = watch::channel(false);
        solver.initialize(&settings(), rx).await.unwrap();
        (solver, store, tx)
    }

    #[tokio::test]
    async fn name_is_stable() {
        assert_eq!(HuaweiSolver::new().name(), "huawei-dns");
    }

    #[tokio::test]
    async fn requires_initialize() {
        let solver = HuaweiSolver::new();
        let err = solver
            .present(&request(ChallengeAction::Present, "k"))
            .await
            .unwrap_err();
        assert!(matches!(err, SolverError::NotInitialized));
    }

    #[tokio::test]
    async fn present_and_cleanup_round_trip() {
        let (solver, store, _stop) = solver().await;

        solver.present(&request(ChallengeAction::Present, "k")).await.unwrap();
        let set = store.get("zone-1", "_acme-challenge").unwrap();
        assert_eq!(set.values, vec!["\"k\""]);

        solver.present(&request(ChallengeAction::Present, "k")).await.unwrap();
        assert_eq!(store.calls().len(), 1);

        solver.cleanup(&request(ChallengeAction::CleanUp, "k")).await.unwrap();
        assert_eq!(store.record_count(), 0);

        solver.cleanup(&request(ChallengeAction::CleanUp, "k")).await.unwrap();
        assert_eq!(store.calls().len(), 2);
        assert!(matches!(store.calls()[1], Call::Delete { .. }));
    }

    #[tokio::test]
    async fn handle_dispatches_on_action() {
        let (solver, store, _stop) = solver().await;

        solver.handle(&request(ChallengeAction::Present, "k")).await.unwrap();
        assert_eq!(store.record_count(), 1);

        solver.handle(&request(ChallengeAction::CleanUp, "k")).await.unwrap();
        assert_eq!(store.record_count(), 0);
    }

    #[tokio::test]
    async fn config_errors_surface() {
        let (solver, store, _stop) = solver().await;

        let mut bad = request(ChallengeAction::Present, "k");
        bad.config = Some(serde_json::json!({"zoneId": 12}));
        let err = solver.present(&bad).await.unwrap_err();
        assert!(matches!(err, SolverError::Config(_)));

        bad.config = None;
        let err = solver.present(&bad).await.unwrap_err();
        assert!(matches!(err, SolverError::Config(_)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn initialize_twice_keeps_cache() {
        let (solver, _store, _stop) = solver().await;
        solver.present(&request(ChallengeAction::Present, "k")).await.unwrap();
        let before = solver.cache().unwrap();

        let (_tx, rx) = watch::channel(false);
        solver.initialize(&settings(), rx).await.unwrap();
        assert!(Arc::ptr_eq(&before, &solver.cache().unwrap()));
        assert_eq!(before.len(), 1);
    }

    #[tokio::test]
    async fn stop_signal_drops_clients() {
        let (solver, _store, stop) = solver().await;
        solver.present(&request(ChallengeAction::Present, "k")).await.unwrap();
        let cache = solver.cache().unwrap();
        assert_eq!(cache.len(), 1);

        stop.send(true).unwrap();
        for _ in 0..50 {
            if cache.len() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(cache.len(), 0);
    }
}
