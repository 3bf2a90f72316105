// AdsFlow - Application state

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;

use crate::ads::client::GoogleAdsRestFactory;
use crate::ads::AdsClientFactory;
use crate::config::Config;
use crate::workflow::{DryRunRegistry, InMemoryStore, PendingStore, VaguenessDetector};

/// How often expired confirmation tokens are purged.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Central application state. Clone-friendly: every field is an Arc or Copy.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Pending dry runs awaiting confirmation (process-wide, in memory).
    pub registry: Arc<DryRunRegistry>,
    pub vagueness: VaguenessDetector,
    /// Builds a per-call Ads client from the caller's credentials.
    pub ads: Arc<dyn AdsClientFactory>,
    pub start_time: Instant,
    /// `true` once startup completes.
    pub ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Relaxed);
        tracing::info!("Backend marked as READY");
    }
}

impl AppState {
    /// Production state: Google Ads REST facade, in-memory token store.
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        let factory = Arc::new(GoogleAdsRestFactory::new(client, &config));
        Ok(Self::with_parts(config, factory, Arc::new(InMemoryStore::new())))
    }

    /// Assemble state from explicit collaborators (tests inject mocks here).
    pub fn with_parts(config: Config, ads: Arc<dyn AdsClientFactory>, store: Arc<dyn PendingStore>) -> Self {
        tracing::info!(
            api_version = %config.api_version,
            confirmation_ttl_secs = config.confirmation_ttl.as_secs(),
            "AppState initialised"
        );

        Self {
            registry: Arc::new(DryRunRegistry::new(store, config.confirmation_ttl)),
            config: Arc::new(config),
            vagueness: VaguenessDetector::new(),
            ads,
            start_time: Instant::now(),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Background task purging expired confirmation tokens.
    pub fn spawn_token_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let registry = self.registry.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let purged = registry.purge_expired().await;
                if purged > 0 {
                    tracing::info!(purged, "sweeper: expired confirmation tokens removed");
                }
            }
        })
    }
}
