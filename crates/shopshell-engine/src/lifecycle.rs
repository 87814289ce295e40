//! Generation lifecycle: provisioning, activation, retirement.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::try_join_all;
use shopshell_core::{RequestContext, ShellConfig};
use shopshell_net::{FetchMode, Gateway};
use shopshell_store::{normalize, CacheStorage, CacheStore};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::strategy::StoreSet;

/// Lifecycle state of one worker generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Nothing provisioned yet.
    Uninitialized,
    /// The static store is being (or has been) populated; not yet
    /// intercepting.
    Provisioning,
    /// Intercepting requests.
    Active,
    /// Terminal: replaced by a newer generation, or provisioning failed.
    Superseded,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Provisioning => "provisioning",
            Self::Active => "active",
            Self::Superseded => "superseded",
        };
        write!(f, "{name}")
    }
}

/// Drives one generation through provision -> activate -> supersede.
///
/// Provisioning and activation are one-shot sequential operations; request
/// interception only begins once activation has completed, so bulk
/// population never races a read against the same generation's store set.
pub struct LifecycleManager {
    config: Arc<ShellConfig>,
    storage: Arc<dyn CacheStorage>,
    gateway: Arc<dyn Gateway>,
    state: RwLock<WorkerState>,
    /// Set once bulk population has completed successfully.
    provisioned: AtomicBool,
    /// Set while a previous generation still has attached clients.
    gated: AtomicBool,
    /// Set by the `SKIP_WAITING` control message.
    skip_waiting: AtomicBool,
}

impl LifecycleManager {
    /// Create a manager for one generation.
    pub fn new(
        config: Arc<ShellConfig>,
        storage: Arc<dyn CacheStorage>,
        gateway: Arc<dyn Gateway>,
    ) -> Self {
        Self {
            config,
            storage,
            gateway,
            state: RwLock::new(WorkerState::Uninitialized),
            provisioned: AtomicBool::new(false),
            gated: AtomicBool::new(false),
            skip_waiting: AtomicBool::new(false),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Mark that a previous generation still has attached clients, so
    /// activation must wait for [`release`](Self::release) or a
    /// skip-waiting request.
    pub fn hold_for_previous(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    /// The previous generation's clients are gone; activation may proceed.
    pub fn release(&self) {
        self.gated.store(false, Ordering::SeqCst);
    }

    /// Short-circuit the waiting gate.
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    /// Open the current static store and bulk-populate it from the
    /// precache manifest.
    ///
    /// Any single failed fetch is fatal: the half-populated store is torn
    /// down again, the generation becomes terminal, and the error reports
    /// which resource broke the shell.
    pub async fn provision(&self) -> EngineResult<()> {
        {
            let mut state = self.state.write().await;
            if *state != WorkerState::Uninitialized {
                return Err(EngineError::InvalidState {
                    expected: "uninitialized",
                    actual: *state,
                });
            }
            *state = WorkerState::Provisioning;
        }

        let tag = self.config.static_tag();
        let store = self.storage.open(&tag).await?;
        info!(%tag, entries = self.config.precache().len(), "provisioning static store");

        if let Err(err) = self.populate(&store).await {
            if let Err(cleanup) = self.storage.delete_version(&tag).await {
                warn!(%tag, error = %cleanup, "failed to tear down partial store");
            }
            *self.state.write().await = WorkerState::Superseded;
            return Err(err);
        }
        self.provisioned.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn populate(&self, store: &Arc<dyn CacheStore>) -> EngineResult<()> {
        let fetches = self.config.precache().iter().map(|entry| {
            let store = Arc::clone(store);
            async move {
                let url = self.config.resolve(entry)?;
                let req = RequestContext::get(url.clone());
                let fetched = self
                    .gateway
                    .fetch(&req, FetchMode::Default)
                    .await
                    .map_err(|e| {
                        EngineError::ProvisioningFailed(format!("fetching `{url}`: {e}"))
                    })?;
                if !fetched.is_success() {
                    return Err(EngineError::ProvisioningFailed(format!(
                        "fetching `{url}`: status {}",
                        fetched.status
                    )));
                }
                // Precached entries keep their full URL, query included.
                store.put(&normalize(&url, false), fetched).await?;
                Ok(())
            }
        });
        try_join_all(fetches).await?;
        Ok(())
    }

    /// Delete every store not belonging to this generation, open the
    /// runtime store and begin intercepting.
    ///
    /// Refuses while the waiting gate is closed, unless skip-waiting was
    /// requested.
    pub async fn activate(&self) -> EngineResult<StoreSet> {
        let mut state = self.state.write().await;
        if *state != WorkerState::Provisioning || !self.provisioned.load(Ordering::SeqCst) {
            // Bulk population racing a read would be observably
            // inconsistent, so mid-provisioning activation is refused too.
            return Err(EngineError::InvalidState {
                expected: "provisioned",
                actual: *state,
            });
        }
        if self.gated.load(Ordering::SeqCst) && !self.skip_waiting.load(Ordering::SeqCst) {
            return Err(EngineError::ActivationDeferred);
        }

        let keep = self.config.current_tags();
        for tag in self.storage.list_versions().await? {
            if !keep.contains(&tag) {
                self.storage.delete_version(&tag).await?;
                info!(%tag, "deleted superseded store");
            }
        }

        let static_store = self.storage.open(&self.config.static_tag()).await?;
        let runtime_store = self.storage.open(&self.config.runtime_tag()).await?;

        *state = WorkerState::Active;
        info!(
            namespace = self.config.namespace(),
            version = self.config.version(),
            "generation active"
        );
        Ok(StoreSet {
            static_store,
            runtime_store,
        })
    }

    /// A newer generation has taken over; stop intercepting for good.
    pub async fn supersede(&self) {
        let mut state = self.state.write().await;
        info!(version = self.config.version(), "generation superseded");
        *state = WorkerState::Superseded;
    }
}
