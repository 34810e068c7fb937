use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::RwLock;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::bus::EventNotifier;
use crate::config::{Config, ConfigError};
use crate::contracts::UnsavedContract;
use crate::engine_task::EngineTask;
use crate::error::{timed, SyncError};
use crate::families::FamilyRegistry;
use crate::ingester::{self, Provider};
use crate::processor::{DecimalsCache, EventStorageProcessor, ProcessorOptions};
use crate::repos::{Repo, RepoClient};
use crate::sync_engine::{SyncEngine, SyncEngineStats};

/// Runs one [`SyncEngine`] per configured network over shared storage, bus
/// and decoding caches.
pub struct MultiSyncEngine<R: Repo> {
    config: Config,
    repo: R,
    notifier: Arc<dyn EventNotifier>,
    providers: HashMap<String, Arc<dyn Provider>>,
    families: Arc<FamilyRegistry>,
    decimals: Arc<DecimalsCache>,
    engines: RwLock<BTreeMap<String, Arc<SyncEngine<R>>>>,
    engine_task: EngineTask,
}

impl<R: Repo> MultiSyncEngine<R> {
    /// Every configured network needs a provider under its name.
    pub fn new(
        config: Config,
        repo: R,
        notifier: Arc<dyn EventNotifier>,
        providers: HashMap<String, Arc<dyn Provider>>,
    ) -> Result<Self, SyncError> {
        config.validate()?;

        if let Some(network) = config.networks.iter().find(|n| !providers.contains_key(&n.name)) {
            return Err(ConfigError::MissingProvider(network.name.clone()).into());
        }

        Ok(Self {
            config,
            repo,
            notifier,
            providers,
            families: Arc::new(FamilyRegistry::default()),
            decimals: Arc::new(DecimalsCache::new()),
            engines: RwLock::new(BTreeMap::new()),
            engine_task: EngineTask::new(),
        })
    }

    /// Connects an HTTP provider to each network's `json_rpc_url`.
    pub fn from_config(
        config: Config,
        repo: R,
        notifier: Arc<dyn EventNotifier>,
    ) -> Result<Self, SyncError> {
        let providers = config
            .networks
            .iter()
            .map(|n| Ok((n.name.clone(), ingester::get_provider(&n.json_rpc_url)?)))
            .collect::<Result<HashMap<_, _>, ConfigError>>()?;

        Self::new(config, repo, notifier, providers)
    }

    pub fn with_families(mut self, families: FamilyRegistry) -> Self {
        self.families = Arc::new(families);
        self
    }

    pub fn get_config(&self) -> &Config {
        &self.config
    }

    /// Migrates and seeds storage, starts every engine and runs a first sync.
    pub async fn start(&self) -> Result<(), SyncError> {
        let repo_timeout = self.config.get_repo_timeout();
        let mut client = timed(repo_timeout, "get_client", self.repo.get_client()).await?;

        timed(repo_timeout, "migrate", client.migrate()).await?;
        self.seed(&mut client).await?;
        self.build_engines(&client).await?;

        info!(networks = self.config.networks.len(), "sync engines started");

        self.sync(None).await
    }

    /// Syncs one network, or every network when `network` is `None`.
    pub async fn sync(&self, network: Option<&str>) -> Result<(), SyncError> {
        match network {
            Some(name) => self.get_engine(name).await?.sync().await,
            None => {
                let engines = self.get_engines().await;
                join_all(engines.iter().map(|engine| engine.sync())).await;
            }
        }

        Ok(())
    }

    /// Wipes all storage, reseeds it from configuration and resyncs.
    pub async fn hard_reset(&self) -> Result<(), SyncError> {
        let repo_timeout = self.config.get_repo_timeout();
        let mut client = timed(repo_timeout, "get_client", self.repo.get_client()).await?;

        info!("hard reset");
        // Outgoing engines must not run against the wiped storage
        for engine in self.get_engines().await {
            engine.stop().await;
            engine.reset().await;
        }
        timed(repo_timeout, "hard_reset", client.hard_reset()).await?;
        self.decimals.clear().await;
        self.seed(&mut client).await?;
        self.build_engines(&client).await?;

        self.sync(None).await
    }

    /// Drops decoded items and accounts so every raw event is decoded again,
    /// keeping raw data and sync checkpoints.
    pub async fn soft_reset(&self) -> Result<(), SyncError> {
        let repo_timeout = self.config.get_repo_timeout();
        let client = timed(repo_timeout, "get_client", self.repo.get_client()).await?;

        info!("soft reset");
        timed(repo_timeout, "soft_reset", client.soft_reset()).await?;

        self.sync(None).await
    }

    pub async fn get_stats(&self, network: &str) -> Result<SyncEngineStats, SyncError> {
        Ok(self.get_engine(network).await?.get_stats().await)
    }

    pub async fn get_all_stats(&self) -> Vec<SyncEngineStats> {
        join_all(self.get_engines().await.iter().map(|engine| engine.get_stats())).await
    }

    pub async fn stop(&self) {
        self.engine_task.stop().await;

        for engine in self.get_engines().await {
            engine.stop().await;
        }
    }

    /// Drives `sync(None)` every `tick_interval_ms` until [`Self::stop`].
    pub async fn spawn_scheduler(self: &Arc<Self>) {
        let engine = self.clone();

        let scheduler = tokio::spawn(async move {
            let mut interval = interval(engine.config.get_tick_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                if let Err(e) = engine.sync(None).await {
                    error!(error = %e, "scheduled sync failed");
                }
            }
        });

        self.engine_task.add_subtask(scheduler).await;
    }

    async fn get_engine(&self, network: &str) -> Result<Arc<SyncEngine<R>>, SyncError> {
        self.engines
            .read()
            .await
            .get(network)
            .cloned()
            .ok_or_else(|| SyncError::UnknownNetwork(network.to_owned()))
    }

    async fn get_engines(&self) -> Vec<Arc<SyncEngine<R>>> {
        self.engines.read().await.values().cloned().collect()
    }

    /// Networks are ensured on every run; contracts only while none exist.
    async fn seed(&self, client: &mut R::Client) -> Result<(), SyncError> {
        let repo_timeout = self.config.get_repo_timeout();

        timed(repo_timeout, "seed", async {
            let txn = R::get_txn_client(client).await?;
            let seed_contracts = txn.count_contracts().await? == 0;

            for network_config in &self.config.networks {
                let network = match txn.load_network(&network_config.name).await? {
                    Some(network) => network,
                    None => txn.create_network(&network_config.name).await?,
                };

                if seed_contracts {
                    for contract in &network_config.contracts {
                        txn.create_contract(&UnsavedContract::new(network.id, contract)).await?;
                    }
                }
            }

            R::commit_txn(txn).await
        })
        .await
    }

    /// Replaces the running engines with fresh ones bound to the stored
    /// networks.
    async fn build_engines(&self, client: &R::Client) -> Result<(), SyncError> {
        let repo_timeout = self.config.get_repo_timeout();
        let mut engines = BTreeMap::new();

        for network_config in &self.config.networks {
            let network = timed(repo_timeout, "load_network", client.load_network(&network_config.name))
                .await?
                .ok_or_else(|| SyncError::UnknownNetwork(network_config.name.clone()))?;
            let provider = self
                .providers
                .get(&network.name)
                .cloned()
                .ok_or_else(|| ConfigError::MissingProvider(network.name.clone()))?;

            let processor = EventStorageProcessor::new(
                network.clone(),
                self.repo.clone(),
                provider.clone(),
                self.notifier.clone(),
                ProcessorOptions {
                    db_concurrency: self.config.db_concurrency,
                    rpc_timeout: self.config.get_rpc_timeout(),
                    repo_timeout,
                },
            )
            .with_families(self.families.clone())
            .with_decimals_cache(self.decimals.clone());

            let engine =
                SyncEngine::new(&self.config, network_config, self.repo.clone(), provider, processor);
            engine.start().await;

            engines.insert(network.name.clone(), Arc::new(engine));
        }

        let previous = std::mem::replace(&mut *self.engines.write().await, engines);
        for engine in previous.into_values() {
            engine.stop().await;
        }

        Ok(())
    }
}
