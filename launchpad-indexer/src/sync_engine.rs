use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::{Config, NetworkConfig};
use crate::engine_task::EngineTask;
use crate::ingester::{IngestOptions, Provider};
use crate::networks::Network;
use crate::processor::EventStorageProcessor;
use crate::repos::{Repo, TableRowCounts};
use crate::workers::{
    DbWorker, IndexerOptions, IndexerStats, IndexerWorker, MonitoringStats, MonitoringWorker,
    WorkerRunner, WorkerStats,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEngineStats {
    pub network: String,
    pub tick_id: u64,
    pub indexer: WorkerStats<IndexerStats>,
    pub db: WorkerStats<TableRowCounts>,
    pub monitoring: WorkerStats<MonitoringStats>,
}

/// One network's workers, driven by a shared tick counter.
pub struct SyncEngine<R: Repo> {
    network: Network,
    indexer: Arc<WorkerRunner<IndexerWorker<R>>>,
    db: Arc<WorkerRunner<DbWorker<R>>>,
    monitoring: Arc<WorkerRunner<MonitoringWorker<R>>>,
    tick_id: Arc<AtomicU64>,
    engine_task: EngineTask,
}

impl<R: Repo> SyncEngine<R> {
    pub fn new(
        config: &Config,
        network_config: &NetworkConfig,
        repo: R,
        provider: Arc<dyn Provider>,
        processor: EventStorageProcessor<R>,
    ) -> Self {
        let network = processor.get_network().clone();
        let tick_id = Arc::new(AtomicU64::new(0));
        let dividers = &network_config.tick_dividers;

        let indexer = IndexerWorker::new(
            repo.clone(),
            provider,
            processor,
            network_config.block_number_filter_size,
            IndexerOptions {
                indexer_concurrency: config.indexer_concurrency,
                block_number_offset: network_config.block_number_offset,
                ingest: IngestOptions {
                    block_number_range: network_config.block_number_range,
                    rpc_timeout: config.get_rpc_timeout(),
                    repo_timeout: config.get_repo_timeout(),
                },
            },
        );
        let monitoring = MonitoringWorker::new(
            network.clone(),
            repo.clone(),
            indexer.get_stats_handle(),
            tick_id.clone(),
            network_config.block_number_offset,
            config.get_speed_window(),
            config.get_repo_timeout(),
        );
        let db = DbWorker::new(network.clone(), repo, config.get_repo_timeout());

        Self {
            network,
            indexer: Arc::new(WorkerRunner::new(indexer, dividers.indexer)),
            db: Arc::new(WorkerRunner::new(db, dividers.db)),
            monitoring: Arc::new(WorkerRunner::new(monitoring, dividers.monitoring)),
            tick_id,
            engine_task: EngineTask::new(),
        }
    }

    pub fn get_network(&self) -> &Network {
        &self.network
    }

    pub fn get_tick_id(&self) -> u64 {
        self.tick_id.load(Ordering::SeqCst)
    }

    /// Hooks push notifications up to out-of-band indexer runs.
    pub async fn start(&self) {
        if let Some(wake_ups) = self.indexer.start().await {
            info!(network = %self.network.name, "listening for pushed chain activity");
            self.engine_task.add_subtask(wake_ups).await;
        }
    }

    /// Executes every worker due at the current tick, then advances the tick.
    pub async fn sync(&self) {
        let tick_id = self.get_tick_id();

        tokio::join!(
            self.indexer.execute(tick_id),
            self.db.execute(tick_id),
            self.monitoring.execute(tick_id),
        );

        self.tick_id.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn reset(&self) {
        self.indexer.reset().await;
        self.db.reset().await;
        self.monitoring.reset().await;
        self.tick_id.store(0, Ordering::SeqCst);
    }

    pub async fn stop(&self) {
        self.engine_task.stop().await;
    }

    pub async fn get_stats(&self) -> SyncEngineStats {
        SyncEngineStats {
            network: self.network.name.clone(),
            tick_id: self.get_tick_id(),
            indexer: self.indexer.get_stats().await,
            db: self.db.get_stats().await,
            monitoring: self.monitoring.get_stats().await,
        }
    }
}
