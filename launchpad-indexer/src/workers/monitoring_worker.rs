use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use super::{IndexerStats, Worker};
use crate::error::{timed, SyncError};
use crate::networks::Network;
use crate::repos::{Repo, RepoClient};
use crate::speed_counter::{SpeedCounter, SpeedStats};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringStats {
    pub started_at: Option<DateTime<Utc>>,
    pub uptime_ms: u64,
    pub tick_id: u64,
    pub chain_block_number: Option<u64>,
    /// Slowest active contract's checkpoints.
    pub sync_block_number: Option<u64>,
    pub process_block_number: Option<u64>,
    /// Blocks between the accepted head and the slowest sync checkpoint.
    pub indexer_lag: Option<u64>,
    /// Active contracts still behind the confirmed head.
    pub contracts_remains: u64,
    pub provider_requests: SpeedStats,
    pub sync_speed: SpeedStats,
    pub process_speed: SpeedStats,
    pub bus_messages: SpeedStats,
}

struct SpeedCounters {
    provider_requests: SpeedCounter,
    sync: SpeedCounter,
    process: SpeedCounter,
    bus_messages: SpeedCounter,
}

impl SpeedCounters {
    fn new(window: Duration) -> Self {
        Self {
            provider_requests: SpeedCounter::new(window),
            sync: SpeedCounter::new(window),
            process: SpeedCounter::new(window),
            bus_messages: SpeedCounter::new(window),
        }
    }

    fn reset(&mut self) {
        self.provider_requests.reset();
        self.sync.reset();
        self.process.reset();
        self.bus_messages.reset();
    }
}

/// Per network: derives progress and throughput from the indexer's counters
/// and the stored checkpoints.
pub struct MonitoringWorker<R: Repo> {
    network: Network,
    repo: R,
    indexer_stats: Arc<Mutex<IndexerStats>>,
    tick_id: Arc<AtomicU64>,
    block_number_offset: u64,
    repo_timeout: Duration,
    started_at: DateTime<Utc>,
    counters: Mutex<SpeedCounters>,
    stats: Mutex<MonitoringStats>,
}

impl<R: Repo> MonitoringWorker<R> {
    pub fn new(
        network: Network,
        repo: R,
        indexer_stats: Arc<Mutex<IndexerStats>>,
        tick_id: Arc<AtomicU64>,
        block_number_offset: u64,
        speed_window: Duration,
        repo_timeout: Duration,
    ) -> Self {
        Self {
            network,
            repo,
            indexer_stats,
            tick_id,
            block_number_offset,
            repo_timeout,
            started_at: Utc::now(),
            counters: Mutex::new(SpeedCounters::new(speed_window)),
            stats: Mutex::new(MonitoringStats::default()),
        }
    }
}

#[async_trait::async_trait]
impl<R: Repo> Worker for MonitoringWorker<R> {
    type Stats = MonitoringStats;

    fn get_name(&self) -> &'static str {
        "monitoring"
    }

    async fn work(&self) -> Result<(), SyncError> {
        let client = timed(self.repo_timeout, "get_client", self.repo.get_client()).await?;
        let contracts =
            timed(self.repo_timeout, "load_contracts", client.load_contracts(self.network.id))
                .await?;
        let contracts: Vec<_> = contracts.into_iter().filter(|c| c.is_active()).collect();

        let indexer = self.indexer_stats.lock().await.clone();
        let sync_block_number = contracts.iter().map(|c| c.sync_block_number).min();
        let process_block_number = contracts.iter().map(|c| c.process_block_number).min();
        let target = indexer.filtered_block_number.map(|n| n.saturating_sub(self.block_number_offset));

        let mut counters = self.counters.lock().await;
        counters.provider_requests.store(indexer.provider_requests as f64);
        counters.bus_messages.store(indexer.bus_messages as f64);
        if let Some(sync_block_number) = sync_block_number {
            counters.sync.store(sync_block_number as f64);
        }
        if let Some(process_block_number) = process_block_number {
            counters.process.store(process_block_number as f64);
        }

        *self.stats.lock().await = MonitoringStats {
            started_at: Some(self.started_at),
            uptime_ms: (Utc::now() - self.started_at).num_milliseconds().max(0) as u64,
            tick_id: self.tick_id.load(Ordering::SeqCst),
            chain_block_number: indexer.chain_block_number,
            sync_block_number,
            process_block_number,
            indexer_lag: indexer
                .filtered_block_number
                .zip(sync_block_number)
                .map(|(head, sync)| head.saturating_sub(sync)),
            contracts_remains: target
                .map(|target| contracts.iter().filter(|c| c.sync_block_number < target).count())
                .unwrap_or(contracts.len()) as u64,
            provider_requests: counters.provider_requests.get_stats(),
            sync_speed: counters.sync.get_stats(),
            process_speed: counters.process.get_stats(),
            bus_messages: counters.bus_messages.get_stats(),
        };

        Ok(())
    }

    async fn get_stats(&self) -> MonitoringStats {
        self.stats.lock().await.clone()
    }

    async fn reset(&self) {
        self.counters.lock().await.reset();
        *self.stats.lock().await = MonitoringStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContractConfig;
    use crate::contracts::{ContractType, UnsavedContract};
    use crate::repos::MemoryRepo;

    #[tokio::test]
    pub async fn reports_lag_against_the_accepted_head() {
        let repo = MemoryRepo::new();
        let client = repo.get_client().await.unwrap();
        let network = client.create_network("bsc").await.unwrap();
        for (address, block_number) in [
            ("0x0000000000000000000000000000000000000001", 100),
            ("0x0000000000000000000000000000000000000002", 180),
        ] {
            let config = ContractConfig::new(address, ContractType::Vesting, block_number);
            client.create_contract(&UnsavedContract::new(network.id, &config)).await.unwrap();
        }

        let indexer_stats = Arc::new(Mutex::new(IndexerStats {
            chain_block_number: Some(200),
            filtered_block_number: Some(200),
            ..Default::default()
        }));
        let worker = MonitoringWorker::new(
            network,
            repo,
            indexer_stats,
            Arc::new(AtomicU64::new(7)),
            10,
            Duration::from_secs(60),
            Duration::from_secs(1),
        );

        worker.work().await.unwrap();

        let stats = worker.get_stats().await;
        assert_eq!(stats.tick_id, 7);
        assert_eq!(stats.sync_block_number, Some(100));
        assert_eq!(stats.indexer_lag, Some(100));
        assert_eq!(stats.contracts_remains, 2);
        assert!(stats.started_at.is_some());
    }
}
