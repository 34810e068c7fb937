use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use super::Worker;
use crate::block_number_filter::{BlockNumberFilter, BlockNumberFilterStats, FilterStatus};
use crate::error::{timed, SyncError};
use crate::ingester::{self, ContractIngestReport, IngestOptions, Provider};
use crate::networks::Network;
use crate::processor::{EventStorageProcessor, ProcessReport};
use crate::repos::{Repo, RepoClient};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerStats {
    pub provider_requests: u64,
    /// Latest raw chain head reading.
    pub chain_block_number: Option<u64>,
    /// Latest reading accepted by the block number filter.
    pub filtered_block_number: Option<u64>,
    pub block_number_filter: BlockNumberFilterStats,
    pub last_sync_block_number: Option<u64>,
    pub last_raw_block_number: Option<u64>,
    pub last_process_block_number: Option<u64>,
    pub raw_events: u64,
    pub transaction_items: u64,
    pub bus_messages: u64,
    pub bus_errors: u64,
    /// Latest failure per contract address, cleared once the contract succeeds.
    pub contract_errors: BTreeMap<String, String>,
}

impl IndexerStats {
    fn record_ingest(&mut self, address: &str, report: &ContractIngestReport) {
        self.provider_requests += report.provider_requests;
        self.raw_events += report.raw_events;
        if report.sync_block_number.is_some() {
            self.last_sync_block_number = report.sync_block_number;
        }
        if report.raw_block_number.is_some() {
            self.last_raw_block_number = report.raw_block_number;
        }
        self.contract_errors.remove(address);
    }

    fn record_process(&mut self, report: &ProcessReport) {
        self.transaction_items += report.get_items();
        self.bus_messages += report.bus_messages;
        self.bus_errors += report.bus_errors;

        for contract in &report.contracts {
            if let Some(process_block_number) = contract.process_block_number {
                self.last_process_block_number = Some(process_block_number);
            }
            if let Some(error) = &contract.error {
                self.contract_errors.insert(contract.address.clone(), error.clone());
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct IndexerOptions {
    pub indexer_concurrency: usize,
    pub block_number_offset: u64,
    pub ingest: IngestOptions,
}

/// Per network: follows the chain head, ingests raw logs for every active
/// contract, then decodes what was ingested.
pub struct IndexerWorker<R: Repo> {
    network: Network,
    repo: R,
    provider: Arc<dyn Provider>,
    processor: EventStorageProcessor<R>,
    filter: Mutex<BlockNumberFilter>,
    stats: Arc<Mutex<IndexerStats>>,
    options: IndexerOptions,
}

impl<R: Repo> IndexerWorker<R> {
    pub fn new(
        repo: R,
        provider: Arc<dyn Provider>,
        processor: EventStorageProcessor<R>,
        block_number_filter_size: usize,
        options: IndexerOptions,
    ) -> Self {
        Self {
            network: processor.get_network().clone(),
            repo,
            provider,
            processor,
            filter: Mutex::new(BlockNumberFilter::new(block_number_filter_size)),
            stats: Arc::new(Mutex::new(IndexerStats::default())),
            options,
        }
    }

    /// Live view of the stats, for monitoring.
    pub fn get_stats_handle(&self) -> Arc<Mutex<IndexerStats>> {
        self.stats.clone()
    }

    async fn get_current_block_number(&self) -> Result<Option<u64>, SyncError> {
        let reading = timed(
            self.options.ingest.rpc_timeout,
            "get_block_number",
            self.provider.get_block_number(),
        )
        .await;
        self.stats.lock().await.provider_requests += 1;
        let reading = reading?.as_u64();

        let mut filter = self.filter.lock().await;
        let result = filter.analyze(reading);
        {
            let mut stats = self.stats.lock().await;
            stats.chain_block_number = Some(reading);
            stats.block_number_filter = filter.get_stats();
        }

        match result.status {
            FilterStatus::Preparing => {
                debug!(network = %self.network.name, reading, "block number filter preparing");
                Ok(None)
            }
            FilterStatus::Error => Err(SyncError::RejectedBlockNumber(result.value)),
            FilterStatus::Success => {
                self.stats.lock().await.filtered_block_number = Some(result.value);

                Ok(Some(result.value.saturating_sub(self.options.block_number_offset)))
            }
        }
    }

    async fn ingest(&self, current_block_number: u64) -> Result<(), SyncError> {
        let repo_timeout = self.options.ingest.repo_timeout;
        let client = timed(repo_timeout, "get_client", self.repo.get_client()).await?;
        let contracts =
            timed(repo_timeout, "load_contracts", client.load_contracts(self.network.id)).await?;
        drop(client);

        let reports: Vec<_> = stream::iter(contracts.into_iter().filter(|c| c.is_active()))
            .map(|contract| async move {
                let mut report = ContractIngestReport::default();
                let result = ingester::ingest_contract(
                    &self.repo,
                    self.provider.as_ref(),
                    contract.id,
                    current_block_number,
                    &self.options.ingest,
                    &mut report,
                )
                .await;

                (contract, report, result)
            })
            .buffer_unordered(self.options.indexer_concurrency.max(1))
            .collect()
            .await;

        let mut stats = self.stats.lock().await;
        for (contract, report, result) in reports {
            stats.record_ingest(&contract.address, &report);

            if let Err(e) = result {
                warn!(
                    network = %self.network.name,
                    contract = contract.get_name(),
                    error = %e,
                    "failed to ingest contract"
                );

                stats.contract_errors.insert(contract.address.clone(), e.to_string());
            }
        }

        Ok(())
    }

    async fn process(&self) -> Result<(), SyncError> {
        let report = self.processor.process().await?;
        if report.get_items() > 0 {
            info!(
                network = %self.network.name,
                items = report.get_items(),
                bus_messages = report.bus_messages,
                "processed events"
            );
        }
        self.stats.lock().await.record_process(&report);

        Ok(())
    }
}

#[async_trait::async_trait]
impl<R: Repo> Worker for IndexerWorker<R> {
    type Stats = IndexerStats;

    fn get_name(&self) -> &'static str {
        "indexer"
    }

    async fn work(&self) -> Result<(), SyncError> {
        // The filter gates ingestion only; already stored events are decoded
        // on every tick.
        let ingested = match self.get_current_block_number().await {
            Ok(Some(current_block_number)) => self.ingest(current_block_number).await,
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        let processed = self.process().await;

        ingested.and(processed)
    }

    async fn get_stats(&self) -> IndexerStats {
        self.stats.lock().await.clone()
    }

    async fn reset(&self) {
        self.filter.lock().await.reset();
        *self.stats.lock().await = IndexerStats::default();
    }

    async fn subscribe(&self) -> Option<mpsc::Receiver<()>> {
        let client = self.repo.get_client().await.ok()?;
        let contracts = client.load_contracts(self.network.id).await.ok()?;
        let addresses: Vec<_> =
            contracts.iter().filter(|c| c.is_active()).filter_map(|c| c.get_address()).collect();

        self.provider.subscribe(&addresses).await
    }
}
