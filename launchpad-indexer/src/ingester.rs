mod provider;

pub use provider::{get as get_provider, Provider, ProviderError};

use std::cmp::min;
use std::collections::BTreeSet;
use std::time::Duration;

use ethers::types::{Filter, TxHash, U64};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::config::ConfigError;
use crate::contracts::Contract;
use crate::error::{timed, SyncError};
use crate::events::{RawBatch, RawBlock, RawEvent, RawTransaction};
use crate::repos::{Repo, RepoClient};

const FETCH_CONCURRENCY: usize = 4;

#[derive(Clone, Debug)]
pub struct IngestOptions {
    pub block_number_range: u64,
    pub rpc_timeout: Duration,
    pub repo_timeout: Duration,
}

/// What one contract's ingestion achieved during a tick, even when it stopped
/// early on an error.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContractIngestReport {
    pub provider_requests: u64,
    pub sync_block_number: Option<u64>,
    pub raw_block_number: Option<u64>,
    pub raw_events: u64,
}

/// Advances one contract's sync checkpoint towards `current_block_number`,
/// one `block_number_range` batch at a time.
///
/// Each batch covers the half-open range `[sync, to)` and is stored together
/// with the new checkpoint in one transaction, so a failure never leaves raw
/// rows ahead of the checkpoint or the checkpoint ahead of its rows.
pub async fn ingest_contract<R: Repo>(
    repo: &R,
    provider: &dyn Provider,
    contract_id: i32,
    current_block_number: u64,
    options: &IngestOptions,
    report: &mut ContractIngestReport,
) -> Result<(), SyncError> {
    let mut client = timed(options.repo_timeout, "get_client", repo.get_client()).await?;

    loop {
        let contract =
            timed(options.repo_timeout, "load_contract", client.load_contract(contract_id))
                .await?;
        let Some(contract) = contract.filter(|c| c.is_active()) else {
            return Ok(());
        };
        if contract.sync_block_number >= current_block_number {
            return Ok(());
        }

        let from = contract.sync_block_number;
        let to = min(from.saturating_add(options.block_number_range), current_block_number);

        let logs = timed(
            options.rpc_timeout,
            "get_logs",
            provider.get_logs(&get_filter(&contract, from, to)?),
        )
        .await?;
        report.provider_requests += 1;

        let events: Vec<_> = logs.iter().filter_map(|log| RawEvent::new(log, &contract)).collect();
        let batch = fetch_raw_batch(&client, provider, &contract, events, options, report).await?;

        debug!(
            contract = contract.get_name(),
            from,
            to,
            events = batch.events.len(),
            "ingested block range"
        );

        timed(options.repo_timeout, "store raw batch", async {
            let txn = R::get_txn_client(&mut client).await?;

            txn.create_raw_blocks(&batch.blocks).await?;
            txn.create_raw_transactions(&batch.transactions).await?;
            txn.create_raw_events(&batch.events).await?;
            txn.update_sync_block_number(contract.id, to).await?;

            R::commit_txn(txn).await
        })
        .await?;

        report.sync_block_number = Some(to);
        report.raw_events += batch.events.len() as u64;
        if let Some(last) = batch.events.iter().map(|e| e.block_number).max() {
            report.raw_block_number = Some(last);
        }
    }
}

fn get_filter(contract: &Contract, from: u64, to: u64) -> Result<Filter, SyncError> {
    let address =
        contract.get_address().ok_or_else(|| ConfigError::InvalidAddress(contract.address.clone()))?;

    Ok(Filter::new().address(address).from_block(from).to_block(to - 1))
}

/// Fetches the blocks and transactions of `events` that are not stored yet.
async fn fetch_raw_batch(
    client: &impl RepoClient,
    provider: &dyn Provider,
    contract: &Contract,
    events: Vec<RawEvent>,
    options: &IngestOptions,
    report: &mut ContractIngestReport,
) -> Result<RawBatch, SyncError> {
    if events.is_empty() {
        return Ok(RawBatch::default());
    }

    let block_numbers: Vec<u64> =
        events.iter().map(|e| e.block_number).collect::<BTreeSet<_>>().into_iter().collect();
    let hashes: Vec<String> =
        events.iter().map(|e| e.transaction_hash.clone()).collect::<BTreeSet<_>>().into_iter().collect();

    let stored_blocks = timed(
        options.repo_timeout,
        "load_raw_block_numbers",
        client.load_raw_block_numbers(contract.network_id, &block_numbers),
    )
    .await?;
    let stored_hashes = timed(
        options.repo_timeout,
        "load_raw_transaction_hashes",
        client.load_raw_transaction_hashes(contract.network_id, &hashes),
    )
    .await?;

    let missing_blocks: Vec<_> =
        block_numbers.into_iter().filter(|n| !stored_blocks.contains(n)).collect();
    let missing_hashes: Vec<_> = hashes.into_iter().filter(|h| !stored_hashes.contains(h)).collect();

    let blocks: Vec<RawBlock> = stream::iter(missing_blocks.iter().copied())
        .map(|number| async move {
            let block =
                timed(options.rpc_timeout, "get_block", provider.get_block(U64::from(number)))
                    .await?;

            Ok::<_, SyncError>(RawBlock::new(&block, contract.network_id, number))
        })
        .buffer_unordered(FETCH_CONCURRENCY)
        .try_collect()
        .await?;
    report.provider_requests += missing_blocks.len() as u64;

    let fetched_events = &events;
    let transactions: Vec<RawTransaction> = stream::iter(missing_hashes.iter().cloned())
        .map(|hash| async move {
            let tx_hash: TxHash = hash.parse().map_err(|_| {
                SyncError::Provider(format!("invalid transaction hash {hash}"))
            })?;
            let block_number = fetched_events
                .iter()
                .find(|e| e.transaction_hash == hash)
                .map(|e| e.block_number)
                .unwrap_or_default();
            let transaction =
                timed(options.rpc_timeout, "get_transaction", provider.get_transaction(tx_hash))
                    .await?;

            Ok::<_, SyncError>(RawTransaction::new(&transaction, contract.network_id, block_number))
        })
        .buffer_unordered(FETCH_CONCURRENCY)
        .try_collect()
        .await?;
    report.provider_requests += missing_hashes.len() as u64;

    Ok(RawBatch {
        blocks,
        transactions,
        events,
    })
}
