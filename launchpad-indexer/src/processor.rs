use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use ethers::abi::Token;
use ethers::types::{Address, Bytes};
use futures_util::stream::{self, StreamExt};
use tracing::{debug, error, warn};

use crate::accounts::Account;
use crate::bus::{BusEvent, EventNotifier};
use crate::cache_machine::CacheMachine;
use crate::config::ConfigError;
use crate::contracts::Contract;
use crate::decoding::{address_from_topic, decode_hex, DecodeError};
use crate::error::{timed, SyncError};
use crate::events::ProcessableEvent;
use crate::families::{ContractFamily, DecodeContext, DecodedEvent, FamilyRegistry, TOKEN_ABI};
use crate::id_lock::IdLock;
use crate::ingester::Provider;
use crate::networks::Network;
use crate::repos::{Repo, RepoClient};

/// Token decimals per `(network, contract address)`.
pub type DecimalsCache = CacheMachine<(String, String), u32>;

#[derive(Clone, Debug)]
pub struct ProcessorOptions {
    pub db_concurrency: usize,
    pub rpc_timeout: Duration,
    pub repo_timeout: Duration,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContractProcessReport {
    pub contract_id: i32,
    pub address: String,
    /// New checkpoint, set only when the contract's batch was persisted.
    pub process_block_number: Option<u64>,
    pub items: u64,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessReport {
    pub contracts: Vec<ContractProcessReport>,
    pub bus_messages: u64,
    pub bus_errors: u64,
}

impl ProcessReport {
    pub fn get_items(&self) -> u64 {
        self.contracts.iter().map(|c| c.items).sum()
    }
}

struct DecodedBatch {
    to: u64,
    events: Vec<DecodedEvent>,
}

/// Turns a network's raw events into transaction items and bus events.
///
/// One run decodes every active contract's unprocessed range, then persists
/// items, accounts and process checkpoints in a single storage transaction.
/// A contract whose decoding fails keeps its checkpoint and is retried on the
/// next run; the others still advance. Bus events go out only after commit.
pub struct EventStorageProcessor<R: Repo> {
    network: Network,
    repo: R,
    provider: Arc<dyn Provider>,
    notifier: Arc<dyn EventNotifier>,
    families: Arc<FamilyRegistry>,
    decimals: Arc<DecimalsCache>,
    // Never shared across networks: each network holds its keys inside its
    // own storage transaction.
    accounts: Arc<IdLock<String>>,
    options: ProcessorOptions,
}

impl<R: Repo> EventStorageProcessor<R> {
    pub fn new(
        network: Network,
        repo: R,
        provider: Arc<dyn Provider>,
        notifier: Arc<dyn EventNotifier>,
        options: ProcessorOptions,
    ) -> Self {
        Self {
            network,
            repo,
            provider,
            notifier,
            families: Arc::new(FamilyRegistry::default()),
            decimals: Arc::new(CacheMachine::new()),
            accounts: Arc::new(IdLock::new()),
            options,
        }
    }

    pub fn with_families(mut self, families: Arc<FamilyRegistry>) -> Self {
        self.families = families;
        self
    }

    /// Shares the decimals memo with processors of other networks.
    pub fn with_decimals_cache(mut self, decimals: Arc<DecimalsCache>) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn get_network(&self) -> &Network {
        &self.network
    }

    pub async fn process(&self) -> Result<ProcessReport, SyncError> {
        let repo_timeout = self.options.repo_timeout;
        let mut client = timed(repo_timeout, "get_client", self.repo.get_client()).await?;
        let txn = timed(repo_timeout, "get_txn_client", R::get_txn_client(&mut client)).await?;

        let contracts =
            timed(repo_timeout, "load_contracts", txn.load_contracts(self.network.id)).await?;

        let txn_ref = &txn;
        let decoded: Vec<_> = stream::iter(contracts.into_iter().filter(|c| c.is_active()))
            .map(|contract| async move {
                let result = self.decode_contract(txn_ref, &contract).await;
                (contract, result)
            })
            .buffer_unordered(self.options.db_concurrency.max(1))
            .collect()
            .await;

        let mut report = ProcessReport::default();
        let mut batches = vec![];

        for (contract, result) in decoded {
            match result? {
                Ok(None) => {}
                Ok(Some(batch)) => batches.push((contract, batch)),
                Err(e) => {
                    warn!(
                        network = %self.network.name,
                        contract = contract.get_name(),
                        error = %e,
                        "failed to decode contract events"
                    );

                    report.contracts.push(ContractProcessReport {
                        contract_id: contract.id,
                        address: contract.address.clone(),
                        error: Some(e.to_string()),
                        ..Default::default()
                    });
                }
            }
        }

        let accounts = self.find_or_create_accounts(&txn, &batches).await?;
        let mut bus_events = vec![];

        for (contract, DecodedBatch { to, events }) in batches {
            let mut contract_report = ContractProcessReport {
                contract_id: contract.id,
                address: contract.address.clone(),
                ..Default::default()
            };

            for DecodedEvent { item, bus_event } in events {
                let account = accounts
                    .get(item.get_account())
                    .ok_or(DecodeError::MissingField("account"))?;

                timed(
                    repo_timeout,
                    "create_transaction_item",
                    txn.create_transaction_item(&item.with_account(account)),
                )
                .await?;

                contract_report.items += 1;
                bus_events.push(bus_event);
            }

            let process_block_number = to + 1;
            timed(
                repo_timeout,
                "update_process_block_number",
                txn.update_process_block_number(contract.id, process_block_number),
            )
            .await?;

            contract_report.process_block_number = Some(process_block_number);
            report.contracts.push(contract_report);
        }

        timed(repo_timeout, "commit_txn", R::commit_txn(txn)).await?;

        for bus_event in bus_events {
            self.publish(&bus_event, &mut report).await;
        }

        Ok(report)
    }

    async fn publish(&self, bus_event: &BusEvent, report: &mut ProcessReport) {
        match self.notifier.send(bus_event).await {
            Ok(()) => {
                debug!(event = bus_event.get_name(), tx = bus_event.get_tx(), "published");
                report.bus_messages += 1;
            }
            Err(e) => {
                error!(
                    network = %self.network.name,
                    event = bus_event.get_name(),
                    tx = bus_event.get_tx(),
                    error = %e,
                    "failed to publish bus event"
                );
                report.bus_errors += 1;
            }
        }
    }

    /// The outer error is a storage failure and aborts the whole run; the
    /// inner one only concerns this contract.
    async fn decode_contract(
        &self,
        client: &impl RepoClient,
        contract: &Contract,
    ) -> Result<Result<Option<DecodedBatch>, SyncError>, SyncError> {
        let Some((from, to)) = contract.get_unprocessed_range() else {
            return Ok(Ok(None));
        };
        let Some(family) = self.families.get(contract.contract_type) else {
            let error = DecodeError::UnregisteredFamily(contract.contract_type.to_string());
            return Ok(Err(error.into()));
        };

        let events = timed(
            self.options.repo_timeout,
            "load_processable_events",
            client.load_processable_events(contract.id, from, to),
        )
        .await?;

        Ok(self.decode_events(family.as_ref(), contract, &events).await.map(|events| {
            Some(DecodedBatch { to, events })
        }))
    }

    async fn decode_events(
        &self,
        family: &dyn ContractFamily,
        contract: &Contract,
        events: &[ProcessableEvent],
    ) -> Result<Vec<DecodedEvent>, SyncError> {
        let decodable: Vec<_> =
            events.iter().filter_map(|event| get_decodable(family, event)).collect();
        if decodable.is_empty() {
            return Ok(vec![]);
        }

        let decimals = self.get_decimals(family, contract).await?;

        decodable
            .into_iter()
            .map(|(event, event_name, topic1, input, data)| {
                let context = DecodeContext {
                    network: &self.network.name,
                    contract,
                    event,
                    event_name,
                    account: address_from_topic(topic1)?,
                    input: decode_hex(input)?,
                    data,
                    decimals,
                };

                family.decode(&context).map_err(SyncError::from)
            })
            .collect()
    }

    /// Resolves every account a run touches, in address order, so runs of
    /// other networks inserting the same accounts lock them in the same order.
    async fn find_or_create_accounts(
        &self,
        client: &impl RepoClient,
        batches: &[(Contract, DecodedBatch)],
    ) -> Result<BTreeMap<String, Account>, SyncError> {
        let addresses: BTreeSet<&str> = batches
            .iter()
            .flat_map(|(_, batch)| batch.events.iter().map(|event| event.item.get_account()))
            .collect();

        let mut accounts = BTreeMap::new();
        for address in addresses {
            let account = self.find_or_create_account(client, address).await?;
            accounts.insert(address.to_owned(), account);
        }

        Ok(accounts)
    }

    async fn find_or_create_account(
        &self,
        client: &impl RepoClient,
        address: &str,
    ) -> Result<Account, SyncError> {
        let repo_timeout = self.options.repo_timeout;

        self.accounts
            .try_invoke(address.to_owned(), || async {
                match timed(repo_timeout, "load_account", client.load_account(address)).await? {
                    Some(account) => Ok::<_, SyncError>(account),
                    None => timed(repo_timeout, "create_account", client.create_account(address)).await,
                }
            })
            .await
    }

    async fn get_decimals(
        &self,
        family: &dyn ContractFamily,
        contract: &Contract,
    ) -> Result<u32, SyncError> {
        self.decimals
            .try_call(
                || (self.network.name.clone(), contract.address.clone()),
                || async {
                    let address = contract
                        .get_address()
                        .ok_or_else(|| ConfigError::InvalidAddress(contract.address.clone()))?;

                    let token = self
                        .call_token_getter(address, family.get_token_getter())
                        .await?
                        .into_address()
                        .ok_or(DecodeError::MissingField("token address"))?;
                    let decimals = self
                        .call_token_getter(token, "decimals")
                        .await?
                        .into_uint()
                        .ok_or(DecodeError::MissingField("decimals"))?;

                    Ok::<_, SyncError>(decimals.low_u32())
                },
            )
            .await
    }

    async fn call_token_getter(&self, to: Address, getter: &str) -> Result<Token, SyncError> {
        let function =
            TOKEN_ABI.function(getter).map_err(|e| DecodeError::InvalidData(e.to_string()))?;
        let data = function.encode_input(&[]).map_err(|e| DecodeError::InvalidData(e.to_string()))?;

        let output =
            timed(self.options.rpc_timeout, getter, self.provider.call(to, Bytes::from(data)))
                .await?;

        function
            .decode_output(&output)
            .map_err(|e| DecodeError::InvalidData(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| DecodeError::MissingField("getter output").into())
    }
}

/// Events of a known signature with everything decoding needs:
/// `(event, event name, topic1, input, data)`.
fn get_decodable<'e>(
    family: &dyn ContractFamily,
    event: &'e ProcessableEvent,
) -> Option<(&'e ProcessableEvent, &'static str, &'e str, &'e str, &'e str)> {
    let event_name = family.get_event_name(event.event.topic0.as_deref()?)?;

    Some((
        event,
        event_name,
        event.event.topic1.as_deref()?,
        event.input.as_deref()?,
        event.event.data.as_deref()?,
    ))
}
