use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::accounts::Account;
use crate::contracts::{Contract, UnsavedContract};
use crate::events::{ProcessableEvent, RawBlock, RawEvent, RawTransaction};
use crate::networks::Network;
use crate::transaction_items::{TransactionItem, TransactionItemCounts};

use super::repo::{ContractRowStats, Repo, RepoClient, RepoError, TableRowCounts};

/// Whole storage state of a [`MemoryRepo`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    pub networks: Vec<Network>,
    pub contracts: Vec<Contract>,
    pub raw_blocks: Vec<RawBlock>,
    pub raw_transactions: Vec<RawTransaction>,
    pub raw_events: Vec<RawEvent>,
    pub accounts: Vec<Account>,
    pub transaction_items: Vec<TransactionItem>,
    next_network_id: i32,
    next_contract_id: i32,
    next_account_id: i32,
}

impl MemoryStore {
    fn load_network(&self, name: &str) -> Option<Network> {
        self.networks.iter().find(|n| n.name == name).cloned()
    }

    fn create_network(&mut self, name: &str) -> Network {
        if let Some(network) = self.load_network(name) {
            return network;
        }

        self.next_network_id += 1;
        let network = Network {
            id: self.next_network_id,
            name: name.to_owned(),
        };
        self.networks.push(network.clone());

        network
    }

    fn create_contract(&mut self, contract: &UnsavedContract) -> Result<Contract, RepoError> {
        let exists = self
            .contracts
            .iter()
            .any(|c| c.network_id == contract.network_id && c.address == contract.address);
        if exists {
            return Err(RepoError::Unknown(format!("{} already exists", contract.address)));
        }

        self.next_contract_id += 1;
        let contract = Contract {
            id: self.next_contract_id,
            network_id: contract.network_id,
            address: contract.address.clone(),
            contract_type: contract.contract_type,
            name: contract.name.clone(),
            sync_block_number: contract.start_block_number,
            process_block_number: contract.start_block_number,
            disable: contract.disable,
        };
        self.contracts.push(contract.clone());

        Ok(contract)
    }

    fn load_contracts(&self, network_id: i32) -> Vec<Contract> {
        let mut contracts: Vec<_> =
            self.contracts.iter().filter(|c| c.network_id == network_id).cloned().collect();
        contracts.sort_by_key(|c| c.id);

        contracts
    }

    fn update_contract(
        &mut self,
        contract_id: i32,
        update: impl FnOnce(&mut Contract),
    ) -> Result<(), RepoError> {
        match self.contracts.iter_mut().find(|c| c.id == contract_id) {
            Some(contract) => {
                update(contract);
                Ok(())
            }
            None => Err(RepoError::Unknown(format!("contract {contract_id} not found"))),
        }
    }

    fn create_raw_blocks(&mut self, blocks: &[RawBlock]) {
        for block in blocks {
            let exists = self
                .raw_blocks
                .iter()
                .any(|b| b.network_id == block.network_id && b.number == block.number);
            if !exists {
                self.raw_blocks.push(block.clone());
            }
        }
    }

    fn create_raw_transactions(&mut self, transactions: &[RawTransaction]) {
        for transaction in transactions {
            let exists = self
                .raw_transactions
                .iter()
                .any(|t| t.network_id == transaction.network_id && t.hash == transaction.hash);
            if !exists {
                self.raw_transactions.push(transaction.clone());
            }
        }
    }

    fn create_raw_events(&mut self, events: &[RawEvent]) {
        for event in events {
            let exists = self.raw_events.iter().any(|e| {
                e.network_id == event.network_id
                    && e.transaction_hash == event.transaction_hash
                    && e.log_index == event.log_index
            });
            if !exists {
                self.raw_events.push(event.clone());
            }
        }
    }

    fn load_processable_events(&self, contract_id: i32, from: u64, to: u64) -> Vec<ProcessableEvent> {
        let mut events: Vec<_> = self
            .raw_events
            .iter()
            .filter(|e| e.contract_id == contract_id && (from..=to).contains(&e.block_number))
            .map(|event| ProcessableEvent {
                input: self
                    .raw_transactions
                    .iter()
                    .find(|t| t.network_id == event.network_id && t.hash == event.transaction_hash)
                    .and_then(|t| t.input.clone()),
                block_timestamp: self
                    .raw_blocks
                    .iter()
                    .find(|b| b.network_id == event.network_id && b.number == event.block_number)
                    .map(|b| b.timestamp),
                event: event.clone(),
            })
            .collect();
        events.sort_by_key(|e| (e.event.block_number, e.event.log_index));

        events
    }

    fn load_account(&self, address: &str) -> Option<Account> {
        self.accounts.iter().find(|a| a.address == address).cloned()
    }

    fn create_account(&mut self, address: &str) -> Account {
        if let Some(account) = self.load_account(address) {
            return account;
        }

        self.next_account_id += 1;
        let account = Account {
            id: self.next_account_id,
            address: address.to_owned(),
        };
        self.accounts.push(account.clone());

        account
    }

    fn count_rows(&self, network_id: i32) -> TableRowCounts {
        let count_items = |matches: fn(&TransactionItem) -> bool| {
            self.transaction_items
                .iter()
                .filter(|item| item.get_source().network_id == network_id && matches(item))
                .count() as u64
        };

        TableRowCounts {
            contracts: self.load_contracts(network_id).iter().map(ContractRowStats::from).collect(),
            raw_blocks: self.raw_blocks.iter().filter(|b| b.network_id == network_id).count()
                as u64,
            raw_transactions: self
                .raw_transactions
                .iter()
                .filter(|t| t.network_id == network_id)
                .count() as u64,
            raw_events: self.raw_events.iter().filter(|e| e.network_id == network_id).count()
                as u64,
            accounts: self.accounts.len() as u64,
            transaction_items: TransactionItemCounts {
                payment_gateway: count_items(|i| matches!(i, TransactionItem::PaymentGateway(_))),
                vesting: count_items(|i| matches!(i, TransactionItem::Vesting(_))),
                pro_rata: count_items(|i| matches!(i, TransactionItem::ProRata(_))),
            },
        }
    }

    fn soft_reset(&mut self) {
        self.transaction_items.clear();
        self.accounts.clear();
        self.next_account_id = 0;
        for contract in &mut self.contracts {
            contract.process_block_number = 0;
        }
    }

    fn hard_reset(&mut self) {
        *self = Self::default();
    }
}

/// In-process storage. A transaction holds the store exclusively and works on
/// a copy that replaces the store on commit; dropping it discards the copy.
#[derive(Clone, Debug, Default)]
pub struct MemoryRepo {
    store: Arc<Mutex<MemoryStore>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the committed state.
    pub async fn snapshot(&self) -> MemoryStore {
        self.store.lock().await.clone()
    }
}

#[derive(Clone, Debug)]
pub struct MemoryRepoClient {
    store: Arc<Mutex<MemoryStore>>,
}

pub struct MemoryRepoTxnClient<'a> {
    committed: OwnedMutexGuard<MemoryStore>,
    working: Mutex<MemoryStore>,
    _client: PhantomData<&'a mut MemoryRepoClient>,
}

#[async_trait::async_trait]
impl Repo for MemoryRepo {
    type Client = MemoryRepoClient;
    type TxnClient<'a> = MemoryRepoTxnClient<'a>;

    async fn get_client(&self) -> Result<Self::Client, RepoError> {
        Ok(MemoryRepoClient {
            store: self.store.clone(),
        })
    }

    async fn get_txn_client<'a>(
        client: &'a mut Self::Client,
    ) -> Result<Self::TxnClient<'a>, RepoError> {
        let committed = client.store.clone().lock_owned().await;
        let working = Mutex::new(committed.clone());

        Ok(MemoryRepoTxnClient {
            committed,
            working,
            _client: PhantomData,
        })
    }

    async fn commit_txn<'a>(txn_client: Self::TxnClient<'a>) -> Result<(), RepoError> {
        let MemoryRepoTxnClient {
            mut committed,
            working,
            ..
        } = txn_client;
        *committed = working.into_inner();

        Ok(())
    }
}

macro_rules! impl_repo_client {
    ($client:ty, $store:ident $(, $lifetime:lifetime)?) => {
        #[async_trait::async_trait]
        impl<$($lifetime)?> RepoClient for $client {
            async fn migrate(&self) -> Result<(), RepoError> {
                Ok(())
            }

            async fn load_network(&self, name: &str) -> Result<Option<Network>, RepoError> {
                Ok(self.$store.lock().await.load_network(name))
            }

            async fn create_network(&self, name: &str) -> Result<Network, RepoError> {
                Ok(self.$store.lock().await.create_network(name))
            }

            async fn count_contracts(&self) -> Result<u64, RepoError> {
                Ok(self.$store.lock().await.contracts.len() as u64)
            }

            async fn create_contract(
                &self,
                contract: &UnsavedContract,
            ) -> Result<Contract, RepoError> {
                self.$store.lock().await.create_contract(contract)
            }

            async fn load_contracts(&self, network_id: i32) -> Result<Vec<Contract>, RepoError> {
                Ok(self.$store.lock().await.load_contracts(network_id))
            }

            async fn load_contract(&self, contract_id: i32) -> Result<Option<Contract>, RepoError> {
                let store = self.$store.lock().await;

                Ok(store.contracts.iter().find(|c| c.id == contract_id).cloned())
            }

            async fn update_sync_block_number(
                &self,
                contract_id: i32,
                block_number: u64,
            ) -> Result<(), RepoError> {
                self.$store
                    .lock()
                    .await
                    .update_contract(contract_id, |c| c.sync_block_number = block_number)
            }

            async fn update_process_block_number(
                &self,
                contract_id: i32,
                block_number: u64,
            ) -> Result<(), RepoError> {
                self.$store
                    .lock()
                    .await
                    .update_contract(contract_id, |c| c.process_block_number = block_number)
            }

            async fn load_raw_block_numbers(
                &self,
                network_id: i32,
                block_numbers: &[u64],
            ) -> Result<HashSet<u64>, RepoError> {
                let store = self.$store.lock().await;

                Ok(store
                    .raw_blocks
                    .iter()
                    .filter(|b| b.network_id == network_id && block_numbers.contains(&b.number))
                    .map(|b| b.number)
                    .collect())
            }

            async fn load_raw_transaction_hashes(
                &self,
                network_id: i32,
                hashes: &[String],
            ) -> Result<HashSet<String>, RepoError> {
                let store = self.$store.lock().await;

                Ok(store
                    .raw_transactions
                    .iter()
                    .filter(|t| t.network_id == network_id && hashes.contains(&t.hash))
                    .map(|t| t.hash.clone())
                    .collect())
            }

            async fn create_raw_blocks(&self, blocks: &[RawBlock]) -> Result<(), RepoError> {
                self.$store.lock().await.create_raw_blocks(blocks);
                Ok(())
            }

            async fn create_raw_transactions(
                &self,
                transactions: &[RawTransaction],
            ) -> Result<(), RepoError> {
                self.$store.lock().await.create_raw_transactions(transactions);
                Ok(())
            }

            async fn create_raw_events(&self, events: &[RawEvent]) -> Result<(), RepoError> {
                self.$store.lock().await.create_raw_events(events);
                Ok(())
            }

            async fn load_processable_events(
                &self,
                contract_id: i32,
                from: u64,
                to: u64,
            ) -> Result<Vec<ProcessableEvent>, RepoError> {
                Ok(self.$store.lock().await.load_processable_events(contract_id, from, to))
            }

            async fn load_account(&self, address: &str) -> Result<Option<Account>, RepoError> {
                Ok(self.$store.lock().await.load_account(address))
            }

            async fn create_account(&self, address: &str) -> Result<Account, RepoError> {
                Ok(self.$store.lock().await.create_account(address))
            }

            async fn create_transaction_item(
                &self,
                item: &TransactionItem,
            ) -> Result<(), RepoError> {
                self.$store.lock().await.transaction_items.push(item.clone());
                Ok(())
            }

            async fn count_rows(&self, network_id: i32) -> Result<TableRowCounts, RepoError> {
                Ok(self.$store.lock().await.count_rows(network_id))
            }

            async fn soft_reset(&self) -> Result<(), RepoError> {
                self.$store.lock().await.soft_reset();
                Ok(())
            }

            async fn hard_reset(&self) -> Result<(), RepoError> {
                self.$store.lock().await.hard_reset();
                Ok(())
            }
        }
    };
}

impl_repo_client!(MemoryRepoClient, store);
impl_repo_client!(MemoryRepoTxnClient<'a>, working, 'a);
