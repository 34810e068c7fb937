use std::collections::HashSet;
use std::fmt::Debug;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::accounts::Account;
use crate::contracts::{Contract, UnsavedContract};
use crate::events::{ProcessableEvent, RawBlock, RawEvent, RawTransaction};
use crate::networks::Network;
use crate::transaction_items::{TransactionItem, TransactionItemCounts};

#[derive(Debug, Display, Clone, PartialEq)]
pub enum RepoError {
    NotConnected,
    Unknown(String),
}

impl std::error::Error for RepoError {}

/// A contract row as reported by the db worker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRowStats {
    pub address: String,
    pub name: Option<String>,
    pub sync_block_number: u64,
    pub process_block_number: u64,
    pub disable: bool,
}

impl From<&Contract> for ContractRowStats {
    fn from(contract: &Contract) -> Self {
        Self {
            address: contract.address.clone(),
            name: contract.name.clone(),
            sync_block_number: contract.sync_block_number,
            process_block_number: contract.process_block_number,
            disable: contract.disable,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRowCounts {
    pub contracts: Vec<ContractRowStats>,
    pub raw_blocks: u64,
    pub raw_transactions: u64,
    pub raw_events: u64,
    pub accounts: u64,
    pub transaction_items: TransactionItemCounts,
}

/// Storage operations, available on plain and transactional clients alike.
#[async_trait::async_trait]
pub trait RepoClient: Send + Sync {
    async fn migrate(&self) -> Result<(), RepoError>;

    async fn load_network(&self, name: &str) -> Result<Option<Network>, RepoError>;
    async fn create_network(&self, name: &str) -> Result<Network, RepoError>;

    async fn count_contracts(&self) -> Result<u64, RepoError>;
    async fn create_contract(&self, contract: &UnsavedContract) -> Result<Contract, RepoError>;
    /// Every contract of the network, disabled ones included, ordered by id.
    async fn load_contracts(&self, network_id: i32) -> Result<Vec<Contract>, RepoError>;
    async fn load_contract(&self, contract_id: i32) -> Result<Option<Contract>, RepoError>;
    async fn update_sync_block_number(
        &self,
        contract_id: i32,
        block_number: u64,
    ) -> Result<(), RepoError>;
    async fn update_process_block_number(
        &self,
        contract_id: i32,
        block_number: u64,
    ) -> Result<(), RepoError>;

    async fn load_raw_block_numbers(
        &self,
        network_id: i32,
        block_numbers: &[u64],
    ) -> Result<HashSet<u64>, RepoError>;
    async fn load_raw_transaction_hashes(
        &self,
        network_id: i32,
        hashes: &[String],
    ) -> Result<HashSet<String>, RepoError>;
    /// Already stored rows are left untouched.
    async fn create_raw_blocks(&self, blocks: &[RawBlock]) -> Result<(), RepoError>;
    async fn create_raw_transactions(&self, transactions: &[RawTransaction])
        -> Result<(), RepoError>;
    async fn create_raw_events(&self, events: &[RawEvent]) -> Result<(), RepoError>;
    /// Raw events of a contract within `[from, to]`, in chain order.
    async fn load_processable_events(
        &self,
        contract_id: i32,
        from: u64,
        to: u64,
    ) -> Result<Vec<ProcessableEvent>, RepoError>;

    async fn load_account(&self, address: &str) -> Result<Option<Account>, RepoError>;
    /// Returns the stored account when the address already exists.
    async fn create_account(&self, address: &str) -> Result<Account, RepoError>;
    async fn create_transaction_item(&self, item: &TransactionItem) -> Result<(), RepoError>;

    async fn count_rows(&self, network_id: i32) -> Result<TableRowCounts, RepoError>;

    /// Drops decoded data and accounts and rewinds every process checkpoint.
    async fn soft_reset(&self) -> Result<(), RepoError>;
    /// Drops everything, networks and contracts included.
    async fn hard_reset(&self) -> Result<(), RepoError>;
}

#[async_trait::async_trait]
pub trait Repo: Sync + Send + Clone + Debug + 'static {
    type Client: RepoClient;
    type TxnClient<'a>: RepoClient;

    async fn get_client(&self) -> Result<Self::Client, RepoError>;
    async fn get_txn_client<'a>(
        client: &'a mut Self::Client,
    ) -> Result<Self::TxnClient<'a>, RepoError>;
    async fn commit_txn<'a>(txn_client: Self::TxnClient<'a>) -> Result<(), RepoError>;
}

pub struct SQLikeMigrations;

impl SQLikeMigrations {
    pub fn create_networks() -> &'static [&'static str] {
        &["CREATE TABLE IF NOT EXISTS networks (
                id SERIAL PRIMARY KEY,
                name VARCHAR NOT NULL UNIQUE
        )"]
    }

    pub fn create_contracts() -> &'static [&'static str] {
        &[
            "CREATE TABLE IF NOT EXISTS contracts (
                id SERIAL PRIMARY KEY,
                network_id INTEGER NOT NULL,
                address VARCHAR NOT NULL,
                contract_type VARCHAR NOT NULL,
                name VARCHAR,
                sync_block_number BIGINT NOT NULL,
                process_block_number BIGINT NOT NULL,
                disable BOOLEAN NOT NULL DEFAULT FALSE
        )",
            "CREATE UNIQUE INDEX IF NOT EXISTS contracts_network_address_index
        ON contracts(network_id, address)",
        ]
    }

    pub fn create_raw_blocks() -> &'static [&'static str] {
        &[
            "CREATE TABLE IF NOT EXISTS raw_blocks (
                network_id INTEGER NOT NULL,
                number BIGINT NOT NULL,
                hash VARCHAR,
                timestamp BIGINT NOT NULL,
                PRIMARY KEY (network_id, number)
        )",
        ]
    }

    pub fn create_raw_transactions() -> &'static [&'static str] {
        &[
            "CREATE TABLE IF NOT EXISTS raw_transactions (
                network_id INTEGER NOT NULL,
                hash VARCHAR NOT NULL,
                block_number BIGINT NOT NULL,
                \"from\" VARCHAR,
                \"to\" VARCHAR,
                input TEXT,
                PRIMARY KEY (network_id, hash)
        )",
        ]
    }

    pub fn create_raw_events() -> &'static [&'static str] {
        &[
            "CREATE TABLE IF NOT EXISTS raw_events (
                id uuid PRIMARY KEY,
                network_id INTEGER NOT NULL,
                contract_id INTEGER NOT NULL,
                contract_address VARCHAR NOT NULL,
                transaction_hash VARCHAR NOT NULL,
                block_number BIGINT NOT NULL,
                log_index BIGINT NOT NULL,
                topic0 VARCHAR,
                topic1 VARCHAR,
                topic2 VARCHAR,
                topic3 VARCHAR,
                data TEXT,
                inserted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
            "CREATE UNIQUE INDEX IF NOT EXISTS raw_events_network_transaction_log_index
        ON raw_events(network_id, transaction_hash, log_index)",
            "CREATE INDEX IF NOT EXISTS raw_events_contract_block_number
        ON raw_events(contract_id, block_number, log_index)",
        ]
    }

    pub fn create_accounts() -> &'static [&'static str] {
        &["CREATE TABLE IF NOT EXISTS accounts (
                id SERIAL PRIMARY KEY,
                address VARCHAR NOT NULL UNIQUE
        )"]
    }

    pub fn create_transaction_items() -> &'static [&'static str] {
        &[
            "CREATE TABLE IF NOT EXISTS payment_gateway_transaction_items (
                id SERIAL PRIMARY KEY,
                network_id INTEGER NOT NULL,
                contract_id INTEGER NOT NULL,
                raw_event_id uuid NOT NULL,
                transaction_hash VARCHAR NOT NULL,
                block_number BIGINT NOT NULL,
                account_id INTEGER NOT NULL,
                account VARCHAR NOT NULL,
                amount DOUBLE PRECISION NOT NULL,
                user_id VARCHAR NOT NULL,
                transaction_id VARCHAR NOT NULL,
                is_sig BOOLEAN NOT NULL,
                timestamp BIGINT NOT NULL
        )",
            "CREATE TABLE IF NOT EXISTS vesting_transaction_items (
                id SERIAL PRIMARY KEY,
                network_id INTEGER NOT NULL,
                contract_id INTEGER NOT NULL,
                raw_event_id uuid NOT NULL,
                transaction_hash VARCHAR NOT NULL,
                block_number BIGINT NOT NULL,
                kind VARCHAR NOT NULL,
                account_id INTEGER NOT NULL,
                account VARCHAR NOT NULL,
                amount DOUBLE PRECISION NOT NULL,
                timestamp BIGINT NOT NULL
        )",
            "CREATE TABLE IF NOT EXISTS pro_rata_transaction_items (
                id SERIAL PRIMARY KEY,
                network_id INTEGER NOT NULL,
                contract_id INTEGER NOT NULL,
                raw_event_id uuid NOT NULL,
                transaction_hash VARCHAR NOT NULL,
                block_number BIGINT NOT NULL,
                kind VARCHAR NOT NULL,
                account_id INTEGER NOT NULL,
                account VARCHAR NOT NULL,
                amount DOUBLE PRECISION NOT NULL,
                transaction_id VARCHAR,
                is_sig BOOLEAN,
                timestamp BIGINT NOT NULL
        )",
        ]
    }

    pub fn get_internal_migrations() -> Vec<&'static str> {
        [
            Self::create_networks(),
            Self::create_contracts(),
            Self::create_raw_blocks(),
            Self::create_raw_transactions(),
            Self::create_raw_events(),
            Self::create_accounts(),
            Self::create_transaction_items(),
        ]
        .concat()
    }

    pub fn truncate_transaction_items() -> &'static [&'static str] {
        &[
            "TRUNCATE payment_gateway_transaction_items, vesting_transaction_items, pro_rata_transaction_items, accounts RESTART IDENTITY",
            "UPDATE contracts SET process_block_number = 0",
        ]
    }

    pub fn truncate_all() -> &'static [&'static str] {
        &[
            "TRUNCATE payment_gateway_transaction_items, vesting_transaction_items, pro_rata_transaction_items, accounts, raw_events, raw_transactions, raw_blocks, contracts, networks RESTART IDENTITY",
        ]
    }
}
