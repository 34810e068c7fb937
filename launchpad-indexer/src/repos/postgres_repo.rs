mod raw_queries;

use std::collections::HashSet;

use tokio_postgres::{Client, NoTls, Transaction};
use tracing::error;

use crate::accounts::Account;
use crate::contracts::{Contract, UnsavedContract};
use crate::events::{ProcessableEvent, RawBlock, RawEvent, RawTransaction};
use crate::networks::Network;
use crate::transaction_items::TransactionItem;

use super::repo::{Repo, RepoClient, RepoError, TableRowCounts};

pub type PostgresRepoClient = Client;
pub type PostgresRepoTxnClient<'a> = Transaction<'a>;

/// Storage over tokio-postgres. Every client owns its own connection.
#[derive(Clone, Debug)]
pub struct PostgresRepo {
    url: String,
}

impl PostgresRepo {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Repo for PostgresRepo {
    type Client = Client;
    type TxnClient<'a> = Transaction<'a>;

    async fn get_client(&self) -> Result<Self::Client, RepoError> {
        let (client, conn) = tokio_postgres::connect(&self.url, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                error!(error = %e, "postgres connection error");
            }
        });

        Ok(client)
    }

    async fn get_txn_client<'a>(
        client: &'a mut Self::Client,
    ) -> Result<Self::TxnClient<'a>, RepoError> {
        Ok(client.transaction().await?)
    }

    async fn commit_txn<'a>(txn_client: Self::TxnClient<'a>) -> Result<(), RepoError> {
        Ok(txn_client.commit().await?)
    }
}

macro_rules! impl_repo_client {
    ($client:ty $(, $lifetime:lifetime)?) => {
        #[async_trait::async_trait]
        impl<$($lifetime)?> RepoClient for $client {
            async fn migrate(&self) -> Result<(), RepoError> {
                raw_queries::migrate(self).await
            }

            async fn load_network(&self, name: &str) -> Result<Option<Network>, RepoError> {
                raw_queries::load_network(self, name).await
            }

            async fn create_network(&self, name: &str) -> Result<Network, RepoError> {
                raw_queries::create_network(self, name).await
            }

            async fn count_contracts(&self) -> Result<u64, RepoError> {
                raw_queries::count_contracts(self).await
            }

            async fn create_contract(
                &self,
                contract: &UnsavedContract,
            ) -> Result<Contract, RepoError> {
                raw_queries::create_contract(self, contract).await
            }

            async fn load_contracts(&self, network_id: i32) -> Result<Vec<Contract>, RepoError> {
                raw_queries::load_contracts(self, network_id).await
            }

            async fn load_contract(&self, contract_id: i32) -> Result<Option<Contract>, RepoError> {
                raw_queries::load_contract(self, contract_id).await
            }

            async fn update_sync_block_number(
                &self,
                contract_id: i32,
                block_number: u64,
            ) -> Result<(), RepoError> {
                raw_queries::update_sync_block_number(self, contract_id, block_number).await
            }

            async fn update_process_block_number(
                &self,
                contract_id: i32,
                block_number: u64,
            ) -> Result<(), RepoError> {
                raw_queries::update_process_block_number(self, contract_id, block_number).await
            }

            async fn load_raw_block_numbers(
                &self,
                network_id: i32,
                block_numbers: &[u64],
            ) -> Result<HashSet<u64>, RepoError> {
                raw_queries::load_raw_block_numbers(self, network_id, block_numbers).await
            }

            async fn load_raw_transaction_hashes(
                &self,
                network_id: i32,
                hashes: &[String],
            ) -> Result<HashSet<String>, RepoError> {
                raw_queries::load_raw_transaction_hashes(self, network_id, hashes).await
            }

            async fn create_raw_blocks(&self, blocks: &[RawBlock]) -> Result<(), RepoError> {
                raw_queries::create_raw_blocks(self, blocks).await
            }

            async fn create_raw_transactions(
                &self,
                transactions: &[RawTransaction],
            ) -> Result<(), RepoError> {
                raw_queries::create_raw_transactions(self, transactions).await
            }

            async fn create_raw_events(&self, events: &[RawEvent]) -> Result<(), RepoError> {
                raw_queries::create_raw_events(self, events).await
            }

            async fn load_processable_events(
                &self,
                contract_id: i32,
                from: u64,
                to: u64,
            ) -> Result<Vec<ProcessableEvent>, RepoError> {
                raw_queries::load_processable_events(self, contract_id, from, to).await
            }

            async fn load_account(&self, address: &str) -> Result<Option<Account>, RepoError> {
                raw_queries::load_account(self, address).await
            }

            async fn create_account(&self, address: &str) -> Result<Account, RepoError> {
                raw_queries::create_account(self, address).await
            }

            async fn create_transaction_item(
                &self,
                item: &TransactionItem,
            ) -> Result<(), RepoError> {
                raw_queries::create_transaction_item(self, item).await
            }

            async fn count_rows(&self, network_id: i32) -> Result<TableRowCounts, RepoError> {
                raw_queries::count_rows(self, network_id).await
            }

            async fn soft_reset(&self) -> Result<(), RepoError> {
                raw_queries::soft_reset(self).await
            }

            async fn hard_reset(&self) -> Result<(), RepoError> {
                raw_queries::hard_reset(self).await
            }
        }
    };
}

impl_repo_client!(Client);
impl_repo_client!(Transaction<'a>, 'a);
