use std::sync::Arc;

use ethers::prelude::Middleware;
use ethers::providers::{Http, Provider as EthersProvider, ProviderError as EthersProviderError};
use ethers::types::{
    Address, Block, Bytes, Filter, Log, Transaction, TransactionRequest, TxHash, U64,
};
use tokio::sync::mpsc;

use crate::config::ConfigError;

pub type ProviderError = EthersProviderError;

/// Chain access the indexer and processor need.
#[async_trait::async_trait]
pub trait Provider: Sync + Send {
    async fn get_block_number(&self) -> Result<U64, ProviderError>;
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError>;
    async fn get_block(&self, block_number: U64) -> Result<Block<TxHash>, ProviderError>;
    async fn get_transaction(&self, hash: TxHash) -> Result<Transaction, ProviderError>;
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError>;

    /// Push channel that yields whenever one of the addresses emits a log.
    /// Providers without push support return `None` and rely on ticks alone.
    async fn subscribe(&self, _addresses: &[Address]) -> Option<mpsc::Receiver<()>> {
        None
    }
}

#[async_trait::async_trait]
impl Provider for EthersProvider<Http> {
    async fn get_block_number(&self) -> Result<U64, ProviderError> {
        Middleware::get_block_number(self).await
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError> {
        Middleware::get_logs(self, filter).await
    }

    async fn get_block(&self, block_number: U64) -> Result<Block<TxHash>, ProviderError> {
        Middleware::get_block(self, block_number)
            .await?
            .ok_or_else(|| ProviderError::CustomError(format!("block {block_number} not found")))
    }

    async fn get_transaction(&self, hash: TxHash) -> Result<Transaction, ProviderError> {
        Middleware::get_transaction(self, hash)
            .await?
            .ok_or_else(|| ProviderError::CustomError(format!("transaction {hash:?} not found")))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
        let request = TransactionRequest::new().to(to).data(data);

        Middleware::call(self, &request.into(), None).await
    }
}

pub fn get(json_rpc_url: &str) -> Result<Arc<dyn Provider>, ConfigError> {
    let provider = EthersProvider::<Http>::try_from(json_rpc_url)
        .map_err(|_| ConfigError::InvalidJsonRpcUrl(json_rpc_url.to_owned()))?;

    Ok(Arc::new(provider))
}
