use ethers::types::{Block, Log, Transaction, TxHash};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contracts::Contract;
use crate::hashes::Hashes;

/// One on-chain log as fetched from the provider. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: Uuid,
    pub network_id: i32,
    pub contract_id: i32,
    pub contract_address: String,
    pub transaction_hash: String,
    pub block_number: u64,
    pub log_index: u64,
    pub topic0: Option<String>,
    pub topic1: Option<String>,
    pub topic2: Option<String>,
    pub topic3: Option<String>,
    pub data: Option<String>,
}

impl RawEvent {
    /// Pending logs carry no block or transaction yet and are skipped.
    pub fn new(log: &Log, contract: &Contract) -> Option<Self> {
        let block_number = log.block_number?.as_u64();
        let transaction_hash = log.transaction_hash?;
        let topic = |index: usize| log.topics.get(index).map(Hashes::h256_to_string);

        Some(Self {
            id: Uuid::new_v4(),
            network_id: contract.network_id,
            contract_id: contract.id,
            contract_address: contract.address.clone(),
            transaction_hash: Hashes::h256_to_string(&transaction_hash),
            block_number,
            log_index: log.log_index.map(|i| i.as_u64()).unwrap_or_default(),
            topic0: topic(0),
            topic1: topic(1),
            topic2: topic(2),
            topic3: topic(3),
            data: Some(Hashes::bytes_to_string(&log.data)).filter(|data| data != "0x"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub network_id: i32,
    pub hash: String,
    pub block_number: u64,
    pub from: Option<String>,
    pub to: Option<String>,
    pub input: Option<String>,
}

impl RawTransaction {
    pub fn new(transaction: &Transaction, network_id: i32, block_number: u64) -> Self {
        Self {
            network_id,
            hash: Hashes::h256_to_string(&transaction.hash),
            block_number: transaction.block_number.map(|n| n.as_u64()).unwrap_or(block_number),
            from: Some(Hashes::h160_to_string(&transaction.from)),
            to: transaction.to.as_ref().map(Hashes::h160_to_string),
            input: Some(Hashes::bytes_to_string(&transaction.input)).filter(|i| i != "0x"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBlock {
    pub network_id: i32,
    pub number: u64,
    pub hash: Option<String>,
    pub timestamp: i64,
}

impl RawBlock {
    pub fn new(block: &Block<TxHash>, network_id: i32, number: u64) -> Self {
        Self {
            network_id,
            number,
            hash: block.hash.as_ref().map(Hashes::h256_to_string),
            timestamp: block.timestamp.as_u64() as i64,
        }
    }
}

/// Everything fetched for one contract range, stored atomically together with
/// the contract's new sync checkpoint.
#[derive(Debug, Clone, Default)]
pub struct RawBatch {
    pub blocks: Vec<RawBlock>,
    pub transactions: Vec<RawTransaction>,
    pub events: Vec<RawEvent>,
}

/// A stored raw event joined with what decoding needs from its transaction
/// and block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessableEvent {
    #[serde(flatten)]
    pub event: RawEvent,
    pub input: Option<String>,
    pub block_timestamp: Option<i64>,
}
