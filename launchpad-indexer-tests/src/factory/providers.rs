use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use ethers::abi::Token;
use ethers::providers::ProviderError;
use ethers::types::{Address, Block, Bytes, Filter, Log, Transaction, TxHash, ValueOrArray, U64};
use launchpad_indexer::families::TOKEN_ABI;
use launchpad_indexer::Provider;

use super::{address, TOKEN_ADDRESS};

/// In-memory chain with recorded requests.
///
/// Chain head readings are served from a script; the last reading repeats once
/// the script runs out. Logs are answered per filter address and block range.
pub struct ScriptedProvider {
    block_numbers: Mutex<VecDeque<u64>>,
    logs: Mutex<Vec<Log>>,
    transactions: Mutex<HashMap<TxHash, Transaction>>,
    decimals: u8,
    failing_addresses: Mutex<HashSet<Address>>,
    log_requests: Mutex<Vec<(Address, u64, u64)>>,
    calls: Mutex<Vec<(Address, String)>>,
}

impl ScriptedProvider {
    pub fn new(block_number: u64) -> Self {
        Self::with_block_numbers(&[block_number])
    }

    pub fn with_block_numbers(block_numbers: &[u64]) -> Self {
        Self {
            block_numbers: Mutex::new(block_numbers.iter().copied().collect()),
            logs: Mutex::new(vec![]),
            transactions: Mutex::new(HashMap::new()),
            decimals: 18,
            failing_addresses: Mutex::new(HashSet::new()),
            log_requests: Mutex::new(vec![]),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn add_log(&self, log: Log, transaction: Transaction) {
        self.logs.lock().unwrap().push(log);
        self.transactions.lock().unwrap().insert(transaction.hash, transaction);
    }

    pub fn set_block_number(&self, block_number: u64) {
        *self.block_numbers.lock().unwrap() = VecDeque::from([block_number]);
    }

    pub fn fail_logs_for(&self, contract: &str) {
        self.failing_addresses.lock().unwrap().insert(address(contract));
    }

    pub fn heal(&self) {
        self.failing_addresses.lock().unwrap().clear();
    }

    /// Inclusive `[from, to]` bounds of every `get_logs` request, per address.
    pub fn get_log_requests(&self, contract: &str) -> Vec<(u64, u64)> {
        let contract = address(contract);

        self.log_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(address, _, _)| *address == contract)
            .map(|(_, from, to)| (*from, *to))
            .collect()
    }

    pub fn get_calls(&self) -> Vec<(Address, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn get_filter_address(filter: &Filter) -> Option<Address> {
        match filter.address.as_ref()? {
            ValueOrArray::Value(address) => Some(*address),
            ValueOrArray::Array(addresses) => addresses.first().copied(),
        }
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    async fn get_block_number(&self) -> Result<U64, ProviderError> {
        let mut block_numbers = self.block_numbers.lock().unwrap();
        let block_number = if block_numbers.len() > 1 {
            block_numbers.pop_front()
        } else {
            block_numbers.front().copied()
        };

        Ok(U64::from(block_number.unwrap_or_default()))
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError> {
        let contract = Self::get_filter_address(filter)
            .ok_or_else(|| ProviderError::CustomError("filter without address".to_owned()))?;
        let from = filter.get_from_block().unwrap_or_default().as_u64();
        let to = filter.get_to_block().unwrap_or_default().as_u64();

        self.log_requests.lock().unwrap().push((contract, from, to));

        if self.failing_addresses.lock().unwrap().contains(&contract) {
            return Err(ProviderError::CustomError("rate limited".to_owned()));
        }

        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| log.address == contract)
            .filter(|log| log.block_number.is_some_and(|n| (from..=to).contains(&n.as_u64())))
            .cloned()
            .collect())
    }

    async fn get_block(&self, block_number: U64) -> Result<Block<TxHash>, ProviderError> {
        Ok(Block {
            number: Some(block_number),
            timestamp: (1_700_000_000 + block_number.as_u64() * 3).into(),
            ..Default::default()
        })
    }

    async fn get_transaction(&self, hash: TxHash) -> Result<Transaction, ProviderError> {
        self.transactions
            .lock()
            .unwrap()
            .get(&hash)
            .cloned()
            .ok_or_else(|| ProviderError::CustomError(format!("transaction {hash:?} not found")))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
        let function = TOKEN_ABI
            .functions()
            .find(|f| data.starts_with(&f.short_signature()))
            .ok_or_else(|| ProviderError::CustomError("unknown call".to_owned()))?;

        self.calls.lock().unwrap().push((to, function.name.clone()));

        let output = match function.name.as_str() {
            "decimals" => Token::Uint(self.decimals.into()),
            _ => Token::Address(address(TOKEN_ADDRESS)),
        };

        Ok(Bytes::from(ethers::abi::encode(&[output])))
    }
}
