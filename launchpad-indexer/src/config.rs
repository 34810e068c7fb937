mod error;

use std::collections::HashSet;
use std::time::Duration;

use ethers::types::Address;
use serde::Deserialize;

use crate::contracts::ContractType;

pub use error::ConfigError;

/// A contract to monitor on one network.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContractConfig {
    pub address: String,
    #[serde(rename = "type")]
    pub contract_type: ContractType,
    /// Deployment block, where both checkpoints start.
    #[serde(default)]
    pub block_number: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub disable: bool,
}

impl ContractConfig {
    pub fn new(address: &str, contract_type: ContractType, block_number: u64) -> Self {
        Self {
            address: address.to_owned(),
            contract_type,
            block_number,
            name: None,
            disable: false,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());

        self
    }

    pub fn disabled(mut self) -> Self {
        self.disable = true;

        self
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TickDividers {
    pub indexer: u64,
    pub db: u64,
    pub monitoring: u64,
}

impl Default for TickDividers {
    fn default() -> Self {
        Self {
            indexer: 5,
            db: 1,
            monitoring: 1,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub name: String,
    pub json_rpc_url: String,
    #[serde(default)]
    pub contracts: Vec<ContractConfig>,
    #[serde(default = "default_block_number_range")]
    pub block_number_range: u64,
    #[serde(default = "default_block_number_offset")]
    pub block_number_offset: u64,
    /// Zero turns chain-head filtering off.
    #[serde(default)]
    pub block_number_filter_size: usize,
    #[serde(default)]
    pub tick_dividers: TickDividers,
}

fn default_block_number_range() -> u64 {
    2_000
}

fn default_block_number_offset() -> u64 {
    10
}

impl NetworkConfig {
    pub fn new(name: &str, json_rpc_url: &str) -> Self {
        Self {
            name: name.to_owned(),
            json_rpc_url: json_rpc_url.to_owned(),
            contracts: vec![],
            block_number_range: default_block_number_range(),
            block_number_offset: default_block_number_offset(),
            block_number_filter_size: 0,
            tick_dividers: TickDividers::default(),
        }
    }

    pub fn add_contract(mut self, contract: ContractConfig) -> Self {
        self.contracts.push(contract);

        self
    }

    pub fn with_block_number_range(mut self, block_number_range: u64) -> Self {
        self.block_number_range = block_number_range;

        self
    }

    pub fn with_block_number_offset(mut self, block_number_offset: u64) -> Self {
        self.block_number_offset = block_number_offset;

        self
    }

    pub fn with_block_number_filter_size(mut self, block_number_filter_size: usize) -> Self {
        self.block_number_filter_size = block_number_filter_size;

        self
    }

    pub fn with_tick_dividers(mut self, tick_dividers: TickDividers) -> Self {
        self.tick_dividers = tick_dividers;

        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.block_number_range == 0 {
            return Err(ConfigError::ZeroBlockNumberRange(self.name.clone()));
        }

        let TickDividers {
            indexer,
            db,
            monitoring,
        } = self.tick_dividers;
        if indexer == 0 || db == 0 || monitoring == 0 {
            return Err(ConfigError::ZeroTickDivider(self.name.clone()));
        }

        let mut addresses = HashSet::new();
        for contract in &self.contracts {
            if contract.address.parse::<Address>().is_err() {
                return Err(ConfigError::InvalidAddress(contract.address.clone()));
            }

            if !addresses.insert(contract.address.to_lowercase()) {
                return Err(ConfigError::DuplicateContract {
                    network: self.name.clone(),
                    address: contract.address.clone(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub networks: Vec<NetworkConfig>,
    pub indexer_concurrency: usize,
    pub db_concurrency: usize,
    pub rpc_timeout_ms: u64,
    pub repo_timeout_ms: u64,
    /// Base cadence of the scheduler; a worker runs every `divider` ticks.
    pub tick_interval_ms: u64,
    /// Window over which monitoring speeds are measured.
    pub speed_window_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            networks: vec![],
            indexer_concurrency: 5,
            db_concurrency: 5,
            rpc_timeout_ms: 15_000,
            repo_timeout_ms: 30_000,
            tick_interval_ms: 5_000,
            speed_window_ms: 60_000,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_network(mut self, network: NetworkConfig) -> Self {
        self.networks.push(network);

        self
    }

    pub fn with_indexer_concurrency(mut self, indexer_concurrency: usize) -> Self {
        self.indexer_concurrency = indexer_concurrency;

        self
    }

    pub fn with_db_concurrency(mut self, db_concurrency: usize) -> Self {
        self.db_concurrency = db_concurrency;

        self
    }

    pub fn with_rpc_timeout_ms(mut self, rpc_timeout_ms: u64) -> Self {
        self.rpc_timeout_ms = rpc_timeout_ms;

        self
    }

    pub fn with_repo_timeout_ms(mut self, repo_timeout_ms: u64) -> Self {
        self.repo_timeout_ms = repo_timeout_ms;

        self
    }

    pub fn with_tick_interval_ms(mut self, tick_interval_ms: u64) -> Self {
        self.tick_interval_ms = tick_interval_ms;

        self
    }

    pub fn with_speed_window_ms(mut self, speed_window_ms: u64) -> Self {
        self.speed_window_ms = speed_window_ms;

        self
    }

    pub fn get_network(&self, name: &str) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.name == name)
    }

    pub fn get_rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn get_repo_timeout(&self) -> Duration {
        Duration::from_millis(self.repo_timeout_ms)
    }

    pub fn get_tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn get_speed_window(&self) -> Duration {
        Duration::from_millis(self.speed_window_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.networks.is_empty() {
            return Err(ConfigError::NoNetwork);
        }

        let mut names = HashSet::new();
        for network in &self.networks {
            if !names.insert(network.name.as_str()) {
                return Err(ConfigError::DuplicateNetwork(network.name.clone()));
            }

            network.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    fn network() -> NetworkConfig {
        NetworkConfig::new("bsc", "http://localhost:8545")
            .add_contract(ContractConfig::new(ADDRESS, ContractType::PaymentGateway, 100))
    }

    #[test]
    fn requires_a_network() {
        assert!(matches!(Config::new().validate(), Err(ConfigError::NoNetwork)));
    }

    #[test]
    fn rejects_duplicate_networks() {
        let config = Config::new().add_network(network()).add_network(network());

        assert!(matches!(config.validate(), Err(ConfigError::DuplicateNetwork(_))));
    }

    #[test]
    fn rejects_duplicate_contracts_regardless_of_case() {
        let network = network().add_contract(ContractConfig::new(
            &ADDRESS.to_lowercase(),
            ContractType::Vesting,
            1,
        ));

        assert!(matches!(
            Config::new().add_network(network).validate(),
            Err(ConfigError::DuplicateContract { .. })
        ));
    }

    #[test]
    fn rejects_zero_dividers() {
        let network = network().with_tick_dividers(TickDividers {
            indexer: 0,
            ..Default::default()
        });

        assert!(matches!(
            Config::new().add_network(network).validate(),
            Err(ConfigError::ZeroTickDivider(_))
        ));
    }

    #[test]
    fn deserializes_networks_with_defaults() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "networks": [{
                "name": "bsc",
                "jsonRpcUrl": "http://localhost:8545",
                "contracts": [
                    { "address": ADDRESS, "type": "fcfs", "blockNumber": 100 },
                    { "address": "0x0000000000000000000000000000000000000001", "type": "pro-rata-sqrp-gated", "disable": true }
                ]
            }],
            "indexerConcurrency": 2
        }))
        .unwrap();

        assert_eq!(config.indexer_concurrency, 2);
        assert_eq!(config.db_concurrency, 5);

        let network = config.get_network("bsc").unwrap();
        assert_eq!(network.block_number_range, 2_000);
        assert_eq!(network.block_number_offset, 10);
        assert_eq!(network.tick_dividers, TickDividers::default());
        assert_eq!(network.contracts[0].contract_type, ContractType::PaymentGateway);
        assert_eq!(network.contracts[1].contract_type, ContractType::ProRata);
        assert!(network.contracts[1].disable);
        assert!(config.validate().is_ok());
    }
}
