use std::str::FromStr;

use derive_more::Display;
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::config::ContractConfig;

/// Drives which decode path applies to a contract's logs.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContractType {
    #[display("payment-gateway")]
    #[serde(alias = "fcfs", alias = "sqrp-gated", alias = "white-list")]
    PaymentGateway,
    #[display("vesting")]
    Vesting,
    #[display("pro-rata")]
    #[serde(alias = "pro-rata-sqrp-gated")]
    ProRata,
}

impl ContractType {
    pub const ALL: [ContractType; 3] = [
        ContractType::PaymentGateway,
        ContractType::Vesting,
        ContractType::ProRata,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnsavedContract {
    pub network_id: i32,
    pub address: String,
    pub contract_type: ContractType,
    pub name: Option<String>,
    pub start_block_number: u64,
    pub disable: bool,
}

impl UnsavedContract {
    pub fn new(network_id: i32, config: &ContractConfig) -> Self {
        Self {
            network_id,
            address: config.address.to_lowercase(),
            contract_type: config.contract_type,
            name: config.name.clone(),
            start_block_number: config.block_number,
            disable: config.disable,
        }
    }
}

/// A monitored contract and its two checkpoints.
///
/// `sync_block_number` is the exclusive upper bound of fetched raw logs and
/// `process_block_number` the exclusive upper bound of decoded ones, so
/// `process_block_number <= sync_block_number` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: i32,
    pub network_id: i32,
    pub address: String,
    pub contract_type: ContractType,
    pub name: Option<String>,
    pub sync_block_number: u64,
    pub process_block_number: u64,
    pub disable: bool,
}

impl Contract {
    pub fn get_address(&self) -> Option<Address> {
        Address::from_str(&self.address).ok()
    }

    pub fn is_active(&self) -> bool {
        !self.disable
    }

    /// Inclusive block range that still has to be decoded, if any.
    pub fn get_unprocessed_range(&self) -> Option<(u64, u64)> {
        if self.process_block_number < self.sync_block_number {
            Some((self.process_block_number, self.sync_block_number - 1))
        } else {
            None
        }
    }

    pub fn get_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(sync_block_number: u64, process_block_number: u64) -> Contract {
        Contract {
            id: 1,
            network_id: 1,
            address: "0x0000000000000000000000000000000000000abc".to_owned(),
            contract_type: ContractType::Vesting,
            name: None,
            sync_block_number,
            process_block_number,
            disable: false,
        }
    }

    #[test]
    fn unprocessed_range_stops_before_sync_block_number() {
        assert_eq!(contract(500, 300).get_unprocessed_range(), Some((300, 499)));
        assert_eq!(contract(500, 500).get_unprocessed_range(), None);
    }

    #[test]
    fn unsaved_contracts_lowercase_addresses() {
        let config = ContractConfig::new(
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            ContractType::PaymentGateway,
            7,
        );
        let unsaved = UnsavedContract::new(3, &config);

        assert_eq!(unsaved.address, "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
        assert_eq!(unsaved.start_block_number, 7);
    }

    #[test]
    fn contract_types_display_as_kebab_case() {
        assert_eq!(ContractType::ProRata.to_string(), "pro-rata");
        assert_eq!(
            serde_json::to_value(ContractType::PaymentGateway).unwrap(),
            serde_json::json!("payment-gateway")
        );
    }
}
