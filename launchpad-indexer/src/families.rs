mod payment_gateway;
mod pro_rata;
mod vesting;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use ethers::abi::{parse_abi, Abi};
use ethers::types::H256;
use once_cell::sync::Lazy;

use crate::bus::BusEvent;
use crate::contracts::{Contract, ContractType};
use crate::decoding::{decode_uint, to_number_decimals, DecodeError};
use crate::events::ProcessableEvent;
use crate::transaction_items::{ItemSource, TransactionItem};

pub use payment_gateway::{PaymentGatewayFamily, PAYMENT_GATEWAY_ABIS};
pub use pro_rata::{ProRataFamily, PRO_RATA_ABIS};
pub use vesting::{VestingFamily, VESTING_ABIS};

/// Token lookups every family contract answers through one of its getters.
pub static TOKEN_ABI: Lazy<Abi> = Lazy::new(|| {
    parse_abi(&[
        "function erc20Token() view returns (address)",
        "function baseToken() view returns (address)",
        "function decimals() view returns (uint8)",
    ])
    .expect("token ABI is static")
});

/// What a family needs to turn one raw event into an item.
pub struct DecodeContext<'a> {
    pub network: &'a str,
    pub contract: &'a Contract,
    pub event: &'a ProcessableEvent,
    pub event_name: &'static str,
    pub account: String,
    pub input: Vec<u8>,
    pub data: &'a str,
    pub decimals: u32,
}

impl DecodeContext<'_> {
    pub fn get_source(&self) -> ItemSource {
        ItemSource {
            network_id: self.contract.network_id,
            contract_id: self.contract.id,
            raw_event_id: self.event.event.id,
            transaction_hash: self.event.event.transaction_hash.clone(),
            block_number: self.event.event.block_number,
        }
    }

    pub fn get_amount(&self) -> Result<f64, DecodeError> {
        to_number_decimals(decode_uint(self.data)?, self.decimals)
    }

    pub fn get_timestamp(&self) -> i64 {
        self.event.block_timestamp.unwrap_or_default()
    }

    pub fn get_tx(&self) -> String {
        self.event.event.transaction_hash.clone()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecodedEvent {
    pub item: TransactionItem,
    pub bus_event: BusEvent,
}

/// Decode strategy for one contract family.
pub trait ContractFamily: Send + Sync {
    fn get_contract_type(&self) -> ContractType;

    /// Topic-0 signatures this family understands, with their event names.
    fn get_event_topics(&self) -> &[(H256, &'static str)];

    /// Name of the getter in [`TOKEN_ABI`] that returns the contract's token.
    fn get_token_getter(&self) -> &'static str;

    fn decode(&self, context: &DecodeContext<'_>) -> Result<DecodedEvent, DecodeError>;

    fn get_event_name(&self, topic0: &str) -> Option<&'static str> {
        let topic0 = H256::from_str(topic0).ok()?;

        self.get_event_topics()
            .iter()
            .find(|(topic, _)| *topic == topic0)
            .map(|(_, name)| *name)
    }
}

/// Topics of the named events across every ABI version, deduplicated.
fn collect_event_topics(abis: &[Abi], names: &[&'static str]) -> Vec<(H256, &'static str)> {
    let mut topics = vec![];

    for abi in abis {
        for name in names {
            for event in abi.events_by_name(name).into_iter().flatten() {
                let topic = (event.signature(), *name);
                if !topics.contains(&topic) {
                    topics.push(topic);
                }
            }
        }
    }

    topics
}

fn parse_abis(versions: &[&[&str]]) -> Vec<Abi> {
    versions
        .iter()
        .map(|abi| parse_abi(abi).expect("family ABIs are static"))
        .collect()
}

/// Maps a contract type to the strategy that decodes its events.
#[derive(Clone)]
pub struct FamilyRegistry {
    families: HashMap<ContractType, Arc<dyn ContractFamily>>,
}

impl FamilyRegistry {
    pub fn empty() -> Self {
        Self {
            families: HashMap::new(),
        }
    }

    pub fn register(mut self, family: impl ContractFamily + 'static) -> Self {
        self.families.insert(family.get_contract_type(), Arc::new(family));

        self
    }

    pub fn get(&self, contract_type: ContractType) -> Option<&Arc<dyn ContractFamily>> {
        self.families.get(&contract_type)
    }
}

impl Default for FamilyRegistry {
    fn default() -> Self {
        Self::empty()
            .register(PaymentGatewayFamily::new())
            .register(VestingFamily::new())
            .register(ProRataFamily::new())
    }
}

impl std::fmt::Debug for FamilyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FamilyRegistry")
            .field("families", &self.families.keys().collect::<Vec<_>>())
            .finish()
    }
}
