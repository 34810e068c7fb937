use ethers::abi::Abi;
use ethers::types::H256;
use once_cell::sync::Lazy;

use super::{collect_event_topics, parse_abis, ContractFamily, DecodeContext, DecodedEvent};
use crate::bus::{BusEvent, VestingClaimData};
use crate::contracts::ContractType;
use crate::decoding::DecodeError;
use crate::transaction_items::{TransactionItem, VestingItemKind, VestingTransactionItem};

pub const VESTING_ABIS: &[&[&str]] = &[&[
    "event Claim(address indexed account, uint256 amount)",
    "function claim()",
    "function erc20Token() view returns (address)",
]];

static ABIS: Lazy<Vec<Abi>> = Lazy::new(|| parse_abis(VESTING_ABIS));

/// Claims carry everything in the log, so the call input is not decoded.
pub struct VestingFamily {
    topics: Vec<(H256, &'static str)>,
}

impl VestingFamily {
    pub fn new() -> Self {
        Self {
            topics: collect_event_topics(&ABIS, &["Claim"]),
        }
    }
}

impl Default for VestingFamily {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractFamily for VestingFamily {
    fn get_contract_type(&self) -> ContractType {
        ContractType::Vesting
    }

    fn get_event_topics(&self) -> &[(H256, &'static str)] {
        &self.topics
    }

    fn get_token_getter(&self) -> &'static str {
        "erc20Token"
    }

    fn decode(&self, context: &DecodeContext<'_>) -> Result<DecodedEvent, DecodeError> {
        let amount = context.get_amount()?;
        let timestamp = context.get_timestamp();

        let item = VestingTransactionItem {
            source: context.get_source(),
            kind: VestingItemKind::Claim,
            account: context.account.clone(),
            account_id: None,
            amount,
            timestamp,
        };

        let bus_event = BusEvent::VestingContractClaim(VestingClaimData {
            network: context.network.to_owned(),
            contract_address: context.contract.address.clone(),
            account: context.account.clone(),
            amount,
            timestamp,
            tx: context.get_tx(),
        });

        Ok(DecodedEvent {
            item: TransactionItem::Vesting(item),
            bus_event,
        })
    }
}
