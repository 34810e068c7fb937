use ethers::abi::Abi;
use ethers::types::H256;
use once_cell::sync::Lazy;

use super::{collect_event_topics, parse_abis, ContractFamily, DecodeContext, DecodedEvent};
use crate::bus::{BusEvent, ProRataDepositData, ProRataRefundData};
use crate::contracts::ContractType;
use crate::decoding::{AbiVersions, DecodeError};
use crate::transaction_items::{ProRataItemKind, ProRataTransactionItem, TransactionItem};

pub const PRO_RATA_ABIS: &[&[&str]] = &[
    &[
        "event Deposit(address indexed account, uint256 amount)",
        "event Refund(address indexed account, uint256 amount)",
        "function depositSig(uint256 amount, uint32 boost, uint256 boostExchangeRate, string transactionId, uint32 timestampLimit, bytes signature)",
        "function deposit(uint256 amount)",
        "function refund()",
        "function baseToken() view returns (address)",
    ],
    &[
        "event Deposit(address indexed account, uint256 amount)",
        "event Refund(address indexed account, uint256 amount)",
        "function depositSig(uint256 amount, string transactionId, uint32 timestampLimit, bytes signature)",
        "function baseToken() view returns (address)",
    ],
];

static ABIS: Lazy<Vec<Abi>> = Lazy::new(|| parse_abis(PRO_RATA_ABIS));

pub struct ProRataFamily {
    inputs: AbiVersions,
    topics: Vec<(H256, &'static str)>,
}

impl ProRataFamily {
    pub fn new() -> Self {
        Self {
            inputs: AbiVersions::new(ABIS.clone()),
            topics: collect_event_topics(&ABIS, &["Deposit", "Refund"]),
        }
    }
}

impl Default for ProRataFamily {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractFamily for ProRataFamily {
    fn get_contract_type(&self) -> ContractType {
        ContractType::ProRata
    }

    fn get_event_topics(&self) -> &[(H256, &'static str)] {
        &self.topics
    }

    fn get_token_getter(&self) -> &'static str {
        "baseToken"
    }

    fn decode(&self, context: &DecodeContext<'_>) -> Result<DecodedEvent, DecodeError> {
        let amount = context.get_amount()?;
        let timestamp = context.get_timestamp();
        let network = context.network.to_owned();
        let contract_address = context.contract.address.clone();

        let (kind, transaction_id, is_sig, bus_event) = match context.event_name {
            "Refund" => (
                ProRataItemKind::Refund,
                None,
                None,
                BusEvent::ProRataContractRefund(ProRataRefundData {
                    network,
                    contract_type: context.contract.contract_type,
                    contract_address,
                    account: context.account.clone(),
                    amount,
                    timestamp,
                    tx: context.get_tx(),
                }),
            ),
            _ => {
                let input = self.inputs.try_decode(&context.input)?;
                let transaction_id = input.get_string("transactionId");
                let is_sig = input.has_param("signature");

                (
                    ProRataItemKind::Deposit,
                    transaction_id.clone(),
                    Some(is_sig),
                    BusEvent::ProRataContractDeposit(ProRataDepositData {
                        network,
                        contract_type: context.contract.contract_type,
                        contract_address,
                        account: context.account.clone(),
                        amount,
                        transaction_id,
                        is_sig: Some(is_sig),
                        timestamp,
                        tx: context.get_tx(),
                    }),
                )
            }
        };

        let item = ProRataTransactionItem {
            source: context.get_source(),
            kind,
            account: context.account.clone(),
            account_id: None,
            amount,
            transaction_id,
            is_sig,
            timestamp,
        };

        Ok(DecodedEvent {
            item: TransactionItem::ProRata(item),
            bus_event,
        })
    }
}
