use ethers::abi::Abi;
use ethers::types::H256;
use once_cell::sync::Lazy;

use super::{collect_event_topics, parse_abis, ContractFamily, DecodeContext, DecodedEvent};
use crate::bus::{BusEvent, PaymentGatewayDepositData};
use crate::contracts::ContractType;
use crate::decoding::{AbiVersions, DecodeError};
use crate::transaction_items::{PaymentGatewayTransactionItem, TransactionItem};

/// Current shape first; older deployments follow.
pub const PAYMENT_GATEWAY_ABIS: &[&[&str]] = &[
    &[
        "event Deposit(address indexed account, uint256 amount)",
        "function depositSig(string userId, string transactionId, address account, uint256 amount, uint32 timestampLimit, bytes signature)",
        "function deposit(string userId, string transactionId, address account, uint256 amount)",
        "function erc20Token() view returns (address)",
    ],
    &[
        "event Deposit(address indexed account, uint256 amount)",
        "function deposit(string userId, string transactionId, uint256 amount, uint32 timestampLimit, bytes signature)",
        "function erc20Token() view returns (address)",
    ],
];

static ABIS: Lazy<Vec<Abi>> = Lazy::new(|| parse_abis(PAYMENT_GATEWAY_ABIS));

pub struct PaymentGatewayFamily {
    inputs: AbiVersions,
    topics: Vec<(H256, &'static str)>,
}

impl PaymentGatewayFamily {
    pub fn new() -> Self {
        Self {
            inputs: AbiVersions::new(ABIS.clone()),
            topics: collect_event_topics(&ABIS, &["Deposit"]),
        }
    }
}

impl Default for PaymentGatewayFamily {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractFamily for PaymentGatewayFamily {
    fn get_contract_type(&self) -> ContractType {
        ContractType::PaymentGateway
    }

    fn get_event_topics(&self) -> &[(H256, &'static str)] {
        &self.topics
    }

    fn get_token_getter(&self) -> &'static str {
        "erc20Token"
    }

    fn decode(&self, context: &DecodeContext<'_>) -> Result<DecodedEvent, DecodeError> {
        let input = self.inputs.try_decode(&context.input)?;
        let user_id = input.get_string("userId").ok_or(DecodeError::MissingField("userId"))?;
        let transaction_id = input
            .get_string("transactionId")
            .ok_or(DecodeError::MissingField("transactionId"))?;
        let is_sig = input.has_param("signature");
        let amount = context.get_amount()?;
        let timestamp = context.get_timestamp();

        let item = PaymentGatewayTransactionItem {
            source: context.get_source(),
            account: context.account.clone(),
            account_id: None,
            amount,
            user_id: user_id.clone(),
            transaction_id: transaction_id.clone(),
            is_sig,
            timestamp,
        };

        let bus_event = BusEvent::PaymentGatewayContractDeposit(PaymentGatewayDepositData {
            network: context.network.to_owned(),
            contract_type: context.contract.contract_type,
            contract_address: context.contract.address.clone(),
            user_id,
            transaction_id,
            is_sig,
            account: context.account.clone(),
            amount,
            timestamp,
            tx: context.get_tx(),
        });

        Ok(DecodedEvent {
            item: TransactionItem::PaymentGateway(item),
            bus_event,
        })
    }
}
