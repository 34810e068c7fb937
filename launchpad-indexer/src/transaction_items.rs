use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::Account;

/// Links a decoded item back to the raw data it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemSource {
    pub network_id: i32,
    pub contract_id: i32,
    pub raw_event_id: Uuid,
    pub transaction_hash: String,
    pub block_number: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentGatewayTransactionItem {
    #[serde(flatten)]
    pub source: ItemSource,
    pub account: String,
    pub account_id: Option<i32>,
    pub amount: f64,
    pub user_id: String,
    pub transaction_id: String,
    pub is_sig: bool,
    pub timestamp: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VestingItemKind {
    Claim,
    Refund,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VestingTransactionItem {
    #[serde(flatten)]
    pub source: ItemSource,
    pub kind: VestingItemKind,
    pub account: String,
    pub account_id: Option<i32>,
    pub amount: f64,
    pub timestamp: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProRataItemKind {
    Deposit,
    Refund,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProRataTransactionItem {
    #[serde(flatten)]
    pub source: ItemSource,
    pub kind: ProRataItemKind,
    pub account: String,
    pub account_id: Option<i32>,
    pub amount: f64,
    pub transaction_id: Option<String>,
    pub is_sig: Option<bool>,
    pub timestamp: i64,
}

/// A decoded, human-usable record. One per raw event with a known signature.
#[derive(Clone, Debug, PartialEq)]
pub enum TransactionItem {
    PaymentGateway(PaymentGatewayTransactionItem),
    Vesting(VestingTransactionItem),
    ProRata(ProRataTransactionItem),
}

impl TransactionItem {
    pub fn get_account(&self) -> &str {
        match self {
            TransactionItem::PaymentGateway(item) => &item.account,
            TransactionItem::Vesting(item) => &item.account,
            TransactionItem::ProRata(item) => &item.account,
        }
    }

    pub fn get_source(&self) -> &ItemSource {
        match self {
            TransactionItem::PaymentGateway(item) => &item.source,
            TransactionItem::Vesting(item) => &item.source,
            TransactionItem::ProRata(item) => &item.source,
        }
    }

    pub fn with_account(mut self, account: &Account) -> Self {
        match &mut self {
            TransactionItem::PaymentGateway(item) => item.account_id = Some(account.id),
            TransactionItem::Vesting(item) => item.account_id = Some(account.id),
            TransactionItem::ProRata(item) => item.account_id = Some(account.id),
        }

        self
    }
}

/// Per-family item counts for one network.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionItemCounts {
    pub payment_gateway: u64,
    pub vesting: u64,
    pub pro_rata: u64,
}
