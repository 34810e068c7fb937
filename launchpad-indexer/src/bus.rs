use derive_more::Display;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::contracts::ContractType;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentGatewayDepositData {
    pub network: String,
    pub contract_type: ContractType,
    pub contract_address: String,
    pub user_id: String,
    pub transaction_id: String,
    pub is_sig: bool,
    pub account: String,
    pub amount: f64,
    pub timestamp: i64,
    pub tx: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VestingClaimData {
    pub network: String,
    pub contract_address: String,
    pub account: String,
    pub amount: f64,
    pub timestamp: i64,
    pub tx: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProRataDepositData {
    pub network: String,
    pub contract_type: ContractType,
    pub contract_address: String,
    pub account: String,
    pub amount: f64,
    pub transaction_id: Option<String>,
    pub is_sig: Option<bool>,
    pub timestamp: i64,
    pub tx: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProRataRefundData {
    pub network: String,
    pub contract_type: ContractType,
    pub contract_address: String,
    pub account: String,
    pub amount: f64,
    pub timestamp: i64,
    pub tx: String,
}

/// Business event published once per decoded transaction item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum BusEvent {
    #[serde(rename = "PAYMENT_GATEWAY_CONTRACT_DEPOSIT")]
    PaymentGatewayContractDeposit(PaymentGatewayDepositData),
    #[serde(rename = "VESTING_CONTRACT_CLAIM")]
    VestingContractClaim(VestingClaimData),
    #[serde(rename = "PRO_RATA_CONTRACT_DEPOSIT")]
    ProRataContractDeposit(ProRataDepositData),
    #[serde(rename = "PRO_RATA_CONTRACT_REFUND")]
    ProRataContractRefund(ProRataRefundData),
}

impl BusEvent {
    pub fn get_name(&self) -> &'static str {
        match self {
            BusEvent::PaymentGatewayContractDeposit(_) => "PAYMENT_GATEWAY_CONTRACT_DEPOSIT",
            BusEvent::VestingContractClaim(_) => "VESTING_CONTRACT_CLAIM",
            BusEvent::ProRataContractDeposit(_) => "PRO_RATA_CONTRACT_DEPOSIT",
            BusEvent::ProRataContractRefund(_) => "PRO_RATA_CONTRACT_REFUND",
        }
    }

    pub fn get_tx(&self) -> &str {
        match self {
            BusEvent::PaymentGatewayContractDeposit(data) => &data.tx,
            BusEvent::VestingContractClaim(data) => &data.tx,
            BusEvent::ProRataContractDeposit(data) => &data.tx,
            BusEvent::ProRataContractRefund(data) => &data.tx,
        }
    }
}

#[derive(Debug, Display)]
pub enum NotifierError {
    Closed,
    Unknown(String),
}

impl std::error::Error for NotifierError {}

/// Publishes decoded events to the message bus. Delivery is fire-and-forget:
/// callers log failures and move on.
#[async_trait::async_trait]
pub trait EventNotifier: Send + Sync {
    async fn send(&self, event: &BusEvent) -> Result<(), NotifierError>;
}

/// In-process bus backed by a tokio broadcast channel.
#[derive(Clone, Debug)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<BusEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(1_024)
    }
}

#[async_trait::async_trait]
impl EventNotifier for BroadcastNotifier {
    async fn send(&self, event: &BusEvent) -> Result<(), NotifierError> {
        // Lagging or absent receivers only affect themselves
        if self.sender.send(event.clone()).is_err() {
            debug!(event = event.get_name(), "no bus subscribers");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim() -> BusEvent {
        BusEvent::VestingContractClaim(VestingClaimData {
            network: "bsc".to_owned(),
            contract_address: "0x01".to_owned(),
            account: "0x02".to_owned(),
            amount: 1.5,
            timestamp: 1_700_000_000,
            tx: "0x03".to_owned(),
        })
    }

    #[test]
    fn serializes_with_event_name_and_camel_case_data() {
        let value = serde_json::to_value(claim()).unwrap();

        assert_eq!(value["event"], "VESTING_CONTRACT_CLAIM");
        assert_eq!(value["data"]["contractAddress"], "0x01");
        assert_eq!(value["data"]["amount"], 1.5);
    }

    #[tokio::test]
    pub async fn broadcasts_to_subscribers() {
        let notifier = BroadcastNotifier::default();
        let mut receiver = notifier.subscribe();

        notifier.send(&claim()).await.unwrap();

        assert_eq!(receiver.recv().await.unwrap(), claim());
    }

    #[tokio::test]
    pub async fn sending_without_subscribers_is_not_an_error() {
        assert!(BroadcastNotifier::default().send(&claim()).await.is_ok());
    }
}
