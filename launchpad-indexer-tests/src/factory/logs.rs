use std::str::FromStr;

use ethers::abi::{parse_abi, Token};
use ethers::types::{Address, Bytes, Log, Transaction, H256, U256};
use ethers::utils::keccak256;
use launchpad_indexer::families::{PAYMENT_GATEWAY_ABIS, PRO_RATA_ABIS, VESTING_ABIS};

pub const ACCOUNT: &str = "0x0000000000000000000000000000000000000abc";

pub const DEPOSIT_EVENT: &str = "Deposit(address,uint256)";
pub const CLAIM_EVENT: &str = "Claim(address,uint256)";
pub const REFUND_EVENT: &str = "Refund(address,uint256)";
pub const UNKNOWN_EVENT: &str = "Transfer(address,uint256)";

pub fn address(value: &str) -> Address {
    Address::from_str(value).unwrap()
}

pub fn tx_hash(seed: u64) -> H256 {
    H256::from_low_u64_be(0x7000_0000 + seed)
}

/// `amount` whole tokens at 18 decimals.
pub fn tokens(amount: u64) -> U256 {
    U256::from(amount) * U256::exp10(18)
}

/// A log of `event(address indexed account, uint256 amount)` emitted by
/// `contract`.
pub fn event_log(
    contract: &str,
    event: &str,
    account: &str,
    amount: U256,
    block_number: u64,
    transaction_hash: H256,
    log_index: u64,
) -> Log {
    Log {
        address: address(contract),
        topics: vec![H256::from(keccak256(event)), H256::from(address(account))],
        data: Bytes::from(ethers::abi::encode(&[Token::Uint(amount)])),
        block_hash: Some(H256::from_low_u64_be(block_number)),
        block_number: Some(block_number.into()),
        transaction_hash: Some(transaction_hash),
        transaction_index: Some(0.into()),
        log_index: Some(log_index.into()),
        transaction_log_index: None,
        log_type: None,
        removed: Some(false),
    }
}

pub fn transaction(hash: H256, to: &str, input: Bytes, block_number: u64) -> Transaction {
    Transaction {
        hash,
        from: address(ACCOUNT),
        to: Some(address(to)),
        input,
        block_number: Some(block_number.into()),
        ..Default::default()
    }
}

fn encode_call(abi: &[&str], function: &str, tokens: Vec<Token>) -> Bytes {
    let abi = parse_abi(abi).unwrap();

    Bytes::from(abi.function(function).unwrap().encode_input(&tokens).unwrap())
}

pub fn payment_gateway_deposit_sig_input(
    user_id: &str,
    transaction_id: &str,
    account: &str,
    amount: U256,
) -> Bytes {
    encode_call(
        PAYMENT_GATEWAY_ABIS[0],
        "depositSig",
        vec![
            Token::String(user_id.to_owned()),
            Token::String(transaction_id.to_owned()),
            Token::Address(address(account)),
            Token::Uint(amount),
            Token::Uint(U256::from(1_900_000_000u64)),
            Token::Bytes(vec![7; 65]),
        ],
    )
}

/// The older deposit shape, only known to the second ABI version.
pub fn payment_gateway_legacy_deposit_input(
    user_id: &str,
    transaction_id: &str,
    amount: U256,
) -> Bytes {
    encode_call(
        PAYMENT_GATEWAY_ABIS[1],
        "deposit",
        vec![
            Token::String(user_id.to_owned()),
            Token::String(transaction_id.to_owned()),
            Token::Uint(amount),
            Token::Uint(U256::from(1_900_000_000u64)),
            Token::Bytes(vec![7; 65]),
        ],
    )
}

pub fn vesting_claim_input() -> Bytes {
    encode_call(VESTING_ABIS[0], "claim", vec![])
}

pub fn pro_rata_deposit_sig_input(transaction_id: &str, amount: U256) -> Bytes {
    encode_call(
        PRO_RATA_ABIS[1],
        "depositSig",
        vec![
            Token::Uint(amount),
            Token::String(transaction_id.to_owned()),
            Token::Uint(U256::from(1_900_000_000u64)),
            Token::Bytes(vec![7; 65]),
        ],
    )
}

pub fn pro_rata_refund_input() -> Bytes {
    encode_call(PRO_RATA_ABIS[0], "refund", vec![])
}

pub fn garbage_input() -> Bytes {
    Bytes::from(vec![0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 1])
}
