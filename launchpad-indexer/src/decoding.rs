mod abi_versions;

use std::str::FromStr;

use derive_more::Display;
use ethers::abi::{self, ParamType};
use ethers::types::{Address, H256, U256};
use ethers::utils::format_units;

use crate::hashes::Hashes;

pub use abi_versions::{AbiVersions, DecodedInput};

#[derive(Debug, Display, Clone, PartialEq)]
pub enum DecodeError {
    #[display("no ABI version decodes input with selector {_0}")]
    NoMatchingAbiVersion(String),
    #[display("invalid hex: {_0}")]
    InvalidHex(String),
    #[display("invalid topic: {_0}")]
    InvalidTopic(String),
    #[display("invalid data: {_0}")]
    InvalidData(String),
    #[display("missing {_0}")]
    MissingField(&'static str),
    #[display("cannot rescale by {_0} decimals")]
    InvalidDecimals(u32),
    #[display("no decoder registered for {_0}")]
    UnregisteredFamily(String),
}

impl std::error::Error for DecodeError {}

/// An address sits right-aligned in a 32-byte topic slot.
pub fn address_from_topic(topic: &str) -> Result<String, DecodeError> {
    let slot = H256::from_str(topic).map_err(|_| DecodeError::InvalidTopic(topic.to_owned()))?;

    Ok(Hashes::h160_to_string(&Address::from_slice(&slot.as_bytes()[12..])))
}

pub fn decode_hex(value: &str) -> Result<Vec<u8>, DecodeError> {
    Hashes::string_to_bytes(value)
        .map(|bytes| bytes.to_vec())
        .ok_or_else(|| DecodeError::InvalidHex(value.to_owned()))
}

/// Reads the leading `uint256` of an event's data payload.
pub fn decode_uint(data: &str) -> Result<U256, DecodeError> {
    let bytes = decode_hex(data)?;

    abi::decode(&[ParamType::Uint(256)], &bytes)
        .map_err(|e| DecodeError::InvalidData(e.to_string()))?
        .into_iter()
        .next()
        .and_then(|token| token.into_uint())
        .ok_or(DecodeError::MissingField("amount"))
}

/// Rescales a raw token amount into a human-usable number.
pub fn to_number_decimals(amount: U256, decimals: u32) -> Result<f64, DecodeError> {
    format_units(amount, decimals)
        .map_err(|_| DecodeError::InvalidDecimals(decimals))?
        .parse::<f64>()
        .map_err(|_| DecodeError::InvalidDecimals(decimals))
}
