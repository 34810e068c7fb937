use ethers::types::{Bytes, H160, H256};
use ethers::utils::hex;

pub struct Hashes;

impl Hashes {
    pub fn h160_to_string(h160: &H160) -> String {
        format!("{h160:?}")
    }

    pub fn h256_to_string(h256: &H256) -> String {
        format!("{h256:?}")
    }

    pub fn bytes_to_string(bytes: &Bytes) -> String {
        format!("0x{}", hex::encode(bytes.as_ref()))
    }

    pub fn string_to_bytes(value: &str) -> Option<Bytes> {
        let value = value.strip_prefix("0x").unwrap_or(value);

        hex::decode(value).ok().map(Bytes::from)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn renders_full_lowercase_hex() {
        let address = H160::from_str("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();

        assert_eq!(
            Hashes::h160_to_string(&address),
            "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
        );
        assert_eq!(Hashes::h256_to_string(&H256::zero()).len(), 66);
    }

    #[test]
    fn bytes_survive_string_conversion() {
        let bytes = Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]);
        let value = Hashes::bytes_to_string(&bytes);

        assert_eq!(value, "0xdeadbeef");
        assert_eq!(Hashes::string_to_bytes(&value), Some(bytes));
        assert_eq!(Hashes::string_to_bytes("0xzz"), None);
    }
}
