use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use ethers::abi::{parse_abi, Abi, Function, Token};
use ethers::utils::hex;

use super::DecodeError;

/// Function input decoded by one of the known ABI versions.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedInput {
    pub function: String,
    pub version: usize,
    /// How many versions were tried before this one decoded.
    pub attempts: usize,
    params: HashMap<String, Token>,
}

impl DecodedInput {
    pub fn has_param(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.params.get(name).cloned().and_then(Token::into_string)
    }
}

/// Every historical ABI shape of one contract family.
///
/// Decoding tries the sticky version first, then the others in registration
/// order. The first version that succeeds becomes sticky.
#[derive(Debug)]
pub struct AbiVersions {
    versions: Vec<Abi>,
    sticky: AtomicUsize,
}

impl AbiVersions {
    pub fn new(versions: Vec<Abi>) -> Self {
        Self {
            versions,
            sticky: AtomicUsize::new(0),
        }
    }

    pub fn parse(human_readable_versions: &[&[&str]]) -> Result<Self, DecodeError> {
        let versions = human_readable_versions
            .iter()
            .map(|abi| parse_abi(abi).map_err(|e| DecodeError::InvalidData(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(versions))
    }

    pub fn get_sticky_version(&self) -> usize {
        self.sticky.load(Ordering::Relaxed)
    }

    pub fn try_decode(&self, input: &[u8]) -> Result<DecodedInput, DecodeError> {
        let sticky = self.get_sticky_version();
        let order = std::iter::once(sticky)
            .chain((0..self.versions.len()).filter(|version| *version != sticky));

        for (attempt, version) in order.enumerate() {
            if let Some(decoded) = self.decode_with(version, input, attempt + 1) {
                if version != sticky {
                    self.sticky.store(version, Ordering::Relaxed);
                }

                return Ok(decoded);
            }
        }

        Err(DecodeError::NoMatchingAbiVersion(format!(
            "0x{}",
            hex::encode(input.get(..4).unwrap_or(input))
        )))
    }

    fn decode_with(&self, version: usize, input: &[u8], attempts: usize) -> Option<DecodedInput> {
        let abi = self.versions.get(version)?;
        let (selector, encoded) = (input.get(..4)?, input.get(4..)?);

        let function = abi.functions().find(|f| f.short_signature() == selector)?;
        let tokens = function.decode_input(encoded).ok()?;

        Some(DecodedInput {
            function: function.name.clone(),
            version,
            attempts,
            params: named_params(function, tokens),
        })
    }
}

fn named_params(function: &Function, tokens: Vec<Token>) -> HashMap<String, Token> {
    function
        .inputs
        .iter()
        .map(|param| param.name.clone())
        .zip(tokens)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const V0: &[&str] = &["function deposit(string userId, string transactionId, uint256 amount)"];
    const V1: &[&str] = &[
        "function deposit(string userId, string transactionId, uint256 amount, uint32 timestampLimit, bytes signature)",
    ];

    fn encode(abi: &[&str], tokens: &[Token]) -> Vec<u8> {
        let abi = parse_abi(abi).unwrap();
        abi.function("deposit").unwrap().encode_input(tokens).unwrap()
    }

    fn v1_input() -> Vec<u8> {
        encode(
            V1,
            &[
                Token::String("user-1".to_owned()),
                Token::String("tx-1".to_owned()),
                Token::Uint(10.into()),
                Token::Uint(1_700_000_000u64.into()),
                Token::Bytes(vec![1, 2, 3]),
            ],
        )
    }

    #[test]
    fn falls_back_to_other_versions_and_sticks_to_the_first_success() {
        let versions = AbiVersions::parse(&[V0, V1]).unwrap();

        let first = versions.try_decode(&v1_input()).unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(first.attempts, 2);
        assert_eq!(first.get_string("transactionId").as_deref(), Some("tx-1"));
        assert!(first.has_param("signature"));
        assert_eq!(versions.get_sticky_version(), 1);

        let second = versions.try_decode(&v1_input()).unwrap();
        assert_eq!(second.version, 1);
        assert_eq!(second.attempts, 1);
    }

    #[test]
    fn switches_back_when_an_older_shape_shows_up() {
        let versions = AbiVersions::parse(&[V0, V1]).unwrap();
        versions.try_decode(&v1_input()).unwrap();

        let input = encode(
            V0,
            &[
                Token::String("user-2".to_owned()),
                Token::String("tx-2".to_owned()),
                Token::Uint(5.into()),
            ],
        );
        let decoded = versions.try_decode(&input).unwrap();

        assert_eq!(decoded.version, 0);
        assert_eq!(decoded.attempts, 2);
        assert!(!decoded.has_param("signature"));
        assert_eq!(versions.get_sticky_version(), 0);
    }

    #[test]
    fn fails_after_trying_every_version() {
        let versions = AbiVersions::parse(&[V0, V1]).unwrap();

        let error = versions.try_decode(&[0xde, 0xad, 0xbe, 0xef, 0x00]).unwrap_err();

        assert_eq!(error, DecodeError::NoMatchingAbiVersion("0xdeadbeef".to_owned()));
        assert_eq!(versions.get_sticky_version(), 0);
    }
}
