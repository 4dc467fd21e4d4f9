//! EVM encoding helpers.
//!
//! Address parsing and formatting, `0x` hex handling, Keccak-256 and the
//! handful of ABI word encodings needed to build validation registry calls.
//! Addresses are always rendered lower-case; checksummed input is accepted.

use std::sync::LazyLock;

use alloy_primitives::{Address, U256};
use regex::Regex;
use sha3::{Digest, Keccak256};

use crate::{AgentkitError, Result};

static ADDRESS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address regex is valid"));

/// Size of an ABI word in bytes.
pub const WORD_SIZE: usize = 32;

/// Returns true when `input` is `0x` followed by exactly 40 hex characters.
pub fn is_address(input: &str) -> bool {
    ADDRESS_REGEX.is_match(input)
}

/// Parse a `0x`-prefixed 20-byte address (any casing).
pub fn parse_address(input: &str) -> Result<Address> {
    if !is_address(input) {
        return Err(AgentkitError::InvalidAddress(input.to_string()));
    }
    let bytes =
        hex::decode(&input[2..]).map_err(|_| AgentkitError::InvalidAddress(input.to_string()))?;
    Ok(Address::from_slice(&bytes))
}

/// Format an address as lower-case `0x` hex.
pub fn format_address(address: &Address) -> String {
    to_hex_prefixed(address.as_slice())
}

/// Encode bytes as lower-case `0x` hex.
pub fn to_hex_prefixed(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode hex with or without a `0x` prefix. Returns `None` when the input is
/// not valid hex.
pub fn decode_hex(input: &str) -> Option<Vec<u8>> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).ok()
}

/// Keccak-256 digest.
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data.as_ref());
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Four-byte function or error selector for a canonical signature such as
/// `ownerOf(uint256)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Parse a non-negative integer written in decimal or `0x` hex, up to 256 bits.
pub fn parse_uint(input: &str) -> Option<U256> {
    if let Some(digits) = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        return U256::from_str_radix(digits, 16).ok();
    }
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_str_radix(input, 10).ok()
}

/// ABI value for [`encode_call`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `address`, left-padded to one word.
    Address(Address),
    /// `uint256`.
    Uint(U256),
    /// `bytes32`.
    FixedBytes32([u8; 32]),
    /// Dynamic `string`.
    String(String),
    /// Dynamic `bytes`.
    Bytes(Vec<u8>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Token::String(_) | Token::Bytes(_))
    }

    fn head_word(&self) -> [u8; 32] {
        match self {
            Token::Address(address) => address_word(address),
            Token::Uint(value) => value.to_be_bytes::<32>(),
            Token::FixedBytes32(bytes) => *bytes,
            // Dynamic tokens carry an offset in the head, filled in by encode_tokens.
            Token::String(_) | Token::Bytes(_) => [0u8; 32],
        }
    }

    fn tail(&self) -> Vec<u8> {
        let payload: &[u8] = match self {
            Token::String(s) => s.as_bytes(),
            Token::Bytes(b) => b,
            _ => return Vec::new(),
        };
        let mut out = U256::from(payload.len()).to_be_bytes::<32>().to_vec();
        out.extend_from_slice(payload);
        let padding = (WORD_SIZE - payload.len() % WORD_SIZE) % WORD_SIZE;
        out.extend(std::iter::repeat(0u8).take(padding));
        out
    }
}

/// Left-pad an address into a 32-byte word.
pub fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    word
}

/// ABI-encode a tuple of tokens (head/tail layout).
pub fn encode_tokens(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD_SIZE;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            let offset = U256::from(head_len + tail.len());
            head.extend_from_slice(&offset.to_be_bytes::<32>());
            tail.extend(token.tail());
        } else {
            head.extend_from_slice(&token.head_word());
        }
    }

    head.extend(tail);
    head
}

/// ABI-encode a function call: selector followed by the encoded arguments.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode_tokens(tokens));
    out
}

/// Read an address from the first ABI word of `data`.
///
/// Returns `None` when the word is short or its upper 12 bytes are not zero.
pub fn decode_address_word(data: &[u8]) -> Option<Address> {
    let word = data.get(..WORD_SIZE)?;
    if word[..12].iter().any(|b| *b != 0) {
        return None;
    }
    Some(Address::from_slice(&word[12..]))
}

/// Serde adapter rendering `Vec<u8>` as `0x` hex.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_hex_prefixed(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::decode_hex(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hex: {}", text)))
    }
}

/// Serde adapter rendering an [`Address`] as lower-case `0x` hex.
pub mod address_hex {
    use alloy_primitives::Address;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_address(address))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_address(&text).map_err(serde::de::Error::custom)
    }
}
