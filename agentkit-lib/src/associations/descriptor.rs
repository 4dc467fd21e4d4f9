//! EVM-V1 account descriptor codec.
//!
//! An account descriptor packs a (chain id, 20-byte address) pair into a
//! self-describing blob used as the `initiator` / `approver` field of an
//! association record:
//!
//! ```text
//! 00 01 00 00 | L1 | chain id (big-endian, minimal, L1 bytes) | 0x14 | 20 address bytes
//! ```
//!
//! Decoding never panics: anything that is not a well-formed EVM-V1 blob,
//! including truncated and over-length buffers, decodes to `None`.

use std::fmt;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::evm::{self, format_address, parse_address};
use crate::Result;

/// Four-byte tag identifying the EVM-V1 layout.
pub const EVM_V1_TAG: [u8; 4] = [0x00, 0x01, 0x00, 0x00];

/// Length of the address segment.
pub const EVM_ADDRESS_LEN: usize = 20;

/// A chain-qualified EVM account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDescriptor {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Account address.
    #[serde(with = "evm::address_hex")]
    pub address: Address,
}

impl AccountDescriptor {
    /// Create a descriptor from parts.
    pub fn new(chain_id: u64, address: Address) -> Self {
        Self { chain_id, address }
    }

    /// Create a descriptor from a `0x`-prefixed address string.
    pub fn parse(chain_id: u64, address: &str) -> Result<Self> {
        Ok(Self::new(chain_id, parse_address(address)?))
    }

    /// Lower-case `0x` address.
    pub fn address_hex(&self) -> String {
        format_address(&self.address)
    }

    /// Encode as an EVM-V1 blob.
    pub fn to_evm_v1(&self) -> Vec<u8> {
        let chain_bytes = minimal_be_bytes(self.chain_id);
        let mut out = Vec::with_capacity(EVM_V1_TAG.len() + 2 + chain_bytes.len() + EVM_ADDRESS_LEN);
        out.extend_from_slice(&EVM_V1_TAG);
        out.push(chain_bytes.len() as u8);
        out.extend_from_slice(&chain_bytes);
        out.push(EVM_ADDRESS_LEN as u8);
        out.extend_from_slice(self.address.as_slice());
        out
    }

    /// Decode an EVM-V1 blob.
    pub fn from_evm_v1(bytes: &[u8]) -> Option<Self> {
        decode_evm_v1(bytes)
    }
}

impl fmt::Display for AccountDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "eip155:{}:{}", self.chain_id, self.address_hex())
    }
}

/// Encode a (chain id, address) pair as an EVM-V1 blob.
///
/// # Errors
///
/// Returns [`crate::AgentkitError::InvalidAddress`] unless `address` matches
/// `^0x[0-9a-fA-F]{40}$`.
pub fn encode_evm_v1(chain_id: u64, address: &str) -> Result<Vec<u8>> {
    Ok(AccountDescriptor::parse(chain_id, address)?.to_evm_v1())
}

/// Decode an EVM-V1 blob.
///
/// Returns `None` when the buffer is shorter than the tag, carries another
/// tag, declares a length running past the end, has an address segment that
/// is not 20 bytes, has a chain id wider than 64 bits, or has trailing bytes.
pub fn decode_evm_v1(bytes: &[u8]) -> Option<AccountDescriptor> {
    let mut reader = Reader::new(bytes);

    if reader.take(EVM_V1_TAG.len())? != EVM_V1_TAG.as_slice() {
        return None;
    }

    let chain_len = reader.take(1)?[0] as usize;
    let chain_bytes = reader.take(chain_len)?;
    if chain_bytes.len() > 8 {
        return None;
    }
    let chain_id = chain_bytes
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));

    let address_len = reader.take(1)?[0] as usize;
    if address_len != EVM_ADDRESS_LEN {
        return None;
    }
    let address = Address::from_slice(reader.take(EVM_ADDRESS_LEN)?);

    if !reader.is_empty() {
        return None;
    }

    Some(AccountDescriptor { chain_id, address })
}

/// Decode an EVM-V1 blob given as hex (with or without `0x`).
///
/// Input that is not hex-decodable yields `None`.
pub fn decode_evm_v1_hex(input: &str) -> Option<AccountDescriptor> {
    decode_evm_v1(&evm::decode_hex(input)?)
}

fn minimal_be_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

/// Bounds-checked cursor over the input buffer.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.bytes.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AgentkitError;

    const ONE: &str = "0x0000000000000000000000000000000000000001";

    #[test]
    fn test_encode_layout() {
        let encoded = encode_evm_v1(11155111, ONE).unwrap();
        // 11155111 = 0xaa36a7
        let mut expected = vec![0x00, 0x01, 0x00, 0x00, 0x03, 0xaa, 0x36, 0xa7, 0x14];
        expected.extend_from_slice(&[0u8; 19]);
        expected.push(0x01);
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_round_trip_sepolia() {
        let encoded = encode_evm_v1(11155111, ONE).unwrap();
        let decoded = decode_evm_v1(&encoded).unwrap();
        assert_eq!(decoded.chain_id, 11155111);
        assert_eq!(decoded.address_hex(), ONE);
    }

    #[test]
    fn test_round_trip_lowercases_address() {
        let encoded = encode_evm_v1(1, "0xABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
        let decoded = decode_evm_v1(&encoded).unwrap();
        assert_eq!(
            decoded.address_hex(),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );
    }

    #[test]
    fn test_chain_id_zero_has_empty_segment() {
        let encoded = encode_evm_v1(0, ONE).unwrap();
        assert_eq!(encoded[4], 0);
        assert_eq!(decode_evm_v1(&encoded).unwrap().chain_id, 0);
    }

    #[test]
    fn test_encode_rejects_bad_address() {
        assert!(matches!(
            encode_evm_v1(1, "0x1234"),
            Err(AgentkitError::InvalidAddress(_))
        ));
        assert!(encode_evm_v1(1, "0000000000000000000000000000000000000001").is_err());
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(decode_evm_v1(&[]).is_none());
        assert!(decode_evm_v1(&[0x00]).is_none());
        assert!(decode_evm_v1(&[0x00, 0x02, 0x00, 0x00, 0x00, 0x14]).is_none());
        // chain length pointing past the end
        assert!(decode_evm_v1(&[0x00, 0x01, 0x00, 0x00, 0xff, 0x01]).is_none());
        // address length pointing past the end
        assert!(decode_evm_v1(&[0x00, 0x01, 0x00, 0x00, 0x01, 0x01, 0x14, 0xaa]).is_none());
    }

    #[test]
    fn test_decode_rejects_short_address_segment() {
        let mut blob = vec![0x00, 0x01, 0x00, 0x00, 0x01, 0x01, 0x13];
        blob.extend_from_slice(&[0u8; 19]);
        assert!(decode_evm_v1(&blob).is_none());
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut encoded = encode_evm_v1(1, ONE).unwrap();
        encoded.push(0x00);
        assert!(decode_evm_v1(&encoded).is_none());
    }

    #[test]
    fn test_decode_rejects_wide_chain_id() {
        let mut blob = vec![0x00, 0x01, 0x00, 0x00, 0x09];
        blob.extend_from_slice(&[0x01; 9]);
        blob.push(0x14);
        blob.extend_from_slice(&[0u8; 20]);
        assert!(decode_evm_v1(&blob).is_none());
    }

    #[test]
    fn test_decode_hex() {
        let encoded = encode_evm_v1(84532, ONE).unwrap();
        let hex_text = evm::to_hex_prefixed(&encoded);
        assert_eq!(decode_evm_v1_hex(&hex_text).unwrap().chain_id, 84532);
        assert_eq!(
            decode_evm_v1_hex(hex_text.trim_start_matches("0x")).unwrap().chain_id,
            84532
        );
        assert!(decode_evm_v1_hex("0xnothex").is_none());
        assert!(decode_evm_v1_hex("0x000").is_none());
    }

    #[test]
    fn test_display_is_caip10() {
        let descriptor = AccountDescriptor::parse(10, ONE).unwrap();
        assert_eq!(descriptor.to_string(), format!("eip155:10:{}", ONE));
    }
}
