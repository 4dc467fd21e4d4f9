//! Association record types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::descriptor::AccountDescriptor;
use super::hash::structured_hash;
use crate::evm::{self, hex_bytes};
use crate::{AgentkitError, Result};

/// Unsigned 40-bit integer, as used by `uint40` record timestamps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uint40(u64);

impl Uint40 {
    /// Largest representable value, `2^40 - 1`.
    pub const MAX: u64 = (1 << 40) - 1;

    /// Zero.
    pub const ZERO: Uint40 = Uint40(0);

    /// Wrap a value, or `None` if it does not fit in 40 bits.
    pub fn new(value: u64) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    /// The wrapped value.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Big-endian encoding at the declared width.
    pub fn to_be_bytes(self) -> [u8; 5] {
        let wide = self.0.to_be_bytes();
        let mut out = [0u8; 5];
        out.copy_from_slice(&wide[3..]);
        out
    }
}

impl TryFrom<u64> for Uint40 {
    type Error = AgentkitError;

    fn try_from(value: u64) -> Result<Self> {
        Self::new(value).ok_or_else(|| {
            AgentkitError::Serialization(format!("{} does not fit in uint40", value))
        })
    }
}

impl From<u32> for Uint40 {
    fn from(value: u32) -> Self {
        Self(u64::from(value))
    }
}

impl fmt::Display for Uint40 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Uint40 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for Uint40 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = u64::deserialize(deserializer)?;
        Uint40::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// An association between two accounts, prior to signing.
///
/// `initiator` and `approver` are normally EVM-V1 account descriptors, but
/// they are hashed as opaque bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationRecord {
    /// Initiating account (EVM-V1 bytes).
    #[serde(with = "hex_bytes")]
    pub initiator: Vec<u8>,
    /// Approving account (EVM-V1 bytes).
    #[serde(with = "hex_bytes")]
    pub approver: Vec<u8>,
    /// Start of validity; hashed as 0 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_at: Option<Uint40>,
    /// End of validity; hashed as 0 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<Uint40>,
    /// Interface identifier.
    #[serde(default, with = "interface_id_hex")]
    pub interface_id: [u8; 4],
    /// Application payload.
    #[serde(default, with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl AssociationRecord {
    /// Create a record between two raw account blobs with every optional
    /// field empty.
    pub fn new(initiator: impl Into<Vec<u8>>, approver: impl Into<Vec<u8>>) -> Self {
        Self {
            initiator: initiator.into(),
            approver: approver.into(),
            valid_at: None,
            valid_until: None,
            interface_id: [0u8; 4],
            data: Vec::new(),
        }
    }

    /// Create a record between two EVM accounts.
    pub fn between(initiator: &AccountDescriptor, approver: &AccountDescriptor) -> Self {
        Self::new(initiator.to_evm_v1(), approver.to_evm_v1())
    }

    /// Set the start of validity.
    pub fn with_valid_at(mut self, valid_at: Uint40) -> Self {
        self.valid_at = Some(valid_at);
        self
    }

    /// Set the end of validity.
    pub fn with_valid_until(mut self, valid_until: Uint40) -> Self {
        self.valid_until = Some(valid_until);
        self
    }

    /// Set the interface identifier.
    pub fn with_interface_id(mut self, interface_id: [u8; 4]) -> Self {
        self.interface_id = interface_id;
        self
    }

    /// Set the payload.
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Decoded initiator, if it is an EVM-V1 blob.
    pub fn initiator_account(&self) -> Option<AccountDescriptor> {
        AccountDescriptor::from_evm_v1(&self.initiator)
    }

    /// Decoded approver, if it is an EVM-V1 blob.
    pub fn approver_account(&self) -> Option<AccountDescriptor> {
        AccountDescriptor::from_evm_v1(&self.approver)
    }

    /// Structured hash of this record.
    pub fn id(&self) -> AssociationId {
        AssociationId(structured_hash(self))
    }
}

/// A record together with its signatures and revocation marker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedAssociation {
    /// Revocation timestamp, 0 when not revoked.
    #[serde(default)]
    pub revoked_at: Uint40,
    /// Key type of the initiator signature.
    #[serde(default)]
    pub initiator_key_type: u16,
    /// Key type of the approver signature.
    #[serde(default)]
    pub approver_key_type: u16,
    /// Initiator signature over the record hash.
    #[serde(default, with = "hex_bytes")]
    pub initiator_signature: Vec<u8>,
    /// Approver signature over the record hash.
    #[serde(default, with = "hex_bytes")]
    pub approver_signature: Vec<u8>,
    /// The signed record.
    pub record: AssociationRecord,
}

impl SignedAssociation {
    /// Wrap an unsigned record.
    pub fn unsigned(record: AssociationRecord) -> Self {
        Self {
            revoked_at: Uint40::ZERO,
            initiator_key_type: 0,
            approver_key_type: 0,
            initiator_signature: Vec::new(),
            approver_signature: Vec::new(),
            record,
        }
    }

    /// Attach the initiator signature.
    pub fn with_initiator_signature(mut self, key_type: u16, signature: impl Into<Vec<u8>>) -> Self {
        self.initiator_key_type = key_type;
        self.initiator_signature = signature.into();
        self
    }

    /// Attach the approver signature.
    pub fn with_approver_signature(mut self, key_type: u16, signature: impl Into<Vec<u8>>) -> Self {
        self.approver_key_type = key_type;
        self.approver_signature = signature.into();
        self
    }

    /// Mark as revoked at `revoked_at`.
    pub fn with_revoked_at(mut self, revoked_at: Uint40) -> Self {
        self.revoked_at = revoked_at;
        self
    }

    /// Identifier of the association (the record's structured hash).
    pub fn id(&self) -> AssociationId {
        self.record.id()
    }

    /// Both parties have signed.
    pub fn is_fully_signed(&self) -> bool {
        !self.initiator_signature.is_empty() && !self.approver_signature.is_empty()
    }

    /// A non-zero revocation timestamp is set.
    pub fn is_revoked(&self) -> bool {
        self.revoked_at != Uint40::ZERO
    }

    /// Whether the association is in force at unix time `now`.
    ///
    /// A zero `valid_until` means no expiry. Revocation takes effect at
    /// `revoked_at`.
    pub fn is_active_at(&self, now: u64) -> bool {
        let valid_at = self.record.valid_at.unwrap_or_default().get();
        let valid_until = self.record.valid_until.unwrap_or_default().get();

        if now < valid_at {
            return false;
        }
        if valid_until != 0 && now >= valid_until {
            return false;
        }
        !(self.is_revoked() && now >= self.revoked_at.get())
    }
}

/// 32-byte association identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssociationId(pub [u8; 32]);

impl AssociationId {
    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AssociationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&evm::to_hex_prefixed(self.0))
    }
}

impl FromStr for AssociationId {
    type Err = AgentkitError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = evm::decode_hex(s)
            .filter(|b| b.len() == 32)
            .ok_or_else(|| AgentkitError::Serialization(format!("invalid association id: {}", s)))?;
        let mut id = [0u8; 32];
        id.copy_from_slice(&bytes);
        Ok(Self(id))
    }
}

impl Serialize for AssociationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AssociationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

mod interface_id_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 4], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&crate::evm::to_hex_prefixed(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 4], D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = crate::evm::decode_hex(&text)
            .filter(|b| b.len() == 4)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid bytes4: {}", text)))?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AssociationRecord {
        let initiator =
            AccountDescriptor::parse(11155111, "0x0000000000000000000000000000000000000001")
                .unwrap();
        let approver =
            AccountDescriptor::parse(84532, "0x0000000000000000000000000000000000000002").unwrap();
        AssociationRecord::between(&initiator, &approver)
    }

    #[test]
    fn test_uint40_bounds() {
        assert!(Uint40::new(Uint40::MAX).is_some());
        assert!(Uint40::new(Uint40::MAX + 1).is_none());
        assert_eq!(
            Uint40::new(0x01_0203_0405).unwrap().to_be_bytes(),
            [0x01, 0x02, 0x03, 0x04, 0x05]
        );
    }

    #[test]
    fn test_record_accounts_decode() {
        let record = sample();
        assert_eq!(record.initiator_account().unwrap().chain_id, 11155111);
        assert_eq!(record.approver_account().unwrap().chain_id, 84532);
    }

    #[test]
    fn test_record_json_shape() {
        let record = sample()
            .with_valid_at(Uint40::from(1_700_000_000u32))
            .with_interface_id([0xde, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["validAt"], 1_700_000_000u64);
        assert_eq!(json["interfaceId"], "0xdeadbeef");
        assert_eq!(json["data"], "0x");
        assert!(json.get("validUntil").is_none());
        assert!(json["initiator"].as_str().unwrap().starts_with("0x00010000"));

        let back: AssociationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_uint40_rejects_overflow_in_json() {
        let json = serde_json::json!({
            "initiator": "0x",
            "approver": "0x",
            "validAt": 1u64 << 41,
        });
        assert!(serde_json::from_value::<AssociationRecord>(json).is_err());
    }

    #[test]
    fn test_signed_association_state() {
        let signed = SignedAssociation::unsigned(
            sample()
                .with_valid_at(Uint40::from(100u32))
                .with_valid_until(Uint40::from(200u32)),
        );
        assert!(!signed.is_fully_signed());
        assert!(!signed.is_active_at(99));
        assert!(signed.is_active_at(100));
        assert!(!signed.is_active_at(200));

        let signed = signed
            .with_initiator_signature(1, vec![0xaa])
            .with_approver_signature(1, vec![0xbb])
            .with_revoked_at(Uint40::from(150u32));
        assert!(signed.is_fully_signed());
        assert!(signed.is_revoked());
        assert!(signed.is_active_at(149));
        assert!(!signed.is_active_at(150));
    }

    #[test]
    fn test_association_id_parse() {
        let id = sample().id();
        let parsed: AssociationId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("0x1234".parse::<AssociationId>().is_err());
    }
}
