//! EIP-712 structured hashing of association records.
//!
//! ```text
//! domain = keccak(keccak(DOMAIN_TYPE) || keccak(name) || keccak(version))
//! struct = keccak(keccak(RECORD_TYPE) || keccak(initiator) || keccak(approver)
//!                 || validAt[5] || validUntil[5] || interfaceId[4] || keccak(data))
//! hash   = keccak(0x19 0x01 || domain || struct)
//! ```
//!
//! Absent `validAt` / `validUntil` are hashed as zero, so a record with an
//! explicit zero hashes identically to one without the field.

use super::record::{AssociationRecord, Uint40};
use crate::evm::keccak256;

/// EIP-712 domain type string.
pub const DOMAIN_TYPE: &str = "EIP712Domain(string name,string version)";

/// Domain name.
pub const DOMAIN_NAME: &str = "AssociatedAccounts";

/// Domain version.
pub const DOMAIN_VERSION: &str = "1";

/// Record type string.
pub const RECORD_TYPE: &str = "AssociatedAccountRecord(bytes initiator,bytes approver,uint40 validAt,uint40 validUntil,bytes4 interfaceId,bytes data)";

const EIP712_PREFIX: [u8; 2] = [0x19, 0x01];

/// Domain separator for the `AssociatedAccounts` v1 domain.
pub fn domain_separator() -> [u8; 32] {
    let mut buf = Vec::with_capacity(96);
    buf.extend_from_slice(&keccak256(DOMAIN_TYPE));
    buf.extend_from_slice(&keccak256(DOMAIN_NAME));
    buf.extend_from_slice(&keccak256(DOMAIN_VERSION));
    keccak256(buf)
}

/// Type hash of [`RECORD_TYPE`].
pub fn record_type_hash() -> [u8; 32] {
    keccak256(RECORD_TYPE)
}

/// Struct hash of a record.
pub fn struct_hash(record: &AssociationRecord) -> [u8; 32] {
    let valid_at = record.valid_at.unwrap_or(Uint40::ZERO);
    let valid_until = record.valid_until.unwrap_or(Uint40::ZERO);

    let mut buf = Vec::with_capacity(32 * 4 + 5 + 5 + 4);
    buf.extend_from_slice(&record_type_hash());
    buf.extend_from_slice(&keccak256(&record.initiator));
    buf.extend_from_slice(&keccak256(&record.approver));
    buf.extend_from_slice(&valid_at.to_be_bytes());
    buf.extend_from_slice(&valid_until.to_be_bytes());
    buf.extend_from_slice(&record.interface_id);
    buf.extend_from_slice(&keccak256(&record.data));
    keccak256(buf)
}

/// Final signing hash of a record.
pub fn structured_hash(record: &AssociationRecord) -> [u8; 32] {
    let mut buf = Vec::with_capacity(2 + 64);
    buf.extend_from_slice(&EIP712_PREFIX);
    buf.extend_from_slice(&domain_separator());
    buf.extend_from_slice(&struct_hash(record));
    keccak256(buf)
}
