//! Test fixtures and data generators.

use alloy_primitives::Address;

use crate::associations::{AccountDescriptor, AssociationRecord, SignedAssociation, Uint40};
use crate::evm::parse_address;

/// Collection of commonly used test fixtures.
pub struct TestFixtures;

impl TestFixtures {
    /// Chain with a configured bundler, registry and agent.
    pub const CHAIN_ID: u64 = 11_155_111;

    /// Chain known to nothing by default.
    pub const OTHER_CHAIN_ID: u64 = 84_532;

    /// Agent registered on [`Self::CHAIN_ID`].
    pub const AGENT_ID: u64 = 42;

    /// Validator address.
    pub const VALIDATOR: &'static str = "0x00000000000000000000000000000000000000aa";

    /// Validation registry contract.
    pub const REGISTRY: &'static str = "0x00000000000000000000000000000000000000fe";

    /// Smart account address used by the mock signer.
    pub const SMART_ACCOUNT: &'static str = "0x000000000000000000000000000000000000005a";

    /// Bundler endpoint for [`Self::CHAIN_ID`].
    pub const BUNDLER_URL: &'static str = "https://bundler.test/sepolia";

    /// Request hash returned by the mock registry client.
    pub const REGISTRY_REQUEST_HASH: &'static str =
        "0x3333333333333333333333333333333333333333333333333333333333333333";

    /// User operation hash returned by the mock bundler.
    pub const USER_OP_HASH: &'static str =
        "0x1111111111111111111111111111111111111111111111111111111111111111";

    /// Transaction hash in the mock receipt.
    pub const TX_HASH: &'static str =
        "0x2222222222222222222222222222222222222222222222222222222222222222";

    /// `maxFeePerGas` returned by the mock gas oracle.
    pub const MAX_FEE_PER_GAS: &'static str = "0x3b9aca00";

    /// Sample addresses, mixed casing.
    pub const ADDRESSES: &'static [&'static str] = &[
        "0x0000000000000000000000000000000000000001",
        "0xABCDEF0123456789ABCDEF0123456789ABCDEF01",
        "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045",
    ];

    /// Well-formed identifiers with their canonical forms.
    pub const IDENTIFIERS: &'static [(&'static str, &'static str)] = &[
        ("did:8004:11155111:42", "did:8004:11155111:42"),
        ("did%3A8004%3A84532%3A0x2a", "did:8004:84532:42"),
        (
            "did:ethr:10:0xABCDEF0123456789ABCDEF0123456789ABCDEF01",
            "did:ethr:10:0xabcdef0123456789abcdef0123456789abcdef01",
        ),
        (
            "uaid:did:ethr:11155111:0xABCDEF0123456789ABCDEF0123456789ABCDEF01;registry=x",
            "uaid:did:ethr:11155111:0xabcdef0123456789abcdef0123456789abcdef01",
        ),
    ];

    /// Parsed address.
    pub fn address(text: &str) -> Address {
        parse_address(text).expect("fixture address is valid")
    }

    /// Validator as an [`Address`].
    pub fn validator() -> Address {
        Self::address(Self::VALIDATOR)
    }

    /// Registry as an [`Address`].
    pub fn registry() -> Address {
        Self::address(Self::REGISTRY)
    }

    /// Smart account as an [`Address`].
    pub fn smart_account() -> Address {
        Self::address(Self::SMART_ACCOUNT)
    }

    /// `did:8004` string for the fixture agent.
    pub fn did8004() -> String {
        format!("did:8004:{}:{}", Self::CHAIN_ID, Self::AGENT_ID)
    }
}

/// Account on [`TestFixtures::CHAIN_ID`] whose address ends in `last_byte`.
pub fn test_account(last_byte: u8) -> AccountDescriptor {
    let mut bytes = [0u8; 20];
    bytes[19] = last_byte;
    AccountDescriptor::new(TestFixtures::CHAIN_ID, Address::from(bytes))
}

/// Record between two fixture accounts, valid from t=1000 with no expiry.
pub fn test_record(initiator: u8, approver: u8) -> AssociationRecord {
    AssociationRecord::between(&test_account(initiator), &test_account(approver))
        .with_valid_at(Uint40::from(1_000u32))
}

/// [`test_record`] with placeholder 65-byte signatures from both parties.
pub fn signed_test_association(initiator: u8, approver: u8) -> SignedAssociation {
    SignedAssociation::unsigned(test_record(initiator, approver))
        .with_initiator_signature(1, vec![initiator; 65])
        .with_approver_signature(1, vec![approver; 65])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::AgentIdentifier;

    #[test]
    fn test_fixture_identifiers_canonicalize() {
        for (input, canonical) in TestFixtures::IDENTIFIERS {
            let parsed = AgentIdentifier::parse(input).unwrap();
            assert_eq!(parsed.canonical(), *canonical, "{}", input);
        }
    }

    #[test]
    fn test_fixture_addresses_parse() {
        for address in TestFixtures::ADDRESSES {
            assert!(parse_address(address).is_ok());
        }
        assert_eq!(test_account(7).address.as_slice()[19], 7);
    }

    #[test]
    fn test_signed_fixture_is_fully_signed() {
        assert!(signed_test_association(1, 2).is_fully_signed());
        assert_ne!(test_record(1, 2).id(), test_record(2, 1).id());
    }
}
