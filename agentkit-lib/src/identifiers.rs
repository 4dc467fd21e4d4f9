//! Agent Identifier Parser
//!
//! This module parses and canonicalizes the three agent identifier notations:
//! - `did:8004:<chainId>:<agentId>` for agents in the on-chain agent registry
//! - `did:ethr:<chainId>:0x<40 hex>` for plain account references
//! - UAIDs such as `uaid:did:ethr:<chainId>:0x<40 hex>;registry=...`, which wrap a
//!   `did:ethr` core with routing extensions
//!
//! # Examples
//!
//! ```rust
//! use agentkit_lib::identifiers::{canonicalize_uaid, parse_did8004, AgentIdentifier};
//!
//! let did = parse_did8004("did:8004:11155111:42").unwrap();
//! assert_eq!(did.chain_id(), 11155111);
//! assert_eq!(did.to_string(), "did:8004:11155111:42");
//!
//! let uaid = canonicalize_uaid(
//!     "uaid:did:ethr:11155111:0xABCDEF0123456789ABCDEF0123456789ABCDEF01;registry=x",
//! );
//! assert_eq!(
//!     uaid.as_deref(),
//!     Some("uaid:did:ethr:11155111:0xabcdef0123456789abcdef0123456789abcdef01")
//! );
//!
//! let id: AgentIdentifier = "did:ethr:1:0x0000000000000000000000000000000000000001"
//!     .parse()
//!     .unwrap();
//! assert_eq!(id.notation(), "did:ethr");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use alloy_primitives::{Address, U256};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::evm::{format_address, parse_address, parse_uint};
use crate::{AgentkitError, Result};

/// Literal prefix of a DID-8004 identifier.
pub const DID_8004_PREFIX: &str = "did:8004:";

/// Literal prefix of a `did:ethr` identifier.
pub const DID_ETHR_PREFIX: &str = "did:ethr:";

/// Scheme tag of the canonical UAID form.
pub const UAID_PREFIX: &str = "uaid:";

// Unanchored: UAIDs appear inside larger tagged strings. Chain ids are ASCII
// digits only. The trailing group rejects a 41st hex digit so a longer hex
// run never matches as an address.
static UAID_CORE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"did:ethr:([0-9]+):(0x[0-9a-fA-F]{40})(?:[^0-9a-fA-F]|$)")
        .expect("uaid regex is valid")
});

static DID_ETHR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^did:ethr:([0-9]+):(0x[0-9a-fA-F]{40})$").expect("did:ethr regex is valid")
});

/// An agent registered in the on-chain agent registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Did8004 {
    chain_id: u32,
    agent_id: U256,
}

impl Did8004 {
    /// Create a DID-8004 from its parts. The chain id must be positive.
    pub fn new(chain_id: u32, agent_id: U256) -> Result<Self> {
        if chain_id == 0 {
            return Err(AgentkitError::invalid_identifier(
                format!("{}{}:{}", DID_8004_PREFIX, chain_id, agent_id),
                "chain id must be positive",
            ));
        }
        Ok(Self { chain_id, agent_id })
    }

    /// Chain the agent registry lives on.
    pub fn chain_id(&self) -> u32 {
        self.chain_id
    }

    /// Numeric agent id.
    pub fn agent_id(&self) -> U256 {
        self.agent_id
    }
}

impl fmt::Display for Did8004 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}", DID_8004_PREFIX, self.chain_id, self.agent_id)
    }
}

impl FromStr for Did8004 {
    type Err = AgentkitError;

    fn from_str(s: &str) -> Result<Self> {
        parse_did8004(s)
    }
}

/// A `did:ethr` account reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DidEthr {
    chain_id: u32,
    account: Address,
}

impl DidEthr {
    /// Create a `did:ethr` reference. The chain id must be positive.
    pub fn new(chain_id: u32, account: Address) -> Result<Self> {
        if chain_id == 0 {
            return Err(AgentkitError::invalid_identifier(
                format!("{}{}:{}", DID_ETHR_PREFIX, chain_id, format_address(&account)),
                "chain id must be positive",
            ));
        }
        Ok(Self { chain_id, account })
    }

    /// Chain id.
    pub fn chain_id(&self) -> u32 {
        self.chain_id
    }

    /// Referenced account.
    pub fn account(&self) -> Address {
        self.account
    }
}

impl fmt::Display for DidEthr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}",
            DID_ETHR_PREFIX,
            self.chain_id,
            format_address(&self.account)
        )
    }
}

/// A UAID: a `did:ethr` core plus an opaque extension tail.
///
/// The tail (for example `;registry=x;proto=a2a`) is preserved but never
/// interpreted, and the canonical form drops it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Uaid {
    inner: DidEthr,
    raw_tail: String,
}

impl Uaid {
    /// The wrapped `did:ethr` reference.
    pub fn inner(&self) -> &DidEthr {
        &self.inner
    }

    /// Everything that followed the core identifier in the parsed input.
    pub fn raw_tail(&self) -> &str {
        &self.raw_tail
    }

    /// Canonical `uaid:did:ethr:<chainId>:<lowercase address>` form.
    pub fn canonical(&self) -> String {
        format!("{}{}", UAID_PREFIX, self.inner)
    }
}

impl fmt::Display for Uaid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", UAID_PREFIX, self.inner)
    }
}

/// A parsed agent identifier in one of the supported notations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AgentIdentifier {
    /// `did:8004:<chainId>:<agentId>`
    Did8004(Did8004),
    /// `did:ethr:<chainId>:<address>`
    DidEthr(DidEthr),
    /// `uaid:did:ethr:<chainId>:<address>[;extensions]`
    Uaid(Uaid),
}

impl AgentIdentifier {
    /// Parse any supported notation.
    ///
    /// `did:8004:` and `did:ethr:` prefixes select their notation strictly; any
    /// other string containing a `did:ethr` core is treated as a UAID.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AgentkitError::invalid_identifier(input, "identifier is empty"));
        }
        let decoded = percent_decode_or_raw(trimmed);

        if decoded.starts_with(DID_8004_PREFIX) {
            return parse_did8004(trimmed).map(Self::Did8004);
        }
        if decoded.starts_with(DID_ETHR_PREFIX) {
            return parse_did_ethr(&decoded).map(Self::DidEthr);
        }
        parse_uaid(&decoded).map(Self::Uaid).ok_or_else(|| {
            AgentkitError::invalid_identifier(&*decoded, "unrecognized identifier notation")
        })
    }

    /// Notation name used in error messages and CLI output.
    pub fn notation(&self) -> &'static str {
        match self {
            Self::Did8004(_) => "did:8004",
            Self::DidEthr(_) => "did:ethr",
            Self::Uaid(_) => "uaid",
        }
    }

    /// Chain id carried by the identifier.
    pub fn chain_id(&self) -> u32 {
        match self {
            Self::Did8004(did) => did.chain_id(),
            Self::DidEthr(did) => did.chain_id(),
            Self::Uaid(uaid) => uaid.inner().chain_id(),
        }
    }

    /// Get the DID-8004 value if this is one.
    pub fn as_did8004(&self) -> Option<&Did8004> {
        match self {
            Self::Did8004(did) => Some(did),
            _ => None,
        }
    }

    /// Canonical string form; equal identifiers always produce equal strings.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AgentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Did8004(did) => did.fmt(f),
            Self::DidEthr(did) => did.fmt(f),
            Self::Uaid(uaid) => uaid.fmt(f),
        }
    }
}

impl FromStr for AgentIdentifier {
    type Err = AgentkitError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for AgentIdentifier {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical())
    }
}

impl<'de> Deserialize<'de> for AgentIdentifier {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Parse a DID-8004 identifier.
///
/// The input may be percent-encoded; when decoding fails the raw string is
/// used instead. The chain id is segment 2, and every remaining segment
/// (rejoined with `:`) forms the agent id, which must be a non-negative integer
/// in decimal or `0x` hex that fits in 256 bits.
///
/// # Errors
///
/// Returns [`AgentkitError::InvalidIdentifier`] when the input is empty, the
/// `did:8004:` prefix is missing, there are fewer than four segments, the chain
/// id is not a positive 32-bit integer, or the agent id is not an integer.
pub fn parse_did8004(input: &str) -> Result<Did8004> {
    if input.is_empty() {
        return Err(AgentkitError::invalid_identifier(input, "identifier is empty"));
    }
    let decoded = percent_decode_or_raw(input);

    if !decoded.starts_with(DID_8004_PREFIX) {
        return Err(AgentkitError::invalid_identifier(
            &*decoded,
            "missing did:8004: prefix",
        ));
    }

    let segments: Vec<&str> = decoded.split(':').collect();
    if segments.len() < 4 {
        return Err(AgentkitError::invalid_identifier(
            &*decoded,
            "expected did:8004:<chainId>:<agentId>",
        ));
    }

    let chain_id = parse_chain_id(segments[2]).ok_or_else(|| {
        AgentkitError::invalid_identifier(
            &*decoded,
            format!("chain id '{}' is not a positive integer", segments[2]),
        )
    })?;

    let raw_agent_id = segments[3..].join(":");
    let agent_id = parse_uint(&raw_agent_id).ok_or_else(|| {
        AgentkitError::invalid_identifier(
            &*decoded,
            format!("agent id '{}' is not a non-negative integer", raw_agent_id),
        )
    })?;

    Ok(Did8004 { chain_id, agent_id })
}

/// Parse a strict `did:ethr:<chainId>:0x<40 hex>` identifier.
pub fn parse_did_ethr(input: &str) -> Result<DidEthr> {
    let captures = DID_ETHR_REGEX
        .captures(input.trim())
        .ok_or_else(|| AgentkitError::invalid_identifier(input, "expected did:ethr:<chainId>:<address>"))?;

    let chain_id = parse_chain_id(&captures[1]).ok_or_else(|| {
        AgentkitError::invalid_identifier(input, "chain id is not a positive integer")
    })?;
    let account = parse_address(&captures[2])?;

    Ok(DidEthr { chain_id, account })
}

/// Extract a UAID from a possibly tagged string.
///
/// Returns `None` (never an error) for empty input, when no
/// `did:ethr:<digits>:0x<40 hex>` core is present, or when the chain id is not
/// a positive 32-bit integer. The core does not need to start the string, so a
/// leading scheme tag such as `uaid:` is ignored.
pub fn parse_uaid(input: &str) -> Option<Uaid> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let captures = UAID_CORE_REGEX.captures(trimmed)?;
    let chain_id = parse_chain_id(&captures[1])?;
    let address_match = captures.get(2)?;
    let address = address_match.as_str().to_ascii_lowercase();
    let account = parse_address(&address).ok()?;

    Some(Uaid {
        inner: DidEthr { chain_id, account },
        raw_tail: trimmed[address_match.end()..].to_string(),
    })
}

/// Normalize any UAID-bearing string to `uaid:did:ethr:<chainId>:<lowercase address>`.
///
/// Extension segments after the core identifier are discarded. The function is
/// idempotent.
pub fn canonicalize_uaid(input: &str) -> Option<String> {
    parse_uaid(input).map(|uaid| uaid.canonical())
}

/// Percent-decode `input`, falling back to the raw string when the decoded
/// bytes are not valid UTF-8.
fn percent_decode_or_raw(input: &str) -> Cow<'_, str> {
    urlencoding::decode(input).unwrap_or(Cow::Borrowed(input))
}

/// Decimal digits only, positive, fits in 32 bits.
fn parse_chain_id(segment: &str) -> Option<u32> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse::<u32>().ok().filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR_UPPER: &str = "0xABCDEF0123456789ABCDEF0123456789ABCDEF01";
    const ADDR_LOWER: &str = "0xabcdef0123456789abcdef0123456789abcdef01";

    #[test]
    fn test_parse_did8004() {
        let did = parse_did8004("did:8004:11155111:42").unwrap();
        assert_eq!(did.chain_id(), 11155111);
        assert_eq!(did.agent_id(), U256::from(42u64));
    }

    #[test]
    fn test_parse_did8004_too_few_segments() {
        let err = parse_did8004("did:8004:11155111").unwrap_err();
        assert!(matches!(err, AgentkitError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_parse_did8004_percent_encoded() {
        let did = parse_did8004("did%3A8004%3A84532%3A7").unwrap();
        assert_eq!(did.chain_id(), 84532);
        assert_eq!(did.agent_id(), U256::from(7u64));
    }

    #[test]
    fn test_parse_did8004_invalid_utf8_escape_falls_back_to_raw() {
        // %FF does not decode to UTF-8, so the raw string is parsed and the
        // agent id segment is rejected rather than the decode step.
        let err = parse_did8004("did:8004:1:%FF").unwrap_err();
        match err {
            AgentkitError::InvalidIdentifier { input, .. } => assert_eq!(input, "did:8004:1:%FF"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_did8004_rejects_bad_chain() {
        assert!(parse_did8004("did:8004:0:1").is_err());
        assert!(parse_did8004("did:8004:-1:1").is_err());
        assert!(parse_did8004("did:8004:abc:1").is_err());
        assert!(parse_did8004("did:8004:4294967296:1").is_err());
    }

    #[test]
    fn test_parse_did8004_agent_id_beyond_u64() {
        let did = parse_did8004("did:8004:1:18446744073709551616").unwrap();
        assert_eq!(did.agent_id(), U256::from(u64::MAX) + U256::from(1u64));
        assert_eq!(did.to_string(), "did:8004:1:18446744073709551616");
    }

    #[test]
    fn test_parse_did8004_hex_agent_id_canonicalizes_to_decimal() {
        let did = parse_did8004("did:8004:1:0x2a").unwrap();
        assert_eq!(did.to_string(), "did:8004:1:42");
    }

    #[test]
    fn test_parse_did8004_colon_in_agent_id_is_kept_together() {
        let err = parse_did8004("did:8004:1:42:extra").unwrap_err();
        match err {
            AgentkitError::InvalidIdentifier { reason, .. } => {
                assert!(reason.contains("42:extra"), "reason was {reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_did8004_rejects_wrong_prefix() {
        assert!(parse_did8004("").is_err());
        assert!(parse_did8004("did:ethr:1:42").is_err());
        assert!(parse_did8004("did:8004:1:").is_err());
    }

    #[test]
    fn test_parse_did_ethr() {
        let did = parse_did_ethr(&format!("did:ethr:10:{}", ADDR_UPPER)).unwrap();
        assert_eq!(did.chain_id(), 10);
        assert_eq!(did.to_string(), format!("did:ethr:10:{}", ADDR_LOWER));
        assert!(parse_did_ethr("did:ethr:10:0x1234").is_err());
    }

    #[test]
    fn test_parse_uaid_embedded() {
        let input = format!("  uaid:did:ethr:11155111:{};registry=x;proto=a2a ", ADDR_UPPER);
        let uaid = parse_uaid(&input).unwrap();
        assert_eq!(uaid.inner().chain_id(), 11155111);
        assert_eq!(format_address(&uaid.inner().account()), ADDR_LOWER);
        assert_eq!(uaid.raw_tail(), ";registry=x;proto=a2a");
    }

    #[test]
    fn test_parse_uaid_soft_failures() {
        assert!(parse_uaid("").is_none());
        assert!(parse_uaid("   ").is_none());
        assert!(parse_uaid("uaid:aid:somethingelse").is_none());
        assert!(parse_uaid(&format!("uaid:did:ethr:0:{}", ADDR_LOWER)).is_none());
        assert!(parse_uaid(&format!("uaid:did:ethr:99999999999:{}", ADDR_LOWER)).is_none());
        // 41 hex digits is not an address
        assert!(parse_uaid(&format!("uaid:did:ethr:1:{}a", ADDR_LOWER)).is_none());
    }

    #[test]
    fn test_canonicalize_uaid() {
        let input = format!("uaid:did:ethr:11155111:{};registry=x", ADDR_UPPER);
        assert_eq!(
            canonicalize_uaid(&input).as_deref(),
            Some("uaid:did:ethr:11155111:0xabcdef0123456789abcdef0123456789abcdef01")
        );
    }

    #[test]
    fn test_canonicalize_uaid_is_idempotent() {
        let once = canonicalize_uaid(&format!("did:ethr:5:{};x=y", ADDR_UPPER)).unwrap();
        let twice = canonicalize_uaid(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_agent_identifier_dispatch() {
        let id = AgentIdentifier::parse("did:8004:1:5").unwrap();
        assert_eq!(id.notation(), "did:8004");
        assert!(id.as_did8004().is_some());

        let id = AgentIdentifier::parse(&format!("did:ethr:1:{}", ADDR_UPPER)).unwrap();
        assert_eq!(id.notation(), "did:ethr");
        assert_eq!(id.canonical(), format!("did:ethr:1:{}", ADDR_LOWER));

        let id = AgentIdentifier::parse(&format!("uaid:did:ethr:1:{};r=1", ADDR_UPPER)).unwrap();
        assert_eq!(id.notation(), "uaid");
        assert_eq!(id.canonical(), format!("uaid:did:ethr:1:{}", ADDR_LOWER));
        assert_eq!(id.chain_id(), 1);

        assert!(AgentIdentifier::parse("").is_err());
        assert!(AgentIdentifier::parse("did:web:example.com").is_err());
    }

    #[test]
    fn test_agent_identifier_serde_uses_canonical_string() {
        let id = AgentIdentifier::parse("did:8004:1:0x10").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"did:8004:1:16\"");
        let back: AgentIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_uaid_skips_core_with_non_ascii_digits() {
        let input = format!(
            "x did:ethr:\u{0661}:0x{} uaid:did:ethr:1:0x{}",
            "a1".repeat(20),
            "a2".repeat(20)
        );
        assert_eq!(
            canonicalize_uaid(&input),
            Some(format!("uaid:did:ethr:1:0x{}", "a2".repeat(20)))
        );
        assert!(parse_did_ethr(&format!("did:ethr:\u{0661}:0x{}", "a1".repeat(20))).is_err());
    }
}
