//! Identifier commands - parse and canonicalize agent identifiers

use agentkit_lib::identifiers::{parse_uaid, AgentIdentifier};
use anyhow::{anyhow, Result};

use crate::ui;

/// Parse any supported notation and print its parts.
pub fn resolve(input: &str, verbose: bool) -> Result<()> {
    let identifier = AgentIdentifier::parse(input)?;
    tracing::debug!(notation = identifier.notation(), "parsed identifier");

    ui::header("Agent Identifier");
    ui::key_value("Notation", identifier.notation());
    ui::key_value("Chain ID", &identifier.chain_id().to_string());
    match &identifier {
        AgentIdentifier::Did8004(did) => {
            ui::key_value("Agent ID", &did.agent_id().to_string());
        }
        AgentIdentifier::DidEthr(did) => {
            ui::key_value("Account", &did.to_string());
        }
        AgentIdentifier::Uaid(uaid) => {
            ui::key_value("Account", &uaid.inner().to_string());
            if verbose && !uaid.raw_tail().is_empty() {
                ui::key_value("Extensions", uaid.raw_tail());
            }
        }
    }
    ui::key_value("Canonical", &identifier.canonical());
    Ok(())
}

/// Print the canonical UAID for `input`.
pub fn uaid(input: &str, verbose: bool) -> Result<()> {
    let uaid = parse_uaid(input).ok_or_else(|| anyhow!("No did:ethr core found in '{}'", input))?;

    if verbose && !uaid.raw_tail().is_empty() {
        ui::info(&format!("Dropping extensions: {}", uaid.raw_tail()));
    }
    println!("{}", uaid.canonical());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_accepts_each_notation() {
        resolve("did:8004:84532:7", false).unwrap();
        resolve("did%3A8004%3A84532%3A7", false).unwrap();
        resolve("did:ethr:1:0x00000000000000000000000000000000000000aa", false).unwrap();
        resolve(
            "uaid:did:ethr:1:0x00000000000000000000000000000000000000AA;proto=a2a",
            true,
        )
        .unwrap();
    }

    #[test]
    fn test_resolve_rejects_garbage() {
        assert!(resolve("not-an-identifier", false).is_err());
        assert!(resolve("did:8004:0:1", false).is_err());
    }

    #[test]
    fn test_uaid_requires_core() {
        assert!(uaid("uaid:did:ethr:1:0x00000000000000000000000000000000000000aa", false).is_ok());
        assert!(uaid("uaid:nothing-here", false).is_err());
    }
}
