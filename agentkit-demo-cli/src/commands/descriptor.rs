//! Descriptor commands - EVM-V1 account descriptor codec

use agentkit_lib::associations::{decode_evm_v1_hex, encode_evm_v1, AccountDescriptor};
use agentkit_lib::evm::to_hex_prefixed;
use anyhow::{anyhow, Result};

use crate::ui;

/// Encode `(chain_id, address)` and print the hex blob.
pub fn encode(chain_id: u64, address: &str, verbose: bool) -> Result<()> {
    let bytes = encode_evm_v1(chain_id, address)?;

    if verbose {
        let descriptor = AccountDescriptor::parse(chain_id, address)?;
        ui::info(&format!("Account {}", descriptor));
        ui::info(&format!("{} bytes", bytes.len()));
    }
    println!("{}", to_hex_prefixed(&bytes));
    Ok(())
}

/// Decode a hex blob and print the account.
pub fn decode(input: &str, verbose: bool) -> Result<()> {
    let descriptor = decode_evm_v1_hex(input)
        .ok_or_else(|| anyhow!("'{}' is not a valid EVM-V1 descriptor", input))?;

    if verbose {
        ui::header("Account Descriptor");
        ui::key_value("Chain ID", &descriptor.chain_id.to_string());
        ui::key_value("Address", &descriptor.address_hex());
    }
    println!("{}", descriptor);
    Ok(())
}
