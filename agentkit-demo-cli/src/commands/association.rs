//! Association commands - EIP-712 hashing of associated-account records

use std::path::Path;

use agentkit_lib::associations::hash::record_type_hash;
use agentkit_lib::associations::{
    domain_separator, struct_hash, structured_hash, AssociationRecord, SignedAssociation,
};
use anyhow::{Context, Result};

use crate::ui;

/// Load a record from JSON. A signed association wrapping a record is
/// accepted too.
pub fn load_record(path: &Path) -> Result<AssociationRecord> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    match serde_json::from_str::<AssociationRecord>(&text) {
        Ok(record) => Ok(record),
        Err(record_err) => serde_json::from_str::<SignedAssociation>(&text)
            .map(|signed| signed.record)
            .map_err(|_| record_err)
            .with_context(|| format!("{} is not an association record", path.display())),
    }
}

/// Print every hash involved in signing the record at `path`.
pub fn hash(path: &Path, verbose: bool) -> Result<()> {
    let record = load_record(path)?;

    ui::header("Association Record");
    if let Some(initiator) = record.initiator_account() {
        ui::key_value("Initiator", &initiator.to_string());
    }
    if let Some(approver) = record.approver_account() {
        ui::key_value("Approver", &approver.to_string());
    }
    if verbose {
        ui::hex_value("Type Hash", &record_type_hash());
    }
    ui::hex_value("Domain Separator", &domain_separator());
    ui::hex_value("Struct Hash", &struct_hash(&record));
    ui::hex_value("Signing Hash", &structured_hash(&record));
    ui::key_value("Association ID", &record.id().to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RECORD: &str = r#"{
        "initiator": "0x0001000003aa36a7140000000000000000000000000000000000000001",
        "approver": "0x0001000003aa36a7140000000000000000000000000000000000000002"
    }"#;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_plain_record() {
        let file = write_temp(RECORD);
        let record = load_record(file.path()).unwrap();
        assert_eq!(record.initiator_account().unwrap().chain_id, 11_155_111);
        assert!(hash(file.path(), true).is_ok());
    }

    #[test]
    fn test_load_signed_association() {
        let file = write_temp(&format!(r#"{{ "revokedAt": 0, "record": {} }}"#, RECORD));
        let record = load_record(file.path()).unwrap();
        assert_eq!(record.approver_account().unwrap().chain_id, 11_155_111);
    }

    #[test]
    fn test_load_rejects_other_json() {
        let file = write_temp(r#"{ "hello": "world" }"#);
        let err = load_record(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("not an association record"));
    }
}
