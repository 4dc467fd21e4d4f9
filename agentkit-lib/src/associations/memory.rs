//! In-memory association store.
//!
//! Useful for tests and local tooling. Records are indexed by the canonical
//! EVM-V1 bytes of both parties, so lookups by either side are direct even
//! when a record carries a non-minimal chain id encoding.
//!
//! # Thread Safety
//!
//! Backed by `RwLock`. A poisoned lock surfaces as
//! [`AgentkitError::Internal`] rather than a panic.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use super::descriptor::AccountDescriptor;
use super::record::{AssociationId, SignedAssociation};
use super::store::AssociationStore;
use crate::{AgentkitError, Result};

#[derive(Default)]
struct Inner {
    by_id: HashMap<AssociationId, SignedAssociation>,
    by_account: HashMap<Vec<u8>, BTreeSet<AssociationId>>,
}

/// `RwLock`-backed [`AssociationStore`].
#[derive(Default)]
pub struct MemoryAssociationStore {
    inner: RwLock<Inner>,
}

/// Index key for one party: the minimal EVM-V1 encoding when the bytes
/// decode, the raw bytes otherwise.
fn account_key(party: &[u8]) -> Vec<u8> {
    match AccountDescriptor::from_evm_v1(party) {
        Some(account) => account.to_evm_v1(),
        None => party.to_vec(),
    }
}

fn lock_error(context: &str) -> AgentkitError {
    AgentkitError::Internal(format!(
        "MemoryAssociationStore: lock poisoned during {}",
        context
    ))
}

impl MemoryAssociationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an association, returning its id.
    pub fn insert(&self, association: SignedAssociation) -> Result<AssociationId> {
        let id = association.id();
        let mut inner = self.inner.write().map_err(|_| lock_error("insert"))?;

        for party in [&association.record.initiator, &association.record.approver] {
            inner
                .by_account
                .entry(account_key(party))
                .or_default()
                .insert(id);
        }
        inner.by_id.insert(id, association);
        Ok(id)
    }

    /// Set the revocation timestamp of a stored association.
    ///
    /// Returns `false` when the id is unknown.
    pub fn revoke(&self, id: &AssociationId, revoked_at: super::Uint40) -> Result<bool> {
        let mut inner = self.inner.write().map_err(|_| lock_error("revoke"))?;
        match inner.by_id.get_mut(id) {
            Some(entry) => {
                entry.revoked_at = revoked_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Number of stored associations. Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.by_id.len()).unwrap_or(0)
    }

    /// Whether the store is empty. Returns true if the lock is poisoned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AssociationStore for MemoryAssociationStore {
    async fn associations_for_account(
        &self,
        account: &AccountDescriptor,
    ) -> Result<Vec<SignedAssociation>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| lock_error("associations_for_account"))?;

        let Some(ids) = inner.by_account.get(&account.to_evm_v1()) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| inner.by_id.get(id).cloned())
            .collect())
    }

    async fn association(&self, id: &AssociationId) -> Result<Option<SignedAssociation>> {
        let inner = self.inner.read().map_err(|_| lock_error("association"))?;
        Ok(inner.by_id.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::associations::{
        get_association, get_associations_for_account, get_signed_associations_for_evm_account,
        AssociationRecord, Uint40,
    };
    use crate::test_utils::AssociationAssertion;

    const ALICE: &str = "0x00000000000000000000000000000000000000a1";
    const BOB: &str = "0x00000000000000000000000000000000000000b0";
    const CAROL: &str = "0x00000000000000000000000000000000000000c0";

    fn account(address: &str) -> AccountDescriptor {
        AccountDescriptor::parse(11155111, address).unwrap()
    }

    fn signed(initiator: &str, approver: &str) -> SignedAssociation {
        SignedAssociation::unsigned(AssociationRecord::between(
            &account(initiator),
            &account(approver),
        ))
        .with_initiator_signature(1, vec![0x01; 65])
        .with_approver_signature(1, vec![0x02; 65])
    }

    #[tokio::test]
    async fn test_lookup_by_either_party() {
        let store = MemoryAssociationStore::new();
        store.insert(signed(ALICE, BOB)).unwrap();
        store.insert(signed(CAROL, ALICE)).unwrap();

        let alice = get_associations_for_account(&store, &account(ALICE))
            .await
            .unwrap();
        assert_eq!(alice.len(), 2);
        for association in &alice {
            AssociationAssertion::new(association)
                .fully_signed()
                .not_revoked()
                .assert();
        }

        let bob = get_associations_for_account(&store, &account(BOB))
            .await
            .unwrap();
        assert_eq!(bob.len(), 1);

        let other_chain = AccountDescriptor::parse(1, ALICE).unwrap();
        assert!(get_associations_for_account(&store, &other_chain)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let store = MemoryAssociationStore::new();
        let id = store.insert(signed(ALICE, BOB)).unwrap();

        let found = get_association(&store, &id).await.unwrap().unwrap();
        assert_eq!(found.id(), id);

        let missing = AssociationId([0u8; 32]);
        assert!(get_association(&store, &missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_signed_filter_drops_partial_signatures() {
        let store = MemoryAssociationStore::new();
        store.insert(signed(ALICE, BOB)).unwrap();
        store
            .insert(
                SignedAssociation::unsigned(
                    AssociationRecord::between(&account(ALICE), &account(CAROL))
                        .with_data(vec![0x01]),
                )
                .with_initiator_signature(1, vec![0x01; 65]),
            )
            .unwrap();
        assert_eq!(store.len(), 2);

        let signed = get_signed_associations_for_evm_account(&store, 11155111, ALICE)
            .await
            .unwrap();
        assert_eq!(signed.len(), 1);
        AssociationAssertion::new(&signed[0])
            .fully_signed()
            .initiated_by(11155111, ALICE)
            .assert();
    }

    #[tokio::test]
    async fn test_signed_lookup_validates_address() {
        let store = MemoryAssociationStore::new();
        let err = get_signed_associations_for_evm_account(&store, 1, "0xnope")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentkitError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_revoke() {
        let store = MemoryAssociationStore::new();
        let id = store.insert(signed(ALICE, BOB)).unwrap();
        assert!(store.revoke(&id, Uint40::from(10u32)).unwrap());

        let found = get_association(&store, &id).await.unwrap().unwrap();
        assert!(!AssociationAssertion::new(&found).not_revoked().check());
        assert!(!store
            .revoke(&AssociationId([1u8; 32]), Uint40::from(10u32))
            .unwrap());
    }

    #[tokio::test]
    async fn test_non_minimal_descriptor_is_found() {
        // chain id 1 written as two bytes
        let mut initiator = vec![0x00, 0x01, 0x00, 0x00, 0x02, 0x00, 0x01, 0x14];
        initiator.extend_from_slice(&[0xa1; 20]);
        let decoded = AccountDescriptor::from_evm_v1(&initiator).unwrap();
        assert_ne!(decoded.to_evm_v1(), initiator);

        let store = MemoryAssociationStore::new();
        store
            .insert(SignedAssociation::unsigned(AssociationRecord::new(
                initiator,
                account(BOB).to_evm_v1(),
            )))
            .unwrap();

        let found = get_associations_for_account(&store, &decoded).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(AssociationAssertion::new(&found[0])
            .initiated_by(1, "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1")
            .check());
    }

    #[tokio::test]
    async fn test_undecodable_party_is_indexed_raw() {
        let store = MemoryAssociationStore::new();
        store
            .insert(SignedAssociation::unsigned(AssociationRecord::new(
                vec![0xde, 0xad],
                account(BOB).to_evm_v1(),
            )))
            .unwrap();

        let bob = get_associations_for_account(&store, &account(BOB)).await.unwrap();
        assert_eq!(bob.len(), 1);
    }
}
