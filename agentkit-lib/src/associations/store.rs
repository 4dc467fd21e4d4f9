//! Read-only access to an association ledger or index.
//!
//! [`AssociationStore`] is the boundary to whatever holds signed association
//! records. The free functions below are what callers use; they add input
//! validation and prefix transport failures with the operation name.

use async_trait::async_trait;

use super::descriptor::AccountDescriptor;
use super::record::{AssociationId, SignedAssociation};
use crate::{AgentkitError, Result};

/// Query interface over stored associations.
#[async_trait]
pub trait AssociationStore: Send + Sync {
    /// Every association in which `account` is the initiator or the approver.
    async fn associations_for_account(
        &self,
        account: &AccountDescriptor,
    ) -> Result<Vec<SignedAssociation>>;

    /// A single association by id, `None` if unknown.
    async fn association(&self, id: &AssociationId) -> Result<Option<SignedAssociation>>;
}

/// Lists associations involving `account`.
///
/// # Examples
/// ```
/// # use agentkit_lib::associations::{get_associations_for_account, AccountDescriptor, AssociationStore};
/// # async fn demo(store: &impl AssociationStore) -> agentkit_lib::Result<()> {
/// let account = AccountDescriptor::parse(11155111, "0x0000000000000000000000000000000000000001")?;
/// for signed in get_associations_for_account(store, &account).await? {
///     println!("{}", signed.id());
/// }
/// # Ok(())
/// # }
/// ```
#[tracing::instrument(skip(store, account), fields(account = %account))]
pub async fn get_associations_for_account<S>(
    store: &S,
    account: &AccountDescriptor,
) -> Result<Vec<SignedAssociation>>
where
    S: AssociationStore + ?Sized,
{
    store
        .associations_for_account(account)
        .await
        .map_err(|err| map_transport_error("get_associations_for_account", err))
}

/// Fetches one association by id.
#[tracing::instrument(skip(store, id), fields(id = %id))]
pub async fn get_association<S>(store: &S, id: &AssociationId) -> Result<Option<SignedAssociation>>
where
    S: AssociationStore + ?Sized,
{
    store
        .association(id)
        .await
        .map_err(|err| map_transport_error("get_association", err))
}

/// Lists fully signed associations for an EVM account.
///
/// # Semantics
/// - `address` must be `0x` followed by 40 hex characters.
/// - Entries missing either signature are dropped. Revoked entries are kept;
///   check [`SignedAssociation::is_revoked`] when that matters.
#[tracing::instrument(skip(store))]
pub async fn get_signed_associations_for_evm_account<S>(
    store: &S,
    chain_id: u64,
    address: &str,
) -> Result<Vec<SignedAssociation>>
where
    S: AssociationStore + ?Sized,
{
    let account = AccountDescriptor::parse(chain_id, address)?;
    let all = store
        .associations_for_account(&account)
        .await
        .map_err(|err| map_transport_error("get_signed_associations_for_evm_account", err))?;

    let total = all.len();
    let signed: Vec<_> = all.into_iter().filter(|a| a.is_fully_signed()).collect();
    tracing::debug!(total, signed = signed.len(), "filtered associations");
    Ok(signed)
}

fn map_transport_error(label: &'static str, err: AgentkitError) -> AgentkitError {
    match err {
        AgentkitError::Transport(msg) => AgentkitError::Transport(format!("{label}: {msg}")),
        _ => err,
    }
}
