//! Associated-account records.
//!
//! - [`descriptor`]: the EVM-V1 codec for `(chain id, address)` pairs.
//! - [`record`] and [`hash`]: record types and their EIP-712 signing hash.
//! - `store`: read-only query facade, with [`MemoryAssociationStore`] as an
//!   in-process implementation.

pub mod descriptor;
pub mod hash;
mod memory;
pub mod record;
mod store;

pub use descriptor::{decode_evm_v1, decode_evm_v1_hex, encode_evm_v1, AccountDescriptor};
pub use hash::{domain_separator, struct_hash, structured_hash};
pub use memory::MemoryAssociationStore;
pub use record::{AssociationId, AssociationRecord, SignedAssociation, Uint40};
pub use store::{
    get_association, get_associations_for_account, get_signed_associations_for_evm_account,
    AssociationStore,
};
