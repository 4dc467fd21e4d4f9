//! CLI command implementations

pub mod association;
pub mod descriptor;
pub mod identity;
pub mod validation;
