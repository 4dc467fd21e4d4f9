//! Test utilities for agentkit.
//!
//! Mock collaborators for the validation orchestrator, fixtures for
//! identifiers and associations, and assertion helpers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agentkit_lib::test_utils::{TestFixtures, TestHarness};
//! use agentkit_lib::validation::PrepareOptions;
//!
//! let harness = TestHarness::new();
//! let plan = harness
//!     .orchestrator()
//!     .prepare(&TestFixtures::did8004(), TestFixtures::VALIDATOR, &PrepareOptions::new())
//!     .await?;
//! harness.orchestrator().execute(&plan, &harness.smart_account(), |_| {}).await?;
//! assert_eq!(harness.bundler.sent_count(), 1);
//! ```

mod assertions;
mod fixtures;
mod mocks;

pub use fixtures::{signed_test_association, test_account, test_record, TestFixtures};

pub use mocks::{
    MockAccount, MockAgentRegistry, MockBundler, MockBundlerConnector, MockGasOracle,
    MockSmartAccount, MockValidationRegistries, MockValidationRegistryClient, TestHarness,
};

pub use assertions::{assert_error_code, assert_plan_well_formed, AssociationAssertion};
