//! Test assertions and verification helpers.

use crate::associations::SignedAssociation;
use crate::evm;
use crate::validation::{ExecutionMode, ValidationRequestPlan};
use crate::{AgentkitErrorCode, Result};

/// Assert that `result` failed with `expected`.
///
/// # Panics
/// Panics if the result is `Ok` or carries a different code.
pub fn assert_error_code<T: std::fmt::Debug>(result: &Result<T>, expected: AgentkitErrorCode) {
    match result {
        Ok(value) => panic!("Expected {:?} error, got Ok({:?})", expected, value),
        Err(e) => assert_eq!(
            e.code(),
            expected,
            "Expected {:?} error, got {:?}: {}",
            expected,
            e.code(),
            e
        ),
    }
}

/// Assert that a plan can be handed to `execute`.
///
/// # Panics
/// Panics if the plan is not an account-abstraction plan with at least one
/// call, a bundler URL, a decimal value on every call and a validator.
pub fn assert_plan_well_formed(plan: &ValidationRequestPlan) {
    assert_eq!(plan.mode, ExecutionMode::Aa, "Plan mode should be aa");
    assert!(!plan.calls.is_empty(), "Plan should contain calls");
    assert!(
        !plan.bundler_url.trim().is_empty(),
        "Plan should carry a bundler URL"
    );
    for call in &plan.calls {
        assert!(
            !call.value.is_empty() && call.value.bytes().all(|b| b.is_ascii_digit()),
            "Call value should be a decimal string, got: {}",
            call.value
        );
        assert!(call.data.len() >= 4, "Call data should start with a selector");
    }
    assert!(
        !plan.metadata.validator_address.is_empty(),
        "Plan should name a validator"
    );
}

/// Builder for association assertions.
pub struct AssociationAssertion<'a> {
    association: &'a SignedAssociation,
    checks: Vec<(&'static str, bool)>,
}

impl<'a> AssociationAssertion<'a> {
    /// Start asserting on `association`.
    pub fn new(association: &'a SignedAssociation) -> Self {
        Self {
            association,
            checks: Vec::new(),
        }
    }

    /// Both parties have signed.
    pub fn fully_signed(mut self) -> Self {
        self.checks
            .push(("fully signed", self.association.is_fully_signed()));
        self
    }

    /// Not revoked.
    pub fn not_revoked(mut self) -> Self {
        self.checks
            .push(("not revoked", !self.association.is_revoked()));
        self
    }

    /// Active at `now`.
    pub fn active_at(mut self, now: u64) -> Self {
        self.checks
            .push(("active", self.association.is_active_at(now)));
        self
    }

    /// Initiator account matches `chain_id` and `address`.
    pub fn initiated_by(mut self, chain_id: u64, address: &str) -> Self {
        let matches = match (
            self.association.record.initiator_account(),
            evm::parse_address(address),
        ) {
            (Some(account), Ok(address)) => account.chain_id == chain_id && account.address == address,
            _ => false,
        };
        self.checks.push(("initiator matches", matches));
        self
    }

    /// Execute all assertions.
    ///
    /// # Panics
    /// Panics if any assertion fails.
    pub fn assert(self) {
        for (description, passed) in self.checks {
            assert!(passed, "Assertion failed: {}", description);
        }
    }

    /// Check if all assertions pass without panicking.
    pub fn check(self) -> bool {
        self.checks.iter().all(|(_, passed)| *passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{signed_test_association, TestFixtures};
    use crate::AgentkitError;

    #[test]
    fn test_assert_error_code_matches() {
        let result: Result<()> = Err(AgentkitError::MissingValidator);
        assert_error_code(&result, AgentkitErrorCode::MissingValidator);
    }

    #[test]
    #[should_panic(expected = "Expected")]
    fn test_assert_error_code_rejects_ok() {
        let result: Result<u8> = Ok(1);
        assert_error_code(&result, AgentkitErrorCode::MissingValidator);
    }

    #[test]
    fn test_association_assertion_builder() {
        let association = signed_test_association(1, 2);
        let initiator = format!("0x{}01", "0".repeat(38));

        assert!(AssociationAssertion::new(&association)
            .fully_signed()
            .not_revoked()
            .active_at(2_000)
            .initiated_by(TestFixtures::CHAIN_ID, &initiator)
            .check());

        assert!(!AssociationAssertion::new(&association)
            .active_at(10)
            .check());
    }
}
