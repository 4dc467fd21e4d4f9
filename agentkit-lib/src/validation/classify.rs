//! Mapping of collaborator failures to stable error kinds.
//!
//! Validation registries report duplicates as opaque revert reasons, so
//! detection is text based. All patterns live in [`FailureClassifier`].

use serde::{Deserialize, Serialize};

use crate::evm::selector;
use crate::AgentkitError;

/// Custom errors a validation registry raises for a duplicate request.
pub const DUPLICATE_REQUEST_ERRORS: [&str; 2] = ["ValidationRequestExists()", "RequestAlreadyExists()"];

/// Substring matched by the default table.
pub const EXISTS_SUBSTRING: &str = "exists";

/// Kind assigned to a matching failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// The request is already recorded on-chain.
    AlreadyExists,
}

/// A case-insensitive substring rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailurePattern {
    /// Text to look for.
    pub needle: String,
    /// Resulting kind.
    pub kind: FailureKind,
}

impl FailurePattern {
    /// Pattern mapping `needle` to [`FailureKind::AlreadyExists`].
    pub fn already_exists(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into().to_ascii_lowercase(),
            kind: FailureKind::AlreadyExists,
        }
    }

    fn matches(&self, haystack_lower: &str) -> bool {
        !self.needle.is_empty() && haystack_lower.contains(&self.needle.to_ascii_lowercase())
    }
}

/// Ordered table of failure patterns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureClassifier {
    patterns: Vec<FailurePattern>,
}

impl Default for FailureClassifier {
    /// `"exists"` plus the selectors of [`DUPLICATE_REQUEST_ERRORS`].
    fn default() -> Self {
        Self::selectors_only().with_pattern(FailurePattern::already_exists(EXISTS_SUBSTRING))
    }
}

impl FailureClassifier {
    /// Empty table: everything classifies as `ExecutionFailed`.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Only the revert selectors of [`DUPLICATE_REQUEST_ERRORS`], without the
    /// `"exists"` substring rule.
    pub fn selectors_only() -> Self {
        DUPLICATE_REQUEST_ERRORS
            .iter()
            .fold(Self::empty(), |classifier, signature| {
                classifier.with_selector(signature)
            })
    }

    /// Append a pattern.
    pub fn with_pattern(mut self, pattern: FailurePattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Append the `0x` selector of a custom error signature.
    pub fn with_selector(self, signature: &str) -> Self {
        let needle = format!("0x{}", hex::encode(selector(signature)));
        self.with_pattern(FailurePattern::already_exists(needle))
    }

    /// Patterns in match order.
    pub fn patterns(&self) -> &[FailurePattern] {
        &self.patterns
    }

    /// First kind whose pattern occurs in `message`.
    pub fn match_message(&self, message: &str) -> Option<FailureKind> {
        let lower = message.to_ascii_lowercase();
        self.patterns
            .iter()
            .find(|pattern| pattern.matches(&lower))
            .map(|pattern| pattern.kind)
    }

    /// Classify an execution error.
    ///
    /// Errors that already carry a stable kind pass through, except
    /// `ExecutionFailed`, whose message is checked again. Everything else
    /// becomes `AlreadyExists` or `ExecutionFailed` with the original
    /// message preserved.
    pub fn classify(&self, err: AgentkitError) -> AgentkitError {
        let message = match err {
            AgentkitError::ExecutionFailed { message } => message,
            err if err.is_domain_kind() => return err,
            err => err.to_string(),
        };

        match self.match_message(&message) {
            Some(FailureKind::AlreadyExists) => AgentkitError::AlreadyExists { message },
            None => AgentkitError::ExecutionFailed { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_selectors() {
        assert_eq!(hex::encode(selector(DUPLICATE_REQUEST_ERRORS[0])), "608d53e2");
        assert_eq!(hex::encode(selector(DUPLICATE_REQUEST_ERRORS[1])), "2f6af0ee");
    }

    #[test]
    fn test_default_matches_substring_case_insensitive() {
        let classifier = FailureClassifier::default();
        let err = classifier.classify(AgentkitError::Transport(
            "execution reverted: Request EXISTS".into(),
        ));
        assert!(matches!(err, AgentkitError::AlreadyExists { message } if message.contains("EXISTS")));
    }

    #[test]
    fn test_selector_match() {
        let classifier = FailureClassifier::selectors_only();
        let err = classifier.classify(AgentkitError::execution_failed(
            "UserOperation reverted during simulation with reason: 0x608D53E2",
        ));
        assert!(matches!(err, AgentkitError::AlreadyExists { .. }));
    }

    #[test]
    fn test_selectors_only_ignores_substring() {
        let classifier = FailureClassifier::selectors_only();
        let err = classifier.classify(AgentkitError::Transport("file exists".into()));
        assert!(matches!(err, AgentkitError::ExecutionFailed { message } if message.contains("file exists")));
    }

    #[test]
    fn test_domain_kinds_pass_through() {
        let classifier = FailureClassifier::default();
        let err = classifier.classify(AgentkitError::AccountNotSmartAccount);
        assert_eq!(err, AgentkitError::AccountNotSmartAccount);

        let err = classifier.classify(AgentkitError::BundlerUnavailable { chain_id: 5 });
        assert_eq!(err, AgentkitError::BundlerUnavailable { chain_id: 5 });
    }

    #[test]
    fn test_other_failures_wrap_original_message() {
        let classifier = FailureClassifier::default();
        let err = classifier.classify(AgentkitError::Transport("connection reset".into()));
        assert_eq!(
            err,
            AgentkitError::ExecutionFailed {
                message: "transport error: connection reset".into()
            }
        );
    }

    #[test]
    fn test_with_pattern_extends_table() {
        let classifier = FailureClassifier::selectors_only()
            .with_pattern(FailurePattern::already_exists("AA25 invalid account nonce"));
        assert_eq!(classifier.patterns().len(), 3);
        assert_eq!(
            classifier.match_message("aa25 INVALID account nonce"),
            Some(FailureKind::AlreadyExists)
        );
        assert_eq!(FailureClassifier::empty().match_message("exists"), None);
    }
}
