use stage_api::Representation;

use crate::rules::Violation;

/// Failure of a single verification run.
///
/// `AssertionFailed` carries nothing from the caller's own error: it only
/// says that verification failed at the assertion step.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("contract violation: {0}")]
    ContractViolation(Violation),

    #[error("stage test failed")]
    AssertionFailed,

    /// Scenario misuse, detected before the stage runs.
    #[error("{0}")]
    Usage(String),

    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },
}

impl HarnessError {
    pub fn wrong_representation(expected: Representation) -> Self {
        HarnessError::Usage(format!("record must be a {expected} record"))
    }

    /// Violation kind for `ContractViolation`, `None` otherwise.
    pub fn violation(&self) -> Option<Violation> {
        match self {
            HarnessError::ContractViolation(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_assertion_failure(&self) -> bool {
        matches!(self, HarnessError::AssertionFailed)
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, HarnessError::Usage(_))
    }
}
