use contract_harness::{HarnessError, Violation};

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("unknown stage '{0}'")]
    UnknownStage(String),

    #[error("stage config ({stage}): {detail}")]
    StageConfig { stage: String, detail: String },

    #[error("check [{check}]: missing '{field}'")]
    MissingField { check: String, field: &'static str },

    #[error("expected violation '{0}', but the contract held")]
    ExpectedViolation(Violation),

    #[error("{0}")]
    Harness(#[from] HarnessError),

    #[error("report serialization: {0}")]
    Report(#[from] serde_json::Error),
}
