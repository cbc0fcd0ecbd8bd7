use serde::{Deserialize, Serialize};

use stage_api::{Record, RecordShape, Representation};

/// Outcome of the structural contract check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    None,
    /// Absent input was not passed through exactly once, unchanged.
    MissingNullPassthrough,
    RepresentationChangedFromBlock,
    RepresentationChangedFromSource,
}

impl Violation {
    pub fn is_violation(&self) -> bool {
        !matches!(self, Violation::None)
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::None => f.write_str("no violation"),
            Violation::MissingNullPassthrough => f.write_str("did not pass through absent record"),
            Violation::RepresentationChangedFromBlock => {
                f.write_str("transformed contents incorrectly - block -> source or absent")
            }
            Violation::RepresentationChangedFromSource => {
                f.write_str("transformed contents incorrectly - source -> block or absent")
            }
        }
    }
}

/// Rule chosen once per run from the original record's snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractRule {
    /// Exactly one emission, structurally equal to the snapshot.
    NullPassthrough(RecordShape),
    /// Every emission keeps this representation. Any count is fine.
    PreserveRepresentation(Representation),
}

impl ContractRule {
    pub fn for_shape(original: &RecordShape) -> Self {
        match original.representation {
            Representation::Absent => ContractRule::NullPassthrough(original.clone()),
            repr => ContractRule::PreserveRepresentation(repr),
        }
    }

    pub fn check(&self, emitted: &[Record]) -> Violation {
        match self {
            ContractRule::NullPassthrough(original) => match emitted {
                [only] if only.shape() == *original => Violation::None,
                _ => Violation::MissingNullPassthrough,
            },
            ContractRule::PreserveRepresentation(repr) => match first_mismatch(*repr, emitted) {
                None => Violation::None,
                Some(_) if *repr == Representation::Source => {
                    Violation::RepresentationChangedFromSource
                }
                Some(_) => Violation::RepresentationChangedFromBlock,
            },
        }
    }
}

/// Index of the first emission whose representation differs from `expected`.
pub fn first_mismatch(expected: Representation, emitted: &[Record]) -> Option<usize> {
    emitted.iter().position(|r| r.representation() != expected)
}

/// Decide whether `emitted` upholds the contract for a record shaped like `original`.
pub fn evaluate(original: &RecordShape, emitted: &[Record]) -> Violation {
    ContractRule::for_shape(original).check(emitted)
}
