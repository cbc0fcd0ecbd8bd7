//! Contract verification for record transform stages.
//!
//! [`Harness::verify`] feeds one record into a stage, collects what it emits,
//! checks the structural contract (see [`rules`]) and only then runs the
//! caller's assertion. Scenario helpers in [`scenarios`] wrap common
//! assertions.

pub mod config;
pub mod error;
pub mod feed;
pub mod harness;
pub mod rules;
pub mod scenarios;

pub use config::HarnessConfig;
pub use error::HarnessError;
pub use feed::EmissionSet;
pub use harness::{verify, BoxError, Harness, VerifyState};
pub use rules::{evaluate, ContractRule, Violation};
pub use scenarios::{Fixture, SingleTransform};
