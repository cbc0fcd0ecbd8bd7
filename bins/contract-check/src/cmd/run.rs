use serde::Serialize;

use contract_harness::{BoxError, Fixture, Harness, HarnessError, SingleTransform};
use stage_api::{fixtures, Record};

use crate::config::{CheckConfig, RunArgs, ScenarioKind, SuiteConfig};
use crate::error::CheckError;
use crate::stages::build_stage;

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub name: String,
    pub stage: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Run the suite from `args.suite`. Returns `true` when every check passed.
pub async fn run(args: RunArgs) -> Result<bool, CheckError> {
    let suite = SuiteConfig::load(&args.suite)?;
    tracing::info!(suite = %args.suite, checks = suite.checks.len(), "loaded suite");

    let reports = run_suite(&suite, args.fail_fast).await;
    let passed = reports.iter().all(|r| r.passed);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for r in &reports {
            let mark = if r.passed { "ok  " } else { "FAIL" };
            match &r.detail {
                Some(detail) => println!("{mark} {} [{}]: {detail}", r.name, r.stage),
                None => println!("{mark} {} [{}]", r.name, r.stage),
            }
        }
        let failed = reports.iter().filter(|r| !r.passed).count();
        println!("{} checks, {} failed", reports.len(), failed);
    }

    Ok(passed)
}

pub async fn run_suite(suite: &SuiteConfig, fail_fast: bool) -> Vec<CheckReport> {
    let harness = Harness::new(suite.harness.clone());
    let mut reports = Vec::with_capacity(suite.checks.len());

    for check in &suite.checks {
        let result = run_check(&harness, check).await;
        let passed = result.is_ok();
        if passed {
            tracing::info!(check = %check.name, stage = %check.stage, "check passed");
        } else {
            tracing::info!(check = %check.name, stage = %check.stage, "check failed");
        }
        reports.push(CheckReport {
            name: check.name.clone(),
            stage: check.stage.clone(),
            passed,
            detail: result.err().map(|e| e.to_string()),
        });
        if !passed && fail_fast {
            break;
        }
    }

    reports
}

fn input_record(check: &CheckConfig, as_source: bool) -> Result<Record, CheckError> {
    let mut record = match &check.input {
        Some(text) => fixtures::record(text, as_source),
        None => fixtures::absent_record(),
    };
    for (key, value) in &check.metadata {
        record.set_meta(key.clone(), serde_json::to_value(value)?);
    }
    Ok(record)
}

/// Single-record expectation: no stage error and, if given, exact contents.
fn expect_contents(
    expect: Option<String>,
) -> impl FnOnce(SingleTransform) -> Result<(), BoxError> + Send + 'static {
    move |t| {
        if let Some(e) = t.error {
            return Err(format!("stage error: {e}").into());
        }
        match expect {
            Some(want) if t.contents.as_deref() != Some(want.as_str()) => {
                Err(format!("expected {want:?}, got {:?}", t.contents).into())
            }
            _ => Ok(()),
        }
    }
}

async fn run_check(harness: &Harness, check: &CheckConfig) -> Result<(), CheckError> {
    let stage = build_stage(&check.stage, &check.stage_config)?;
    let stage = &*stage;

    let result = match check.scenario {
        ScenarioKind::PassesAbsent => harness.passes_through_absent(stage).await,
        ScenarioKind::Transforms => {
            let record = input_record(check, check.as_source.unwrap_or(false))?;
            harness.transforms_with_records(stage, record).await
        }
        ScenarioKind::Filters => {
            let record = input_record(check, check.as_source.unwrap_or(false))?;
            harness.filters(stage, record).await
        }
        ScenarioKind::Ignores => {
            let record = input_record(check, check.as_source.unwrap_or(false))?;
            harness.ignores(stage, record).await
        }
        ScenarioKind::SingleBlock | ScenarioKind::SingleSource => {
            let wants_source = check.scenario == ScenarioKind::SingleSource;
            let fixture = match (&check.input, check.as_source) {
                (Some(text), None) if check.metadata.is_empty() => Fixture::Text(text.clone()),
                (None, _) => {
                    return Err(CheckError::MissingField { check: check.name.clone(), field: "input" });
                }
                (_, as_source) => Fixture::Record(input_record(check, as_source.unwrap_or(wants_source))?),
            };
            let expectation = expect_contents(check.expect.clone());
            if wants_source {
                harness.single_source_transform(stage, fixture, expectation).await
            } else {
                harness.single_block_transform(stage, fixture, expectation).await
            }
        }
        ScenarioKind::Rejects | ScenarioKind::RejectsUnsupported => {
            let representation = check.representation.ok_or_else(|| CheckError::MissingField {
                check: check.name.clone(),
                field: "representation",
            })?;
            if check.scenario == ScenarioKind::Rejects {
                harness.rejects_representation(stage, representation).await
            } else {
                harness.rejects_unsupported_representation(stage, representation).await
            }
        }
    };

    settle(result, check)
}

/// Apply `expect_violation`: a matching violation is a pass, holding contract is a fail.
fn settle(result: Result<(), HarnessError>, check: &CheckConfig) -> Result<(), CheckError> {
    match (result, check.expect_violation) {
        (Err(e), Some(want)) if e.violation() == Some(want) => Ok(()),
        (Ok(()), Some(want)) => Err(CheckError::ExpectedViolation(want)),
        (result, _) => result.map_err(CheckError::from),
    }
}
