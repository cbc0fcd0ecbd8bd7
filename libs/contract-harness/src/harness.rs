use std::future::Future;

use stage_api::{Emitter, Record, RecordId, StageError, TransformStage};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::feed::{collect_emissions, EmissionSet, SingleRecordFeed};
use crate::rules::ContractRule;

/// Error type an assertion may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Lifecycle of one `verify` call. Exactly one terminal state is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyState {
    Idle,
    Running,
    ViolationDetected,
    AssertionPending,
    AssertionPassed,
    AssertionFailed,
}

impl VerifyState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VerifyState::ViolationDetected | VerifyState::AssertionPassed | VerifyState::AssertionFailed
        )
    }
}

fn enter(stage: &str, record: RecordId, state: VerifyState) {
    tracing::debug!(%stage, %record, ?state, "verify state");
}

/// Drives one record through a stage and checks the result.
#[derive(Debug, Clone, Default)]
pub struct Harness {
    config: HarnessConfig,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Feed `input` to `stage`, check the structural contract, then run `assertion`.
    ///
    /// - contract broken → `ContractViolation`, the assertion is not called;
    /// - assertion returns `Err` or panics → `AssertionFailed`;
    /// - otherwise `Ok(())`.
    ///
    /// A stage error is not a failure by itself: it is handed to the
    /// assertion together with the records collected before it.
    pub async fn verify<S, F, Fut>(
        &self,
        stage: &S,
        input: Record,
        assertion: F,
    ) -> Result<(), HarnessError>
    where
        S: TransformStage + ?Sized,
        F: FnOnce(Vec<Record>, Option<StageError>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let name = stage.name();
        let record_id = input.id();
        enter(name, record_id, VerifyState::Idle);

        // Снимок до передачи в stage: stage может мутировать запись.
        let rule = ContractRule::for_shape(&input.shape());

        enter(name, record_id, VerifyState::Running);
        let EmissionSet { records, error } = self.run_stage(stage, input).await;
        tracing::debug!(
            stage = %name,
            record = %record_id,
            emitted = records.len(),
            stage_error = error.is_some(),
            "stage finished"
        );

        let violation = rule.check(&records);
        if violation.is_violation() {
            enter(name, record_id, VerifyState::ViolationDetected);
            tracing::debug!(stage = %name, record = %record_id, %violation, "contract violated");
            return Err(HarnessError::ContractViolation(violation));
        }

        enter(name, record_id, VerifyState::AssertionPending);
        let outcome = tokio::spawn(async move { assertion(records, error).await }).await;
        match outcome {
            Ok(Ok(())) => {
                enter(name, record_id, VerifyState::AssertionPassed);
                Ok(())
            }
            Ok(Err(_)) | Err(_) => {
                enter(name, record_id, VerifyState::AssertionFailed);
                Err(HarnessError::AssertionFailed)
            }
        }
    }

    /// [`verify`](Self::verify) for a synchronous assertion.
    pub async fn verify_with<S, F>(
        &self,
        stage: &S,
        input: Record,
        assertion: F,
    ) -> Result<(), HarnessError>
    where
        S: TransformStage + ?Sized,
        F: FnOnce(Vec<Record>, Option<StageError>) -> Result<(), BoxError> + Send + 'static,
    {
        self.verify(stage, input, move |records, error| {
            std::future::ready(assertion(records, error))
        })
        .await
    }

    /// Run feed and collector cooperatively on the current task.
    ///
    /// The collector seals only after the feed has returned and dropped its
    /// emitter, so the feed is always driven to completion unless
    /// `close_timeout` cuts the wait short; then the feed is dropped.
    async fn run_stage<S>(&self, stage: &S, input: Record) -> EmissionSet
    where
        S: TransformStage + ?Sized,
    {
        let (emitter, rx) = Emitter::channel();
        let feed = SingleRecordFeed::new(stage, emitter).run(input);
        let collect = collect_emissions(
            rx,
            self.config.effective_finalize_yields(),
            self.config.close_timeout(),
        );
        tokio::pin!(feed);
        tokio::pin!(collect);

        tokio::select! {
            biased;
            set = &mut collect => set,
            _ = &mut feed => collect.await,
        }
    }
}

/// [`Harness::verify`] with the default configuration.
pub async fn verify<S, F, Fut>(stage: &S, input: Record, assertion: F) -> Result<(), HarnessError>
where
    S: TransformStage + ?Sized,
    F: FnOnce(Vec<Record>, Option<StageError>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Harness::default().verify(stage, input, assertion).await
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::rules::Violation;
    use stage_api::fixtures::{absent_record, block_record, source_record};

    /// Stage driven by a closure over the input record.
    struct FnStage<F>(F);

    impl<F> TransformStage for FnStage<F>
    where
        F: Fn(Record, &Emitter) -> Result<(), StageError> + Send + Sync,
    {
        fn transform<'a>(
            &'a self,
            record: Record,
            emitter: &'a Emitter,
        ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
            Box::pin(async move { (self.0)(record, emitter) })
        }
    }

    fn fn_stage<F>(f: F) -> FnStage<F>
    where
        F: Fn(Record, &Emitter) -> Result<(), StageError> + Send + Sync,
    {
        FnStage(f)
    }

    fn called_flag() -> (Arc<AtomicBool>, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        (flag.clone(), flag)
    }

    #[tokio::test]
    async fn absent_passthrough_calls_assertion() {
        let stage = fn_stage(|r, e| e.push(r));
        let (flag, seen) = called_flag();
        verify(&stage, absent_record(), move |records, error| async move {
            flag.store(true, Ordering::SeqCst);
            assert_eq!(records.len(), 1);
            assert!(error.is_none());
            Ok(())
        })
        .await
        .unwrap();
        assert!(seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn violation_skips_assertion() {
        let stage = fn_stage(|_, e| e.push(source_record("")));
        let (flag, seen) = called_flag();
        let err = verify(&stage, block_record(""), move |_, _| async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.violation(), Some(Violation::RepresentationChangedFromBlock));
        assert!(!seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stage_error_reaches_assertion() {
        let stage = fn_stage(|_, e| {
            e.push(block_record("partial"))?;
            Err(StageError::new("boom"))
        });
        verify(&stage, block_record("original"), |records, error| async move {
            assert_eq!(records.len(), 1);
            assert_eq!(error.map(|e| e.message().to_string()).as_deref(), Some("boom"));
            Ok(())
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn stage_error_before_emission_on_absent_is_violation() {
        let stage = fn_stage(|_, _| Err(StageError::new("early")));
        let err = verify(&stage, absent_record(), |_, _| async { Ok(()) })
            .await
            .unwrap_err();
        assert_eq!(err.violation(), Some(Violation::MissingNullPassthrough));
    }

    #[tokio::test]
    async fn assertion_error_becomes_assertion_failure() {
        let stage = fn_stage(|r, e| e.push(r));
        let err = verify(&stage, block_record(""), |_, _| async { Err("nope".into()) })
            .await
            .unwrap_err();
        assert!(err.is_assertion_failure());
        assert_eq!(err.to_string(), "stage test failed");
    }

    #[tokio::test]
    async fn assertion_panic_becomes_assertion_failure() {
        let stage = fn_stage(|r, e| e.push(r));
        let err = verify(&stage, block_record(""), |records, _| async move {
            assert_eq!(records.len(), 2, "deliberate");
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(err.is_assertion_failure());
    }

    #[tokio::test]
    async fn emitted_order_is_preserved() {
        let stage = fn_stage(|_, e| {
            for i in 0..5 {
                let mut r = block_record("");
                r.set_meta("index", i);
                e.push(r)?;
            }
            Ok(())
        });
        verify(&stage, block_record(""), |records, _| async move {
            let order: Vec<_> = records.iter().map(|r| r.meta("index").cloned()).collect();
            let expected: Vec<_> = (0..5).map(|i| Some(serde_json::json!(i))).collect();
            if order == expected { Ok(()) } else { Err("out of order".into()) }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn sync_assertion_is_accepted() {
        let stage = fn_stage(|r, e| e.push(r));
        let h = Harness::default();
        h.verify_with(&stage, block_record("x"), |records, error| {
            if records.len() == 1 && error.is_none() { Ok(()) } else { Err("bad".into()) }
        })
        .await
        .unwrap();

        let err = h
            .verify_with(&stage, block_record("x"), |_, _| Err("sync reject".into()))
            .await
            .unwrap_err();
        assert!(err.is_assertion_failure());

        let err = h
            .verify_with(&stage, block_record("x"), |records, _| {
                assert!(records.is_empty());
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(err.is_assertion_failure());
    }

    #[tokio::test]
    async fn violation_wins_over_stage_error() {
        let stage = fn_stage(|_, e| {
            e.push(source_record("converted"))?;
            Err(StageError::new("after the fact"))
        });
        let (flag, seen) = called_flag();
        let err = verify(&stage, block_record("x"), move |_, _| async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.violation(), Some(Violation::RepresentationChangedFromBlock));
        assert!(!seen.load(Ordering::SeqCst));

        let stage = fn_stage(|_, e| {
            e.push(block_record("converted"))?;
            Err(StageError::new("after the fact"))
        });
        let err = verify(&stage, source_record("x"), |_, _| async { Ok(()) })
            .await
            .unwrap_err();
        assert_eq!(err.violation(), Some(Violation::RepresentationChangedFromSource));
    }

    #[test]
    fn terminal_states() {
        assert!(VerifyState::ViolationDetected.is_terminal());
        assert!(VerifyState::AssertionPassed.is_terminal());
        assert!(VerifyState::AssertionFailed.is_terminal());
        assert!(!VerifyState::AssertionPending.is_terminal());
        assert!(!VerifyState::Running.is_terminal());
        assert!(!VerifyState::Idle.is_terminal());
    }
}
