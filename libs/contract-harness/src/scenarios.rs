//! Canned assertions on top of [`Harness::verify`].

use stage_api::fixtures;
use stage_api::{
    extract_content, Contents, ErrorKind, Record, RecordShape, Representation, StageError,
    TransformStage,
};

use crate::error::HarnessError;
use crate::harness::{BoxError, Harness};

/// Input for the single-record transform scenarios: literal text, or a
/// prepared record of the matching representation.
#[derive(Debug)]
pub enum Fixture {
    Text(String),
    Record(Record),
}

impl From<&str> for Fixture {
    fn from(text: &str) -> Self {
        Fixture::Text(text.to_string())
    }
}

impl From<String> for Fixture {
    fn from(text: String) -> Self {
        Fixture::Text(text)
    }
}

impl From<Record> for Fixture {
    fn from(record: Record) -> Self {
        Fixture::Record(record)
    }
}

/// What a single-record expectation gets to look at.
///
/// On a stage error only `original` and `error` are set.
#[derive(Debug)]
pub struct SingleTransform {
    pub contents: Option<String>,
    pub original: RecordShape,
    pub transformed: Option<Record>,
    pub error: Option<StageError>,
}

fn block_bytes(record: &Record) -> Option<Vec<u8>> {
    match record.contents() {
        Contents::Block(bytes) => Some(bytes.clone()),
        _ => None,
    }
}

/// Bytes of a block or source record; a source is put back readable.
async fn content_bytes(record: &mut Record) -> Result<Option<Vec<u8>>, StageError> {
    match record.representation() {
        Representation::Source => record.tee_source().await,
        _ => Ok(block_bytes(record)),
    }
}

fn as_source_for(representation: Representation) -> Result<bool, HarnessError> {
    match representation {
        Representation::Block => Ok(false),
        Representation::Source => Ok(true),
        Representation::Absent => Err(HarnessError::Usage(
            "representation checks need a block or source representation, got absent".into(),
        )),
    }
}

impl Harness {
    /// An absent record goes through (contract only, no extra expectation).
    pub async fn passes_through_absent<S>(&self, stage: &S) -> Result<(), HarnessError>
    where
        S: TransformStage + ?Sized,
    {
        self.verify(stage, fixtures::absent_record(), |_, _| async { Ok(()) }).await
    }

    /// The stage must fail, with any error, on a record of `representation`.
    pub async fn rejects_representation<S>(
        &self,
        stage: &S,
        representation: Representation,
    ) -> Result<(), HarnessError>
    where
        S: TransformStage + ?Sized,
    {
        let record = fixtures::record("some contents", as_source_for(representation)?);
        self.verify(stage, record, |_, error| async move {
            match error {
                Some(_) => Ok(()),
                None => Err("stage accepted the record".into()),
            }
        })
        .await
    }

    /// The stage must fail with an `Unsupported` error naming `representation`.
    pub async fn rejects_unsupported_representation<S>(
        &self,
        stage: &S,
        representation: Representation,
    ) -> Result<(), HarnessError>
    where
        S: TransformStage + ?Sized,
    {
        let record = fixtures::record("some contents", as_source_for(representation)?);
        self.verify(stage, record, move |_, error| async move {
            match error {
                Some(e)
                    if e.kind() == ErrorKind::Unsupported
                        && e.rejected_representation() == Some(representation) =>
                {
                    Ok(())
                }
                Some(e) => Err(format!("unexpected stage error: {e:?}").into()),
                None => Err("stage accepted the record".into()),
            }
        })
        .await
    }

    /// No error and at least one record out.
    pub async fn transforms_with_records<S>(&self, stage: &S, record: Record) -> Result<(), HarnessError>
    where
        S: TransformStage + ?Sized,
    {
        self.verify(stage, record, |records, error| async move {
            if error.is_some() || records.is_empty() {
                return Err("expected records and no error".into());
            }
            Ok(())
        })
        .await
    }

    /// No error and nothing out.
    pub async fn filters<S>(&self, stage: &S, record: Record) -> Result<(), HarnessError>
    where
        S: TransformStage + ?Sized,
    {
        self.verify(stage, record, |records, error| async move {
            if error.is_some() || !records.is_empty() {
                return Err("expected the record to be filtered out".into());
            }
            Ok(())
        })
        .await
    }

    /// The very same record comes back once, with nothing changed.
    pub async fn ignores<S>(&self, stage: &S, mut record: Record) -> Result<(), HarnessError>
    where
        S: TransformStage + ?Sized,
    {
        let expected = content_bytes(&mut record)
            .await
            .map_err(|e| HarnessError::Usage(format!("fixture contents unreadable: {e}")))?;
        let id = record.id();
        let shape = record.shape();

        self.verify(stage, record, move |mut records, error| async move {
            if error.is_some() || records.len() != 1 {
                return Err("expected the record back exactly once".into());
            }
            let Some(mut out) = records.pop() else {
                return Err("expected the record back exactly once".into());
            };
            if out.id() != id || out.shape() != shape {
                return Err(format!("record {} came back changed", out.id()).into());
            }
            if content_bytes(&mut out).await? != expected {
                return Err("record contents changed".into());
            }
            Ok(())
        })
        .await
    }

    /// Block in, exactly one record out; `expectation` sees the output as text.
    pub async fn single_block_transform<S, F>(
        &self,
        stage: &S,
        fixture: impl Into<Fixture>,
        expectation: F,
    ) -> Result<(), HarnessError>
    where
        S: TransformStage + ?Sized,
        F: FnOnce(SingleTransform) -> Result<(), BoxError> + Send + 'static,
    {
        self.single_transform(Representation::Block, stage, fixture.into(), expectation)
            .await
    }

    /// Source in, exactly one record out; `expectation` sees the output as text.
    pub async fn single_source_transform<S, F>(
        &self,
        stage: &S,
        fixture: impl Into<Fixture>,
        expectation: F,
    ) -> Result<(), HarnessError>
    where
        S: TransformStage + ?Sized,
        F: FnOnce(SingleTransform) -> Result<(), BoxError> + Send + 'static,
    {
        self.single_transform(Representation::Source, stage, fixture.into(), expectation)
            .await
    }

    async fn single_transform<S, F>(
        &self,
        expected: Representation,
        stage: &S,
        fixture: Fixture,
        expectation: F,
    ) -> Result<(), HarnessError>
    where
        S: TransformStage + ?Sized,
        F: FnOnce(SingleTransform) -> Result<(), BoxError> + Send + 'static,
    {
        let record = match fixture {
            Fixture::Text(text) => fixtures::record(&text, expected == Representation::Source),
            Fixture::Record(record) if record.representation() == expected => record,
            Fixture::Record(_) => return Err(HarnessError::wrong_representation(expected)),
        };
        let original = record.shape();

        self.verify(stage, record, move |mut records, error| async move {
            if let Some(error) = error {
                return expectation(SingleTransform {
                    contents: None,
                    original,
                    transformed: None,
                    error: Some(error),
                });
            }
            if records.len() != 1 {
                return Err(format!("expected one record, got {}", records.len()).into());
            }
            let Some(mut transformed) = records.pop() else {
                return Err("expected one record".into());
            };
            let contents = match transformed.representation() {
                Representation::Source => transformed
                    .tee_source()
                    .await?
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
                _ => extract_content(&mut transformed).await?,
            };
            expectation(SingleTransform {
                contents,
                original,
                transformed: Some(transformed),
                error: None,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;

    use super::*;
    use crate::rules::Violation;
    use stage_api::fixtures::{block_record, source_record};
    use stage_api::{ensure_supported, Emitter};

    /// Emits the input as-is, after an optional representation check.
    struct Echo {
        block: bool,
        source: bool,
    }

    impl TransformStage for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn transform<'a>(
            &'a self,
            record: Record,
            emitter: &'a Emitter,
        ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
            Box::pin(async move {
                ensure_supported(self.name(), &record, self.block, self.source)?;
                emitter.push(record)
            })
        }
    }

    /// Drops everything.
    struct Sink;

    impl TransformStage for Sink {
        fn transform<'a>(
            &'a self,
            _record: Record,
            _emitter: &'a Emitter,
        ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }
    }

    /// Uppercases block and source contents, keeping the representation.
    struct Upper;

    impl TransformStage for Upper {
        fn transform<'a>(
            &'a self,
            mut record: Record,
            emitter: &'a Emitter,
        ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
            Box::pin(async move {
                let representation = record.representation();
                if let Some(text) = extract_content(&mut record).await? {
                    let upper = text.to_uppercase().into_bytes();
                    match representation {
                        Representation::Source => {
                            record.set_source(stage_api::ContentSource::from_bytes(upper))
                        }
                        _ => record.set_block(upper),
                    }
                }
                emitter.push(record)
            })
        }
    }

    const BOTH: Echo = Echo { block: true, source: true };

    #[tokio::test]
    async fn passes_through_absent_with_echo() {
        Harness::default().passes_through_absent(&BOTH).await.unwrap();
        let err = Harness::default().passes_through_absent(&Sink).await.unwrap_err();
        assert_eq!(err.violation(), Some(Violation::MissingNullPassthrough));
    }

    #[tokio::test]
    async fn unsupported_source_is_detected() {
        let stage = Echo { block: true, source: false };
        let h = Harness::default();
        h.rejects_unsupported_representation(&stage, Representation::Source).await.unwrap();
        h.rejects_representation(&stage, Representation::Source).await.unwrap();

        let err = h
            .rejects_unsupported_representation(&stage, Representation::Block)
            .await
            .unwrap_err();
        assert!(err.is_assertion_failure());
    }

    #[tokio::test]
    async fn unsupported_check_against_absent_is_usage_error() {
        let err = Harness::default()
            .rejects_representation(&BOTH, Representation::Absent)
            .await
            .unwrap_err();
        assert!(err.is_usage());
    }

    #[tokio::test]
    async fn filters_and_transforms() {
        let h = Harness::default();
        h.filters(&Sink, block_record("goodbye")).await.unwrap();
        assert!(h.filters(&BOTH, block_record("goodbye")).await.unwrap_err().is_assertion_failure());

        h.transforms_with_records(&BOTH, block_record("x")).await.unwrap();
        assert!(h
            .transforms_with_records(&Sink, block_record("x"))
            .await
            .unwrap_err()
            .is_assertion_failure());
    }

    #[tokio::test]
    async fn ignores_block_and_source() {
        let h = Harness::default();
        h.ignores(&BOTH, block_record("same")).await.unwrap();
        h.ignores(&BOTH, source_record("same")).await.unwrap();

        assert!(h.ignores(&Upper, block_record("same")).await.unwrap_err().is_assertion_failure());
        assert!(h.ignores(&Upper, source_record("same")).await.unwrap_err().is_assertion_failure());
        assert!(h.ignores(&Sink, block_record("same")).await.unwrap_err().is_assertion_failure());
    }

    #[tokio::test]
    async fn single_transform_sees_contents() {
        let h = Harness::default();
        h.single_block_transform(&Upper, "hello", |t| {
            assert_eq!(t.contents.as_deref(), Some("HELLO"));
            assert_eq!(t.original.representation, Representation::Block);
            Ok(())
        })
        .await
        .unwrap();

        h.single_source_transform(&Upper, "hello", |t| {
            assert_eq!(t.contents.as_deref(), Some("HELLO"));
            assert_eq!(t.transformed.map(|r| r.representation()), Some(Representation::Source));
            Ok(())
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn single_transform_rejects_wrong_fixture_up_front() {
        let h = Harness::default();
        let err = h
            .single_block_transform(&BOTH, source_record("x"), |_| Ok(()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "record must be a block record");

        let err = h
            .single_source_transform(&BOTH, block_record("x"), |_| Ok(()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "record must be a source record");
    }

    #[tokio::test]
    async fn single_transform_hands_over_stage_error() {
        let stage = Echo { block: false, source: true };
        Harness::default()
            .single_block_transform(&stage, "x", |t| {
                assert!(t.contents.is_none());
                assert!(t.transformed.is_none());
                assert_eq!(t.error.map(|e| e.kind()), Some(ErrorKind::Unsupported));
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn single_transform_requires_exactly_one() {
        let err = Harness::default()
            .single_block_transform(&Sink, "x", |_| Ok(()))
            .await
            .unwrap_err();
        assert!(err.is_assertion_failure());
    }
}
