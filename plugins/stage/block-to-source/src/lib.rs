use std::future::Future;
use std::pin::Pin;

use stage_api::{ContentSource, Contents, Emitter, Record, StageError, TransformStage};

/// Re-emits block contents as a readable source.
///
/// Breaks the representation contract on purpose: suites use it to check
/// that a violation is reported as one.
pub struct BlockToSourceStage;

impl BlockToSourceStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BlockToSourceStage {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformStage for BlockToSourceStage {
    fn name(&self) -> &str {
        "block-to-source"
    }

    fn transform<'a>(
        &'a self,
        mut record: Record,
        emitter: &'a Emitter,
    ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
        Box::pin(async move {
            if let Contents::Block(bytes) = record.contents_mut() {
                let bytes = std::mem::take(bytes);
                record.set_source(ContentSource::from_bytes(bytes));
            }
            emitter.push(record)
        })
    }
}
