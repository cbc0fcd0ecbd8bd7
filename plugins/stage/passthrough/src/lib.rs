use std::future::Future;
use std::pin::Pin;

use stage_api::{Emitter, Record, StageError, TransformStage};

/// Passthrough stage: emits every record as-is.
pub struct PassthroughStage;

impl PassthroughStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PassthroughStage {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformStage for PassthroughStage {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn transform<'a>(
        &'a self,
        record: Record,
        emitter: &'a Emitter,
    ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
        Box::pin(async move { emitter.push(record) })
    }
}
