use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::error::StageError;
use crate::record::{Record, Representation};

/// Signal from a stage to whoever collects its output.
#[derive(Debug)]
pub enum StageEvent {
    Emitted(Record),
    Failed(StageError),
    Finished,
}

/// Output handle given to a stage.
///
/// Events are delivered in the order they are sent. The handle may be cloned
/// into spawned tasks; events sent after the collector has sealed its
/// emission set are lost.
#[derive(Clone, Debug)]
pub struct Emitter {
    tx: mpsc::UnboundedSender<StageEvent>,
}

impl Emitter {
    /// Emitter plus the receiving end the collector reads from.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StageEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit one record.
    pub fn push(&self, record: Record) -> Result<(), StageError> {
        self.tx
            .send(StageEvent::Emitted(record))
            .map_err(|_| StageError::new("emission collector closed"))
    }

    /// Signal an error. The stage may keep running; the collector stops at the first terminal signal.
    pub fn fail(&self, error: StageError) {
        let _ = self.tx.send(StageEvent::Failed(error));
    }

    /// Signal normal completion.
    pub fn finish(&self) {
        let _ = self.tx.send(StageEvent::Finished);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// One-in / many-out asynchronous record processor.
///
/// The driver calls `transform` once per input record and `flush` once after
/// end-of-input. Returning `Err` signals a stage error.
pub trait TransformStage: Send + Sync {
    fn name(&self) -> &str {
        "stage"
    }

    fn transform<'a>(
        &'a self,
        record: Record,
        emitter: &'a Emitter,
    ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>>;

    fn flush<'a>(
        &'a self,
        _emitter: &'a Emitter,
    ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }
}

impl<T: TransformStage + ?Sized> TransformStage for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn transform<'a>(
        &'a self,
        record: Record,
        emitter: &'a Emitter,
    ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
        (**self).transform(record, emitter)
    }

    fn flush<'a>(
        &'a self,
        emitter: &'a Emitter,
    ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
        (**self).flush(emitter)
    }
}

/// Reject `record` if its representation is not accepted by the stage.
///
/// `Absent` records are always accepted.
pub fn ensure_supported(
    stage: &str,
    record: &Record,
    block_supported: bool,
    source_supported: bool,
) -> Result<(), StageError> {
    match record.representation() {
        Representation::Block if !block_supported => {
            Err(StageError::unsupported(stage, Representation::Block))
        }
        Representation::Source if !source_supported => {
            Err(StageError::unsupported(stage, Representation::Source))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures::{absent_record, block_record, source_record};

    #[test]
    fn events_arrive_in_send_order() {
        let (emitter, mut rx) = Emitter::channel();
        let a = block_record("a");
        let b = block_record("b");
        let (ida, idb) = (a.id(), b.id());
        emitter.push(a).unwrap();
        emitter.push(b).unwrap();
        emitter.finish();

        assert!(matches!(rx.try_recv(), Ok(StageEvent::Emitted(r)) if r.id() == ida));
        assert!(matches!(rx.try_recv(), Ok(StageEvent::Emitted(r)) if r.id() == idb));
        assert!(matches!(rx.try_recv(), Ok(StageEvent::Finished)));
    }

    #[test]
    fn push_after_collector_dropped_is_an_error() {
        let (emitter, rx) = Emitter::channel();
        drop(rx);
        assert!(emitter.is_closed());
        assert!(emitter.push(block_record("late")).is_err());
    }

    #[test]
    fn ensure_supported_rejects_disabled_representations() {
        let e = ensure_supported("s", &source_record(""), true, false).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Unsupported);
        assert_eq!(e.rejected_representation(), Some(Representation::Source));

        let e = ensure_supported("s", &block_record(""), false, true).unwrap_err();
        assert_eq!(e.rejected_representation(), Some(Representation::Block));

        assert!(ensure_supported("s", &absent_record(), false, false).is_ok());
        assert!(ensure_supported("s", &block_record(""), true, false).is_ok());
    }
}
