use std::time::Duration;

use tokio::sync::mpsc;

use stage_api::{Emitter, Record, StageError, StageEvent, TransformStage};

// ═══════════════════════════════════════════════════════════════
//  Emission Set
// ═══════════════════════════════════════════════════════════════

/// Everything a stage produced for one input record, in emission order.
#[derive(Debug, Default)]
pub struct EmissionSet {
    pub records: Vec<Record>,
    pub error: Option<StageError>,
}

impl EmissionSet {
    fn apply(&mut self, event: StageEvent) {
        match event {
            StageEvent::Emitted(record) => self.records.push(record),
            StageEvent::Failed(error) => {
                // первая ошибка побеждает
                if self.error.is_none() {
                    self.error = Some(error);
                }
            }
            StageEvent::Finished => {}
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Single-record feed
// ═══════════════════════════════════════════════════════════════

/// Pushes exactly one record into a stage, then signals end-of-input.
pub struct SingleRecordFeed<'s, S: TransformStage + ?Sized> {
    stage: &'s S,
    emitter: Emitter,
}

impl<'s, S: TransformStage + ?Sized> SingleRecordFeed<'s, S> {
    pub fn new(stage: &'s S, emitter: Emitter) -> Self {
        Self { stage, emitter }
    }

    /// Drive the stage to its end: transform → flush → Finished | Failed.
    pub async fn run(self, record: Record) {
        let result = match self.stage.transform(record, &self.emitter).await {
            Ok(()) => self.stage.flush(&self.emitter).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => self.emitter.finish(),
            Err(e) => {
                tracing::debug!(stage = %self.stage.name(), error = %e, "stage signalled error");
                self.emitter.fail(e);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Collector
// ═══════════════════════════════════════════════════════════════

/// Collect events until the stage has stopped producing, then seal the set.
///
/// The set is sealed only after a terminal signal (`Finished` or `Failed`)
/// has been seen and every `Emitter` is dropped: the feed drops its own on
/// return, clones moved into stage tasks go when those tasks end. The
/// `finalize_yields` rounds of yield-and-drain run in between. If every
/// emitter is dropped without a terminal signal the stage is treated as
/// finished.
///
/// With `close_timeout` set, the wait for lingering emitters after the
/// terminal signal is bounded; whatever arrives later is lost.
pub async fn collect_emissions(
    mut rx: mpsc::UnboundedReceiver<StageEvent>,
    finalize_yields: usize,
    close_timeout: Option<Duration>,
) -> EmissionSet {
    let mut set = EmissionSet::default();

    while let Some(event) = rx.recv().await {
        let terminal = !matches!(event, StageEvent::Emitted(_));
        set.apply(event);
        if terminal {
            break;
        }
    }

    for _ in 0..finalize_yields {
        tokio::task::yield_now().await;
        while let Ok(event) = rx.try_recv() {
            set.apply(event);
        }
    }

    let drain = async {
        while let Some(event) = rx.recv().await {
            set.apply(event);
        }
    };
    match close_timeout {
        None => drain.await,
        Some(limit) => {
            if tokio::time::timeout(limit, drain).await.is_err() {
                tracing::warn!(
                    timeout_ms = limit.as_millis() as u64,
                    "emitter still held after terminal signal, sealing anyway"
                );
            }
        }
    }

    set
}
