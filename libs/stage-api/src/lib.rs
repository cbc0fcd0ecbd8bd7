//! Record model and the transform-stage seam.
//!
//! Stages consume [`Record`]s one at a time and emit zero or more records
//! through an [`Emitter`]. Content comes in one of three representations:
//! absent, an in-memory block, or a single-pass sequential source.

pub mod error;
pub mod fixtures;
pub mod record;
pub mod stage;

pub use error::{ErrorKind, StageError};
pub use record::{
    classify, extract_content, ContentSource, Contents, Metadata, Record, RecordId, RecordShape,
    Representation,
};
pub use stage::{ensure_supported, Emitter, StageEvent, TransformStage};
