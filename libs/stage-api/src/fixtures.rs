//! Record construction helpers for test fixtures.
//!
//! Every helper builds an independent record: the same text twice gives two
//! records with equal contents and distinct identity. The `*_with` variants
//! run `on_create` on the new record before returning it.

use crate::record::{ContentSource, Contents, Record};

pub fn absent_record() -> Record {
    Record::default()
}

pub fn block_record(text: &str) -> Record {
    Record::new(Contents::Block(text.as_bytes().to_vec()))
}

pub fn block_record_with(text: &str, on_create: impl FnOnce(&mut Record)) -> Record {
    let mut record = block_record(text);
    on_create(&mut record);
    record
}

/// `Source` record that yields `text` when drained once.
pub fn source_record(text: &str) -> Record {
    Record::new(Contents::Source(ContentSource::from_bytes(text.as_bytes().to_vec())))
}

pub fn source_record_with(text: &str, on_create: impl FnOnce(&mut Record)) -> Record {
    let mut record = source_record(text);
    on_create(&mut record);
    record
}

pub fn record(text: &str, as_source: bool) -> Record {
    if as_source { source_record(text) } else { block_record(text) }
}

pub fn record_with(text: &str, as_source: bool, on_create: impl FnOnce(&mut Record)) -> Record {
    if as_source {
        source_record_with(text, on_create)
    } else {
        block_record_with(text, on_create)
    }
}
