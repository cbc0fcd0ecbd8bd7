use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::StageError;

// ════════════════════════════════════════════════════════════════
//  Representation
// ════════════════════════════════════════════════════════════════

/// Физическая форма содержимого записи.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    /// Содержимого нет.
    Absent,
    /// Байты целиком в памяти.
    Block,
    /// Последовательный источник, читается один раз.
    Source,
}

impl std::fmt::Display for Representation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Representation::Absent => f.write_str("absent"),
            Representation::Block => f.write_str("block"),
            Representation::Source => f.write_str("source"),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Contents
// ════════════════════════════════════════════════════════════════

/// Single-pass readable handle. Can be drained, never cloned.
pub struct ContentSource {
    reader: Box<dyn AsyncRead + Send + Sync + Unpin>,
}

impl ContentSource {
    pub fn new(reader: impl AsyncRead + Send + Sync + Unpin + 'static) -> Self {
        Self { reader: Box::new(reader) }
    }

    /// Source that yields `bytes` once.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(std::io::Cursor::new(bytes))
    }

    /// Read to end-of-data. A second drain yields whatever is left (usually nothing).
    pub async fn drain(&mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

impl std::fmt::Debug for ContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentSource(..)")
    }
}

/// Record contents. The variant is the representation; each variant only
/// carries what that representation supports.
#[derive(Debug, Default)]
pub enum Contents {
    #[default]
    Absent,
    Block(Vec<u8>),
    Source(ContentSource),
}

impl Contents {
    pub fn representation(&self) -> Representation {
        match self {
            Contents::Absent => Representation::Absent,
            Contents::Block(_) => Representation::Block,
            Contents::Source(_) => Representation::Source,
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Record
// ════════════════════════════════════════════════════════════════

/// Open set of named fields. Compared structurally, order-irrelevant.
pub type Metadata = BTreeMap<String, serde_json::Value>;

static NEXT_RECORD_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique record identity. Not part of structural equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordId(u64);

impl RecordId {
    fn next() -> Self {
        Self(NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One unit flowing through a transform stage.
#[derive(Debug)]
pub struct Record {
    id: RecordId,
    metadata: Metadata,
    contents: Contents,
}

/// Structural snapshot of a record: representation + metadata.
///
/// Taken before a record is handed to a stage, since the stage may
/// mutate or consume it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordShape {
    pub representation: Representation,
    pub metadata: Metadata,
}

impl Default for Record {
    fn default() -> Self {
        Self::new(Contents::Absent)
    }
}

impl Record {
    pub fn new(contents: Contents) -> Self {
        Self {
            id: RecordId::next(),
            metadata: Metadata::new(),
            contents,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn representation(&self) -> Representation {
        self.contents.representation()
    }

    pub fn contents(&self) -> &Contents {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut Contents {
        &mut self.contents
    }

    /// Replace contents, returning the previous ones.
    pub fn set_contents(&mut self, contents: Contents) -> Contents {
        std::mem::replace(&mut self.contents, contents)
    }

    pub fn set_block(&mut self, bytes: impl Into<Vec<u8>>) {
        self.contents = Contents::Block(bytes.into());
    }

    pub fn set_source(&mut self, source: ContentSource) {
        self.contents = Contents::Source(source);
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn remove_meta(&mut self, key: &str) -> Option<serde_json::Value> {
        self.metadata.remove(key)
    }

    pub fn shape(&self) -> RecordShape {
        RecordShape {
            representation: self.representation(),
            metadata: self.metadata.clone(),
        }
    }

    /// Copy into a new record with a fresh identity.
    ///
    /// Source contents are single-pass, so a `Source` record cannot be cloned.
    pub fn try_clone(&self) -> Result<Record, StageError> {
        let contents = match &self.contents {
            Contents::Absent => Contents::Absent,
            Contents::Block(bytes) => Contents::Block(bytes.clone()),
            Contents::Source(_) => {
                return Err(StageError::new(format!(
                    "record {}: source contents cannot be cloned",
                    self.id
                )));
            }
        };
        Ok(Record {
            id: RecordId::next(),
            metadata: self.metadata.clone(),
            contents,
        })
    }

    /// Drain a `Source` record and put an equivalent fresh source back.
    ///
    /// Returns the drained bytes, `None` for other representations.
    pub async fn tee_source(&mut self) -> Result<Option<Vec<u8>>, StageError> {
        let Contents::Source(source) = &mut self.contents else {
            return Ok(None);
        };
        let bytes = source.drain().await?;
        self.contents = Contents::Source(ContentSource::from_bytes(bytes.clone()));
        Ok(Some(bytes))
    }
}

/// Classify a record's representation.
pub fn classify(record: &Record) -> Representation {
    record.representation()
}

/// Contents as text (lossy UTF-8). `None` for `Absent`.
///
/// Draining a `Source` is destructive: call this at most once per source record.
pub async fn extract_content(record: &mut Record) -> Result<Option<String>, StageError> {
    match &mut record.contents {
        Contents::Absent => Ok(None),
        Contents::Block(bytes) => Ok(Some(String::from_utf8_lossy(bytes).into_owned())),
        Contents::Source(source) => {
            let bytes = source
                .drain()
                .await
                .map_err(|e| StageError::from(e).with_context(format!("record {}", record.id)))?;
            Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
        }
    }
}
