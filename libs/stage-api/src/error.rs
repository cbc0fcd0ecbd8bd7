use crate::record::Representation;

/// Category of a stage error. Lets the harness and scenario helpers tell
/// a deliberate rejection apart from an ordinary failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid stage configuration.
    Config,
    /// I/O error while reading or writing record contents.
    Io,
    /// Content could not be parsed.
    Format,
    /// Logical error (invalid state, generic).
    Logic,
    /// The stage does not accept this content representation.
    Unsupported,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Io => f.write_str("io"),
            ErrorKind::Format => f.write_str("format"),
            ErrorKind::Logic => f.write_str("logic"),
            ErrorKind::Unsupported => f.write_str("unsupported"),
        }
    }
}

/// Error signalled by a transform stage.
///
/// Carries an `ErrorKind` for categorization and a human-readable message.
/// `Unsupported` errors also remember which representation was rejected.
#[derive(Clone, PartialEq, Eq)]
pub struct StageError {
    kind: ErrorKind,
    message: String,
    rejected: Option<Representation>,
}

impl StageError {
    /// Generic logic error (default kind).
    pub fn new(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Logic, message: msg.into(), rejected: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into(), rejected: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Io, message: msg.into(), rejected: None }
    }

    pub fn format_err(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Format, message: msg.into(), rejected: None }
    }

    /// `stage` refused a record because of its content representation.
    pub fn unsupported(stage: &str, representation: Representation) -> Self {
        Self {
            kind: ErrorKind::Unsupported,
            message: format!("{stage}: {representation} contents are not supported"),
            rejected: Some(representation),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Representation named by an `Unsupported` error, `None` for other kinds.
    pub fn rejected_representation(&self) -> Option<Representation> {
        self.rejected
    }

    /// Add context to the error, preserving kind and rejected representation.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
            rejected: self.rejected,
        }
    }
}

impl std::fmt::Debug for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StageError {}

impl From<String> for StageError {
    fn from(s: String) -> Self { Self::new(s) }
}

impl From<&str> for StageError {
    fn from(s: &str) -> Self { Self::new(s) }
}

impl From<std::io::Error> for StageError {
    fn from(e: std::io::Error) -> Self { Self::io(e.to_string()) }
}

impl From<serde_json::Error> for StageError {
    fn from(e: serde_json::Error) -> Self { Self::format_err(e.to_string()) }
}
