use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use stage_api::{
    ContentSource, Contents, Emitter, Record, Representation, StageError, TransformStage,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineSplitConfig {
    /// Максимальная длина строки в байтах (0 = без ограничения).
    #[serde(default)]
    pub max_length: usize,
    /// Не эмитить пустые строки.
    #[serde(default)]
    pub skip_empty: bool,
}

/// Splits a record's contents on `\n` into one record per line.
///
/// Each line keeps the input's representation and metadata, plus a `line`
/// field with its zero-based index. Absent records pass through.
pub struct LineSplitStage {
    config: LineSplitConfig,
}

impl LineSplitStage {
    pub fn new(config: LineSplitConfig) -> Self {
        Self { config }
    }

    fn split<'b>(&self, bytes: &'b [u8]) -> Result<Vec<&'b [u8]>, StageError> {
        let mut lines = Vec::new();
        for line in bytes.split(|&b| b == b'\n') {
            // обрезаем \r
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if self.config.max_length > 0 && line.len() > self.config.max_length {
                return Err(StageError::format_err(format!(
                    "line too long: {} bytes (max {})",
                    line.len(),
                    self.config.max_length
                )));
            }
            if line.is_empty() && self.config.skip_empty {
                continue;
            }
            lines.push(line);
        }
        // завершающий \n не даёт лишней пустой строки
        if bytes.ends_with(b"\n") && lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        Ok(lines)
    }
}

impl Default for LineSplitStage {
    fn default() -> Self {
        Self::new(LineSplitConfig::default())
    }
}

impl TransformStage for LineSplitStage {
    fn name(&self) -> &str {
        "line-split"
    }

    fn transform<'a>(
        &'a self,
        mut record: Record,
        emitter: &'a Emitter,
    ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
        Box::pin(async move {
            let representation = record.representation();
            let bytes = match record.set_contents(Contents::Absent) {
                Contents::Absent => return emitter.push(record),
                Contents::Block(bytes) => bytes,
                Contents::Source(mut source) => source.drain().await?,
            };

            for (index, line) in self.split(&bytes)?.into_iter().enumerate() {
                let mut out = record.try_clone()?;
                out.set_meta("line", index);
                match representation {
                    Representation::Source => out.set_source(ContentSource::from_bytes(line.to_vec())),
                    _ => out.set_block(line),
                }
                emitter.push(out)?;
            }
            Ok(())
        })
    }
}
