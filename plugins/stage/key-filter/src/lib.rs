use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use stage_api::{Emitter, Record, Representation, StageError, TransformStage};

fn default_field() -> String {
    "key".into()
}
fn default_keep_missing() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyFilterConfig {
    /// Поле metadata, по которому фильтруем.
    #[serde(default = "default_field")]
    pub field: String,
    /// Список разрешённых значений. Пустой = пропускать все.
    #[serde(default)]
    pub allow: Vec<String>,
    /// Пропускать записи без поля `field`.
    #[serde(default = "default_keep_missing")]
    pub keep_missing: bool,
}

impl Default for KeyFilterConfig {
    fn default() -> Self {
        Self {
            field: default_field(),
            allow: Vec::new(),
            keep_missing: default_keep_missing(),
        }
    }
}

/// Drops records whose metadata field is not in the allow-list.
///
/// Records without contents always pass: an absent record carries nothing to filter.
pub struct KeyFilterStage {
    config: KeyFilterConfig,
}

impl KeyFilterStage {
    pub fn new(config: KeyFilterConfig) -> Self {
        Self { config }
    }

    fn keeps(&self, record: &Record) -> bool {
        if record.representation() == Representation::Absent || self.config.allow.is_empty() {
            return true;
        }
        match record.meta(&self.config.field) {
            Some(serde_json::Value::String(s)) => self.config.allow.iter().any(|a| a == s),
            Some(other) => {
                let text = other.to_string();
                self.config.allow.iter().any(|a| *a == text)
            }
            None => self.config.keep_missing,
        }
    }
}

impl TransformStage for KeyFilterStage {
    fn name(&self) -> &str {
        "key-filter"
    }

    fn transform<'a>(
        &'a self,
        record: Record,
        emitter: &'a Emitter,
    ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
        Box::pin(async move {
            if !self.keeps(&record) {
                return Ok(()); // filtered out
            }
            emitter.push(record)
        })
    }
}

#[cfg(test)]
mod tests {
    use contract_harness::Harness;
    use stage_api::fixtures::{block_record_with, source_record_with};

    use super::*;

    fn stage(allow: &[&str]) -> KeyFilterStage {
        KeyFilterStage::new(KeyFilterConfig {
            allow: allow.iter().map(|s| s.to_string()).collect(),
            ..KeyFilterConfig::default()
        })
    }

    #[tokio::test]
    async fn keeps_allowed_keys() {
        let record = block_record_with("quote", |r| r.set_meta("key", "EURUSD"));
        Harness::default().ignores(&stage(&["EURUSD"]), record).await.unwrap();
    }

    #[tokio::test]
    async fn drops_other_keys() {
        let h = Harness::default();
        let record = block_record_with("quote", |r| r.set_meta("key", "GBPUSD"));
        h.filters(&stage(&["EURUSD"]), record).await.unwrap();
        let record = source_record_with("quote", |r| r.set_meta("key", "GBPUSD"));
        h.filters(&stage(&["EURUSD"]), record).await.unwrap();
    }

    #[tokio::test]
    async fn missing_field_follows_config() {
        let h = Harness::default();
        h.ignores(&stage(&["EURUSD"]), block_record_with("x", |_| {})).await.unwrap();

        let strict = KeyFilterStage::new(KeyFilterConfig {
            allow: vec!["EURUSD".into()],
            keep_missing: false,
            ..KeyFilterConfig::default()
        });
        h.filters(&strict, block_record_with("x", |_| {})).await.unwrap();
        h.passes_through_absent(&strict).await.unwrap();
    }

    #[tokio::test]
    async fn numeric_fields_compare_as_text() {
        let record = block_record_with("x", |r| r.set_meta("key", 42));
        Harness::default().ignores(&stage(&["42"]), record).await.unwrap();
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: KeyFilterConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.field, "key");
        assert!(config.allow.is_empty());
        assert!(config.keep_missing);
        assert!(serde_json::from_str::<KeyFilterConfig>("{\"allow\": 3}").is_err());
    }
}
