use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use stage_api::{ensure_supported, extract_content, Emitter, Record, StageError, TransformStage};

fn default_greeting() -> String {
    "hello".into()
}
fn default_suffix() -> String {
    " world".into()
}
fn default_farewell() -> String {
    "goodbye".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GreetingConfig {
    /// Содержимое, к которому дописывается `suffix`.
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// Записи с таким содержимым отбрасываются.
    #[serde(default = "default_farewell")]
    pub farewell: String,
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            suffix: default_suffix(),
            farewell: default_farewell(),
        }
    }
}

/// Block-only stage:
/// - `greeting` → `greeting + suffix`
/// - `greeting greeting` → two records, both `greeting + suffix`
/// - `farewell` → dropped
/// - anything else, and absent records → passed through.
pub struct GreetingStage {
    config: GreetingConfig,
}

impl GreetingStage {
    pub fn new(config: GreetingConfig) -> Self {
        Self { config }
    }
}

impl Default for GreetingStage {
    fn default() -> Self {
        Self::new(GreetingConfig::default())
    }
}

impl TransformStage for GreetingStage {
    fn name(&self) -> &str {
        "greeting"
    }

    fn transform<'a>(
        &'a self,
        mut record: Record,
        emitter: &'a Emitter,
    ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
        Box::pin(async move {
            ensure_supported(self.name(), &record, true, false)?;

            let Some(contents) = extract_content(&mut record).await? else {
                return emitter.push(record);
            };

            let cfg = &self.config;
            let greeted = format!("{}{}", cfg.greeting, cfg.suffix);
            let twice = format!("{} {}", cfg.greeting, cfg.greeting);

            if contents == cfg.greeting {
                record.set_block(greeted);
                emitter.push(record)
            } else if contents == twice {
                record.set_block(greeted);
                let copy = record.try_clone()?;
                emitter.push(record)?;
                emitter.push(copy)
            } else if contents == cfg.farewell {
                Ok(())
            } else {
                emitter.push(record)
            }
        })
    }
}
