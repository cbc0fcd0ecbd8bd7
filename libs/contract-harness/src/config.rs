use std::time::Duration;

use serde::Deserialize;

use crate::error::HarnessError;

fn default_finalize_yields() -> usize {
    1
}

/// Настройки harness'а.
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    /// Сколько раз уступить планировщику после сигнала завершения stage,
    /// прежде чем запечатать набор эмиссий. Минимум 1.
    #[serde(default = "default_finalize_yields")]
    pub finalize_yields: usize,
    /// Сколько ждать (мс) освобождения всех emitter'ов после сигнала
    /// завершения. Без значения ждём, пока stage не отпустит их все.
    #[serde(default)]
    pub close_timeout_ms: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            finalize_yields: default_finalize_yields(),
            close_timeout_ms: None,
        }
    }
}

impl HarnessConfig {
    /// Parse from a TOML document (a bare `[harness]` table body).
    pub fn from_toml_str(content: &str) -> Result<Self, HarnessError> {
        toml::from_str(content).map_err(|e| HarnessError::Config {
            context: "parse",
            detail: e.to_string(),
        })
    }

    pub fn load(path: &str) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path).map_err(|e| HarnessError::Config {
            context: "read",
            detail: format!("'{path}': {e}"),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            HarnessError::Config { context, detail } => HarnessError::Config {
                context,
                detail: format!("'{path}': {detail}"),
            },
            other => other,
        })
    }

    /// Effective yield count: the deferred finalize always happens at least once.
    pub fn effective_finalize_yields(&self) -> usize {
        self.finalize_yields.max(1)
    }

    pub fn close_timeout(&self) -> Option<Duration> {
        self.close_timeout_ms.map(Duration::from_millis)
    }
}
