use std::collections::BTreeMap;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use contract_harness::{HarnessConfig, Violation};
use stage_api::Representation;

use crate::error::CheckError;

#[derive(Parser)]
#[command(name = "contract-check", about = "Проверка контракта transform stage'ей")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Прогнать набор проверок из TOML файла
    Run(RunArgs),
    /// Показать известные stage'и
    Stages,
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Путь к TOML файлу с проверками
    #[arg(long, default_value = "suite.toml", env = "CONTRACT_SUITE")]
    pub suite: String,

    /// Отчёт в JSON
    #[arg(long)]
    pub json: bool,

    /// Остановиться на первой упавшей проверке
    #[arg(long)]
    pub fail_fast: bool,
}

// ---- TOML Suite ----

#[derive(Debug, Default, Deserialize)]
pub struct SuiteConfig {
    #[serde(default)]
    pub harness: HarnessConfig,
    #[serde(default)]
    pub checks: Vec<CheckConfig>,
}

/// Canned scenario a check runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    PassesAbsent,
    Transforms,
    Filters,
    Ignores,
    SingleBlock,
    SingleSource,
    Rejects,
    RejectsUnsupported,
}

#[derive(Debug, Deserialize)]
pub struct CheckConfig {
    pub name: String,
    /// Имя stage'а из встроенного реестра.
    pub stage: String,
    /// Конфигурация stage'а.
    #[serde(default)]
    pub stage_config: Option<toml::Value>,
    pub scenario: ScenarioKind,
    /// Содержимое входной записи. Без него запись absent.
    #[serde(default)]
    pub input: Option<String>,
    /// Source вместо block. Для single_* по умолчанию следует сценарию.
    #[serde(default)]
    pub as_source: Option<bool>,
    #[serde(default)]
    pub metadata: BTreeMap<String, toml::Value>,
    /// Ожидаемое содержимое для single_*.
    #[serde(default)]
    pub expect: Option<String>,
    /// Представление для rejects / rejects_unsupported.
    #[serde(default)]
    pub representation: Option<Representation>,
    /// Проверка проходит, только если stage нарушил контракт именно так.
    #[serde(default)]
    pub expect_violation: Option<Violation>,
}

impl SuiteConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, CheckError> {
        toml::from_str(content).map_err(|e| CheckError::Config { context: "parse", detail: e.to_string() })
    }

    pub fn load(path: &str) -> Result<Self, CheckError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CheckError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        toml::from_str(&content)
            .map_err(|e| CheckError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }
}

/// Сериализовать Option<toml::Value> в JSON-строку (или "{}").
pub fn config_json_or_empty(val: &Option<toml::Value>) -> Result<String, CheckError> {
    match val {
        Some(v) => Ok(serde_json::to_string(v)?),
        None => Ok("{}".to_string()),
    }
}
