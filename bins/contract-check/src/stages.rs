use serde::de::DeserializeOwned;

use stage_api::TransformStage;
use stage_block_to_source::BlockToSourceStage;
use stage_greeting::{GreetingConfig, GreetingStage};
use stage_key_filter::{KeyFilterConfig, KeyFilterStage};
use stage_line_split::{LineSplitConfig, LineSplitStage};
use stage_passthrough::PassthroughStage;

use crate::config::config_json_or_empty;
use crate::error::CheckError;

/// Stages known to the runner, with a one-line description.
pub const KNOWN_STAGES: &[(&str, &str)] = &[
    ("passthrough", "emits every record as-is"),
    ("greeting", "block-only hello → hello world; drops goodbye"),
    ("key-filter", "drops records whose metadata field is not allowed"),
    ("line-split", "one record per line, representation kept"),
    ("block-to-source", "re-emits blocks as sources; breaks the contract"),
];

fn parse_config<T: DeserializeOwned>(
    stage: &str,
    config: &Option<toml::Value>,
) -> Result<T, CheckError> {
    let json = config_json_or_empty(config)?;
    serde_json::from_str(&json).map_err(|e| CheckError::StageConfig {
        stage: stage.to_string(),
        detail: e.to_string(),
    })
}

/// Build a stage by registry name.
pub fn build_stage(
    name: &str,
    config: &Option<toml::Value>,
) -> Result<Box<dyn TransformStage>, CheckError> {
    let stage: Box<dyn TransformStage> = match name {
        "passthrough" => Box::new(PassthroughStage::new()),
        "greeting" => Box::new(GreetingStage::new(parse_config::<GreetingConfig>(name, config)?)),
        "key-filter" => {
            Box::new(KeyFilterStage::new(parse_config::<KeyFilterConfig>(name, config)?))
        }
        "line-split" => {
            Box::new(LineSplitStage::new(parse_config::<LineSplitConfig>(name, config)?))
        }
        "block-to-source" => Box::new(BlockToSourceStage::new()),
        other => return Err(CheckError::UnknownStage(other.to_string())),
    };
    tracing::debug!(stage = %name, "built stage");
    Ok(stage)
}
