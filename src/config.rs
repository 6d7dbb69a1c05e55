use crate::engine::{DEFAULT_MAX_PATHS, EngineOptions};
use crate::level::LintLevel;
use crate::types::{DataModel, TargetInfo};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PtrScaleConfig {
    #[serde(default)]
    pub lints: LintsConfig,

    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct LintsConfig {
    #[serde(default)]
    pub disabled: Vec<String>,

    /// Also run checkers that are still in preview.
    #[serde(default)]
    pub preview: bool,

    #[serde(flatten)]
    pub levels: HashMap<String, LintLevel>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    #[serde(default)]
    pub data_model: DataModel,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_paths: DEFAULT_MAX_PATHS,
        }
    }
}

fn default_max_paths() -> usize {
    DEFAULT_MAX_PATHS
}

impl PtrScaleConfig {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            target: TargetInfo::new(self.target.data_model),
            max_paths: self.engine.max_paths.max(1),
        }
    }
}

pub const DEFAULT_CONFIG_FILE_NAME: &str = "ptr-scale-lint.toml";

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut cur = Some(start_dir);
    while let Some(dir) = cur {
        let candidate = dir.join(DEFAULT_CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = dir.parent();
    }
    None
}

pub fn load_config_file(path: &Path) -> Result<PtrScaleConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let cfg: PtrScaleConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(cfg)
}

pub fn load_config(
    explicit_path: Option<&Path>,
    start_dir: &Path,
) -> Result<Option<(PathBuf, PtrScaleConfig)>> {
    if let Some(p) = explicit_path {
        let cfg = load_config_file(p)?;
        return Ok(Some((p.to_path_buf(), cfg)));
    }

    let Some(p) = find_config_file(start_dir) else {
        return Ok(None);
    };
    let cfg = load_config_file(&p)?;
    Ok(Some((p, cfg)))
}
