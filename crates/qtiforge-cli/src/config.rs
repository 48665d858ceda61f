//! CLI configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use qtiforge_core::branch::BranchRulePolicy;

/// Top-level qtiforge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QtiforgeConfig {
    /// Destination directory for compiled artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Behavior when a malformed branch rule fails to evaluate.
    #[serde(default)]
    pub branch_rule_policy: BranchRulePolicy,
    /// Require non-empty responses before accepting a move.
    #[serde(default)]
    pub validate_responses: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./qtiforge-build")
}

impl Default for QtiforgeConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            branch_rule_policy: BranchRulePolicy::default(),
            validate_responses: false,
        }
    }
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `qtiforge.toml` in the current directory
/// 2. `~/.config/qtiforge/config.toml`
pub fn load_config_from(path: Option<&Path>) -> Result<QtiforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("qtiforge.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            global.exists().then_some(global)
        } else {
            None
        }
    };

    match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<QtiforgeConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))
        }
        None => Ok(QtiforgeConfig::default()),
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("qtiforge"))
}
