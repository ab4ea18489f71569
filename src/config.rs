use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::aggregate::DistributionSource;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "repo-dashboard.json";

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Settings read from a JSON file, all optional:
///
/// ```json
/// { "data_path": "github_dataset.csv", "language_distribution": "loaded" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// File loaded at start-up and by "Reload default".
    pub data_path: PathBuf,
    /// Whether the language pie counts every loaded row or only filtered ones.
    pub language_distribution: DistributionSource,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("github_dataset.csv"),
            language_distribution: DistributionSource::Loaded,
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Use `explicit` if given, else `repo-dashboard.json` in the working
    /// directory if it exists, else the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.exists() {
            log::info!("Using config {}", fallback.display());
            return Self::from_file(fallback);
        }
        Ok(Self::default())
    }
}
