//! `promptc.toml` configuration.
//!
//! All keys are optional. Command-line flags override the file.
//!
//! # Example
//!
//! ```toml
//! [catalog]
//! path = "fixtures/catalog.json"
//!
//! [output]
//! format = "json"
//!
//! [log]
//! filter = "promptc_core=debug"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::OutputFormat;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "promptc.toml";

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub log: LogSettings,
}

/// `[catalog]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSettings {
    /// Catalog used when a command gets no `--catalog`. Relative paths are
    /// resolved against the config file's directory.
    pub path: Option<PathBuf>,
}

/// `[output]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSettings {
    pub format: Option<ConfigFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    Text,
    Json,
}

impl From<ConfigFormat> for OutputFormat {
    fn from(f: ConfigFormat) -> Self {
        match f {
            ConfigFormat::Text => OutputFormat::Text,
            ConfigFormat::Json => OutputFormat::Json,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSettings {
    /// `tracing` filter directive, e.g. `debug` or `promptc_core=trace`.
    pub filter: Option<String>,
}

// ── Functions ─────────────────────────────────────────────────────────────────

/// Parse config TOML. `origin` names the source in errors.
pub fn parse_config(content: &str, origin: &Path) -> Result<Config, String> {
    toml::from_str(content).map_err(|e| format!("could not parse '{}': {}", origin.display(), e))
}

/// Load the explicit config file, or `promptc.toml` from the working
/// directory when present. A missing default file is not an error; a
/// missing explicit file is.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, String> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    if !required && !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    let mut config = parse_config(&content, &path)?;

    if let Some(catalog) = config.catalog.path.take() {
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.catalog.path = Some(base.join(catalog));
    }
    Ok(config)
}
