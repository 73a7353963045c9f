//! Configuration from `config.toml` in the data directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::{normalize_hex, PALETTE};
use crate::error::ConfigError;
use crate::fields::DeletePolicy;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Project opened when `--project` is not given.
    #[serde(default)]
    pub project: Option<String>,
    /// `tracing` filter directive, e.g. `pt=debug`.
    #[serde(default)]
    pub log_filter: Option<String>,
    #[serde(default)]
    pub delete_policy: DeletePolicy,
    #[serde(default)]
    pub palette: PaletteConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteConfig {
    #[serde(default = "default_palette")]
    pub colors: Vec<String>,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        PaletteConfig { colors: default_palette() }
    }
}

fn default_palette() -> Vec<String> {
    PALETTE.iter().map(|c| c.to_string()).collect()
}

impl Config {
    /// Read `config.toml` from `dir`. A missing file yields the defaults.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let mut config: Config =
            toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })?;
        config.palette.colors = validate_palette(&config.palette.colors)?;
        Ok(config)
    }
}

fn validate_palette(colors: &[String]) -> Result<Vec<String>, ConfigError> {
    if colors.is_empty() {
        return Err(ConfigError::EmptyPalette);
    }
    colors
        .iter()
        .map(|c| normalize_hex(c).ok_or_else(|| ConfigError::InvalidPaletteColor(c.clone())))
        .collect()
}

/// Data directory: the `--dir` flag, then `$PT_HOME`, then `$HOME/.pt`.
pub fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = flag {
        return dir;
    }
    if let Some(dir) = std::env::var_os("PT_HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".pt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.palette.colors.len(), 8);
        assert_eq!(config.delete_policy, DeletePolicy::Reparent);
    }

    #[test]
    fn test_full_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r##"
project = "Website relaunch"
log_filter = "pt=debug"
delete_policy = "cascade"

[palette]
colors = ["#FF0000", "00ff00"]
"##,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.project.as_deref(), Some("Website relaunch"));
        assert_eq!(config.delete_policy, DeletePolicy::Cascade);
        assert_eq!(config.palette.colors, vec!["#ff0000".to_string(), "#00ff00".to_string()]);
    }

    #[test]
    fn test_bad_palette_and_syntax_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        fs::write(&path, "[palette]\ncolors = [\"#12\"]\n").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(ConfigError::InvalidPaletteColor(_))));

        fs::write(&path, "[palette]\ncolors = []\n").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(ConfigError::EmptyPalette)));

        fs::write(&path, "delete_policy = \"shred\"\n").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_documented_log_filter_names_this_crate() {
        let config: Config = toml::from_str("log_filter = \"pt=debug\"").unwrap();
        let target = config.log_filter.as_deref().and_then(|f| f.split('=').next());
        assert_eq!(target, module_path!().split("::").next());
    }

    #[test]
    fn test_dir_flag_wins() {
        assert_eq!(resolve_data_dir(Some(PathBuf::from("/tmp/x"))), PathBuf::from("/tmp/x"));
    }
}
