//! Configuration file loader.

use std::path::{Path, PathBuf};

use super::AgentConfig;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "runner-agent.toml";

/// Looks for the agent's TOML file in a fixed list of places and loads the
/// first one present.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Candidate files, highest precedence first.
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Search the working directory, then the user config directory.
    #[must_use]
    pub fn new() -> Self {
        let search_paths = std::iter::once(PathBuf::from(LOCAL_CONFIG_FILE))
            .chain(Self::user_config_path())
            .collect();
        Self { search_paths }
    }

    /// Only consider `path`; used for `--config`.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
        }
    }

    /// `<config_dir>/runner-agent/config.toml`, when the platform has a
    /// user config directory.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("runner-agent").join("config.toml"))
    }

    /// Load the first file found, or defaults when there is none.
    ///
    /// Environment overrides are not applied here.
    ///
    /// # Errors
    ///
    /// Returns an error if the file found cannot be read or parsed.
    pub fn load(&self) -> Result<AgentConfig, ConfigError> {
        let Some(path) = self.find_config_file() else {
            tracing::debug!(
                candidates = self.search_paths.len(),
                "No config file found, using defaults"
            );
            return Ok(AgentConfig::default());
        };

        tracing::debug!(path = %path.display(), "Loading config file");
        Self::load_from_path(&path)
    }

    /// Load configuration and apply environment overrides on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or an override is
    /// invalid.
    pub fn load_with_env(&self) -> Result<AgentConfig, ConfigError> {
        let mut config = self.load()?;
        config.apply_env()?;
        Ok(config)
    }

    fn load_from_path(path: &Path) -> Result<AgentConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// First search path that exists on disk.
    #[must_use]
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths.iter().find(|p| p.exists()).cloned()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
