//! Config loading, validation, and utility operations.

use super::model::{CONFIG_FILE_NAME, Config};
use crate::diff::BuildOptions;
use crate::error::{PhabError, Result};
use std::path::Path;

/// Environment variable overriding `api_token`.
pub const API_TOKEN_ENV: &str = "PHABSTACK_API_TOKEN";

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the config file
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(PhabError::UserError)` - Read or parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            PhabError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load `.phabstack.yaml` from the repository root, or defaults if absent.
    pub fn discover<P: AsRef<Path>>(repo_root: P) -> Result<Self> {
        let path = repo_root.as_ref().join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| PhabError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string. The API token is never written.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            PhabError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `upload_workers`, `max_text_size` and `max_context_size` must be positive
    /// - `phabricator_url`, when set, must be an http(s) URL
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("upload_workers", self.upload_workers),
            ("max_text_size", self.max_text_size),
            ("max_context_size", self.max_context_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(PhabError::UserError(format!(
                    "config validation failed: {} must be greater than 0",
                    name
                )));
            }
        }

        if let Some(url) = &self.phabricator_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(PhabError::UserError(format!(
                "config validation failed: phabricator_url must start with http:// or https:// (found '{}')",
                url
            )));
        }

        Ok(())
    }

    /// Phabricator URL, required by every command talking to the server.
    pub fn require_url(&self) -> Result<&str> {
        self.phabricator_url.as_deref().ok_or_else(|| {
            PhabError::UserError(format!(
                "phabricator_url is not configured. Add it to {}.",
                CONFIG_FILE_NAME
            ))
        })
    }

    /// API token, from the environment first and the config file second.
    pub fn api_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var(API_TOKEN_ENV)
            && !token.trim().is_empty()
        {
            return Ok(token.trim().to_string());
        }
        self.api_token.clone().ok_or_else(|| {
            PhabError::UserError(format!(
                "no API token found. Set {} or api_token in {}.",
                API_TOKEN_ENV, CONFIG_FILE_NAME
            ))
        })
    }

    /// Base revision of the stack when none is given: `{remote}/{main_branch}`.
    pub fn default_base(&self) -> String {
        format!("{}/{}", self.remote, self.main_branch)
    }

    /// Diff build options, with `less_context` forced on by the command line.
    pub fn build_options(&self, less_context: bool) -> BuildOptions {
        BuildOptions {
            max_text_size: self.max_text_size,
            max_context_size: self.max_context_size,
            less_context: less_context || self.less_context,
        }
    }
}
