//! Config struct definition and default implementation.

use serde::{Deserialize, Serialize};

/// Name of the config file at the repository root.
pub const CONFIG_FILE_NAME: &str = ".phabstack.yaml";

/// Configuration for phabstack.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Phabricator settings
    // =========================================================================
    /// Base URL of the Phabricator instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phabricator_url: Option<String>,

    /// Conduit API token. Prefer the environment variable.
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,

    /// Repository PHID attached to created diffs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_phid: Option<String>,

    // =========================================================================
    // Git settings
    // =========================================================================
    /// Remote whose main branch the stack is based on (default: "origin").
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Name of the main branch (default: "main").
    #[serde(default = "default_main_branch")]
    pub main_branch: String,

    // =========================================================================
    // Diff settings
    // =========================================================================
    /// Files larger than this are uploaded as binaries.
    #[serde(default = "default_max_text_size")]
    pub max_text_size: usize,

    /// Files larger than this get a reduced context window.
    #[serde(default = "default_max_context_size")]
    pub max_context_size: usize,

    /// Always use the reduced context window.
    #[serde(default)]
    pub less_context: bool,

    /// Concurrent binary uploads.
    #[serde(default = "default_upload_workers")]
    pub upload_workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            phabricator_url: None,
            api_token: None,
            repository_phid: None,
            remote: default_remote(),
            main_branch: default_main_branch(),
            max_text_size: default_max_text_size(),
            max_context_size: default_max_context_size(),
            less_context: false,
            upload_workers: default_upload_workers(),
        }
    }
}

pub(crate) fn default_remote() -> String {
    "origin".to_string()
}
pub(crate) fn default_main_branch() -> String {
    "main".to_string()
}
pub(crate) fn default_max_text_size() -> usize {
    10 * 1024 * 1024
}
pub(crate) fn default_max_context_size() -> usize {
    4 * 1024 * 1024
}
pub(crate) fn default_upload_workers() -> usize {
    5
}
