//! Configuration model for phabstack.
//!
//! This module defines the Config struct that represents `.phabstack.yaml` at
//! the repository root. The file is optional. It supports forward-compatible
//! YAML parsing (unknown fields are ignored), defaults for every field, and
//! validation of config values.

mod model;
mod operations;


pub use model::{CONFIG_FILE_NAME, Config};
pub use operations::API_TOKEN_ENV;
