//! Configuration loading: file, environment overrides and validation.
//!
//! Schema and defaults live in `domain::config`.

mod load_config;

pub use load_config::{DEFAULT_CONFIG_FILE, apply_env_overrides, load_config, parse_config_content};
