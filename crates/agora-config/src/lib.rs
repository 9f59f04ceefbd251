//! Configuration system for the Agora relay server.
//!
//! Provides TOML-based configuration with:
//! - Typed sections for the listener, upstream API, credential cookies and redirects
//! - Config file layering (user config dir + project-local overrides)
//! - `AGORA_*` environment overrides applied last

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, apply_env_overrides, load_config, load_config_file,
    load_config_with_options, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
