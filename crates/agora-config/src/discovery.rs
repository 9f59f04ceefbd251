//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/agora/config.toml` (user config, or `$AGORA_CONFIG_DIR/config.toml`)
//! 2. `./agora.toml` (project-local)
//! 3. `AGORA_*` environment variables
//! 4. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{AgoraConfig, ConfigError, Result};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "agora.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for config directory resolution.
const APP_NAME: &str = "agora";

/// Environment variable to override the config directory.
pub const CONFIG_DIR_ENV: &str = "AGORA_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AgoraConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
}

impl LoadedConfig {
    /// Paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration by discovering and merging all layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Load configuration with explicit control over the user config directory.
///
/// Environment overrides are applied after the file layers.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut merged = toml::Table::new();
    let mut sources = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut merged, &path)?);
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut merged, &project_path)?);

    let mut config: AgoraConfig = toml::Value::Table(merged).try_into()?;
    apply_env_overrides(&mut config)?;
    config.validate()?;

    Ok(LoadedConfig { config, sources })
}

/// Load config from a specific file path (no discovery, no env overrides).
pub fn load_config_file(path: &Path) -> Result<AgoraConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    AgoraConfig::from_toml(&contents)
}

/// User config directory: `$AGORA_CONFIG_DIR`, else the platform config dir.
pub fn user_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Path of the user config file.
pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Apply `AGORA_*` environment overrides from the process environment.
pub fn apply_env_overrides(config: &mut AgoraConfig) -> Result<()> {
    apply_overrides_from(config, |var| std::env::var(var).ok())
}

/// Apply overrides using an arbitrary lookup.
fn apply_overrides_from(
    config: &mut AgoraConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(url) = lookup("AGORA_UPSTREAM_URL") {
        config.upstream.url = url;
    }
    if let Some(bind) = lookup("AGORA_BIND") {
        config.server.bind = bind;
    }
    if let Some(domain) = lookup("AGORA_COOKIE_DOMAIN") {
        config.cookies.domain = Some(domain).filter(|d| !d.is_empty());
    }
    if let Some(env) = lookup("AGORA_ENV") {
        config.cookies.production = match env.as_str() {
            "production" | "prod" => true,
            "development" | "dev" | "test" => false,
            other => {
                return Err(ConfigError::InvalidEnv {
                    var: "AGORA_ENV".to_string(),
                    reason: format!("unknown environment '{}'", other),
                });
            }
        };
    }
    Ok(())
}

/// Merge one file into the accumulated table, if it exists.
fn load_layer(merged: &mut toml::Table, path: &Path) -> Result<ConfigSource> {
    if !path.exists() {
        return Ok(ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        });
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let layer: toml::Table = toml::from_str(&contents)?;
    merge_tables(merged, layer);
    tracing::debug!(path = %path.display(), "Loaded config layer");

    Ok(ConfigSource {
        path: path.to_path_buf(),
        loaded: true,
    })
}

/// Deep-merge `overlay` into `base`; overlay wins on conflicts.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_project_overrides_user_layer() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(
            user.path(),
            USER_CONFIG_FILE,
            "[upstream]\nurl = \"https://user.example/api\"\nrequest_timeout_secs = 5\n",
        );
        write(
            project.path(),
            PROJECT_CONFIG_FILE,
            "[upstream]\nurl = \"https://project.example/api\"\n",
        );

        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();
        assert_eq!(loaded.config.upstream.url, "https://project.example/api");
        // Untouched keys from the lower layer survive the merge.
        assert_eq!(loaded.config.upstream.request_timeout_secs, 5);
        assert_eq!(loaded.loaded_from().len(), 2);
    }

    #[test]
    fn test_missing_files_give_defaults() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.config.redirects.login, "/login");
    }

    #[test]
    fn test_invalid_layer_is_an_error() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(project.path(), PROJECT_CONFIG_FILE, "[upstream\nurl = ");
        let err = load_config_with_options(Some(project.path()), Some(user.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("AGORA_UPSTREAM_URL", "https://env.example/api"),
            ("AGORA_ENV", "production"),
            ("AGORA_COOKIE_DOMAIN", ".agora.example"),
        ]
        .into_iter()
        .collect();

        let mut config = AgoraConfig::default();
        apply_overrides_from(&mut config, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.upstream.url, "https://env.example/api");
        assert!(config.cookies.production);
        assert_eq!(config.cookies.domain.as_deref(), Some(".agora.example"));
    }

    #[test]
    fn test_unknown_environment_rejected() {
        let mut config = AgoraConfig::default();
        let err = apply_overrides_from(&mut config, |k| {
            (k == "AGORA_ENV").then(|| "staging-ish".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_merge_tables_replaces_scalars_and_recurses() {
        let mut base: toml::Table = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Table = toml::from_str("[a]\ny = 3\n[b]\nz = true\n").unwrap();
        merge_tables(&mut base, overlay);
        assert_eq!(base["a"]["x"].as_integer(), Some(1));
        assert_eq!(base["a"]["y"].as_integer(), Some(3));
        assert_eq!(base["b"]["z"].as_bool(), Some(true));
    }
}
