/// Configuration system for the dashboard.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::DashboardConfig::default()`]
/// 2. **User global config**: `~/.execdash/config.toml`
/// 3. **Project local config**: `.execdash.toml` in the current working directory
/// 4. **Environment variables**: `EXECDASH_*` overrides (highest precedence)
///
/// The result is resolved once at startup and handed to every component by
/// shared reference. Nothing mutates it afterwards.
///
/// # Usage
///
/// ```rust,ignore
/// use execdash::config;
///
/// let cfg = config::load();
/// if cfg.features.auto_refresh {
///     // ...
/// }
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::DashboardConfig;

/// Directory holding the global config, event log and persisted storage.
pub const STATE_DIR: &str = ".execdash";

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved dashboard configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars.
pub fn load() -> DashboardConfig {
    let mut config = DashboardConfig::default();

    if let Some(global) = load_toml_file(global_config_path()) {
        merge_config(&mut config, &global);
    }

    if let Some(project) = load_toml_file(project_config_path()) {
        merge_config(&mut config, &project);
    }

    apply_env_overrides(&mut config);

    config
}

/// Load a config from an explicit file, then apply env overrides.
pub fn load_from(path: &Path) -> Result<DashboardConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let mut config: DashboardConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Load a TOML config file from the given path (if it exists).
///
/// Malformed files are logged and skipped so a typo never stops the
/// dashboard from starting.
fn load_toml_file(path: Option<PathBuf>) -> Option<DashboardConfig> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file");
            None
        }
    }
}

/// Merge a loaded config layer into the base config.
///
/// Each file is deserialized with `serde(default)`, so keys it does not set
/// already hold the built-in defaults. The overlay therefore replaces the
/// base wholesale.
fn merge_config(base: &mut DashboardConfig, overlay: &DashboardConfig) {
    *base = overlay.clone();
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// `~/.execdash`, if a home directory is known.
pub fn state_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(STATE_DIR))
}

fn global_config_path() -> Option<PathBuf> {
    state_dir().map(|dir| dir.join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".execdash.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `EXECDASH_API_URL`: backend base URL
/// - `EXECDASH_REFRESH_MS`: periodic refresh interval
/// - `EXECDASH_AUTO_REFRESH`: periodic refresh on/off (`1`/`true`/`yes`/`on`)
/// - `EXECDASH_AI_ASSISTANT`: assistant on/off
/// - `EXECDASH_LOG_LEVEL`: default tracing filter
fn apply_env_overrides(config: &mut DashboardConfig) {
    if let Ok(val) = std::env::var("EXECDASH_API_URL")
        && !val.is_empty()
    {
        config.api.base_url = val;
    }
    if let Ok(val) = std::env::var("EXECDASH_REFRESH_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.api.refresh_interval_ms = ms;
    }
    if let Ok(val) = std::env::var("EXECDASH_AUTO_REFRESH") {
        config.features.auto_refresh = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("EXECDASH_AI_ASSISTANT") {
        config.features.ai_assistant = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("EXECDASH_LOG_LEVEL")
        && !val.is_empty()
    {
        config.logging.level = val;
    }
}

/// Check if a string value represents a truthy boolean.
pub fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.execdash/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    write_default_config(&path, force)?;
    Ok(path)
}

fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }

    fs::write(path, DashboardConfig::default_toml()).context("failed to write config file")
}

/// Set a single config key to a value in the global config file.
///
/// Supports dotted keys like `features.auto_refresh` or
/// `metrics.orders.base_values.day`.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;
    set_config_value_at(&path, key, value)
}

fn set_config_value_at(path: &Path, key: &str, value: &str) -> Result<()> {
    let content = if path.exists() {
        fs::read_to_string(path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&DashboardConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    // Reject edits that would no longer deserialize.
    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    toml::from_str::<DashboardConfig>(&output)
        .with_context(|| format!("value '{value}' is not valid for '{key}'"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };
    if leaf.is_empty() {
        anyhow::bail!("empty config key");
    }

    let mut current = root;
    for &part in sections {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let new_value = match table.get(*leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(toml::Value::Table(_)) => {
            anyhow::bail!("'{key}' is a section, not a value")
        }
        _ => toml::Value::String(raw_value.to_string()),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("yes"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy("off"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn set_toml_value_updates_string() {
        let toml_str = r#"
[api]
base_url = "http://localhost:8000"
"#;
        let mut root: toml::Value = toml::from_str(toml_str).unwrap();
        set_toml_value(&mut root, "api.base_url", "http://10.0.0.5:8000").unwrap();
        assert_eq!(root["api"]["base_url"].as_str(), Some("http://10.0.0.5:8000"));
    }

    #[test]
    fn set_toml_value_updates_bool() {
        let toml_str = r#"
[features]
auto_refresh = true
"#;
        let mut root: toml::Value = toml::from_str(toml_str).unwrap();
        set_toml_value(&mut root, "features.auto_refresh", "off").unwrap();
        assert_eq!(root["features"]["auto_refresh"].as_bool(), Some(false));
    }

    #[test]
    fn set_toml_value_updates_integer() {
        let toml_str = r#"
[limits]
top_territories = 5
"#;
        let mut root: toml::Value = toml::from_str(toml_str).unwrap();
        set_toml_value(&mut root, "limits.top_territories", "3").unwrap();
        assert_eq!(root["limits"]["top_territories"].as_integer(), Some(3));
    }

    #[test]
    fn set_toml_value_rejects_bad_integer() {
        let toml_str = r#"
[limits]
top_territories = 5
"#;
        let mut root: toml::Value = toml::from_str(toml_str).unwrap();
        assert!(set_toml_value(&mut root, "limits.top_territories", "five").is_err());
    }

    #[test]
    fn set_toml_value_rejects_invalid_key() {
        let toml_str = r#"
[api]
base_url = "x"
"#;
        let mut root: toml::Value = toml::from_str(toml_str).unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "value").is_err());
        assert!(set_toml_value(&mut root, "api", "value").is_err());
    }

    #[test]
    fn set_value_creates_file_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        set_config_value_at(&path, "notes.max_notes", "20").unwrap();

        let config = load_from(&path).unwrap();
        assert_eq!(config.notes.max_notes, 20);
        assert_eq!(config.notes.display_notes, 3);
    }

    #[test]
    fn set_value_rejects_type_breaking_edit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(set_config_value_at(&path, "metrics.orders.format", "furlongs").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn write_default_config_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        write_default_config(&path, false).unwrap();
        assert!(write_default_config(&path, false).is_err());
        write_default_config(&path, true).unwrap();
        assert!(load_from(&path).is_ok());
    }

    #[test]
    fn show_effective_config_returns_toml() {
        let toml_str = show_effective_config().unwrap();
        let _: DashboardConfig = toml::from_str(&toml_str).unwrap();
    }
}
