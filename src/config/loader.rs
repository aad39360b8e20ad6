// src/config/loader.rs
//! Layered TOML configuration loader

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{constants::paths, HdemgConfig};
use crate::error::{EmgError, EmgErrorBuilder, EmgResult};
use crate::grid::Derivation;
use crate::utils::validation::validate_enum;

/// Environment variables with this prefix override file values
const ENV_PREFIX: &str = "HDEMG_";
/// Separator between table levels in override variable names
const ENV_PATH_SEPARATOR: &str = "__";

/// Loads defaults, then every existing file in order (later files win)
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    current_config: HdemgConfig,
}

impl ConfigLoader {
    /// Loader over the standard search locations
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    /// Loader over an explicit list of files
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            current_config: HdemgConfig::default(),
        }
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Merge all layers, validate and keep the result as current
    pub fn load(&mut self) -> EmgResult<HdemgConfig> {
        let config = self.load_and_merge_configs(std::env::vars())?;
        self.current_config = config.clone();
        info!(files = self.config_paths.len(), "configuration loaded");
        Ok(config)
    }

    pub fn current_config(&self) -> &HdemgConfig {
        &self.current_config
    }

    /// Parse and validate a single file without touching the current config
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> EmgResult<()> {
        let value = self.load_config_file(path)?;
        let config = Self::deserialize(value)?;
        config.validate()?;
        Ok(())
    }

    /// Write the current configuration as TOML
    pub fn export_config<P: AsRef<Path>>(&self, path: P) -> EmgResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(&self.current_config)
            .map_err(|e| EmgError::Parse { reason: e.to_string() })?;
        std::fs::write(path, content).map_err(|e| io_error(path, e))?;
        Ok(())
    }

    fn load_and_merge_configs(
        &self,
        vars: impl Iterator<Item = (String, String)>,
    ) -> EmgResult<HdemgConfig> {
        let mut merged = toml::Value::try_from(HdemgConfig::default())
            .map_err(|e| EmgError::Parse { reason: e.to_string() })?;

        for config_path in &self.config_paths {
            if !config_path.exists() {
                continue;
            }
            let file_config = self.load_config_file(config_path)?;
            debug!(path = %config_path.display(), "merging configuration file");
            merge_toml_values(&mut merged, file_config);
        }

        apply_environment_overrides(&mut merged, vars);

        let config = Self::deserialize(merged)?;
        config.validate()?;
        Ok(config)
    }

    fn load_config_file<P: AsRef<Path>>(&self, path: P) -> EmgResult<toml::Value> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        toml::from_str(&content).map_err(|e| EmgError::Parse {
            reason: format!("{}: {}", path.display(), e),
        })
    }

    fn deserialize(value: toml::Value) -> EmgResult<HdemgConfig> {
        check_derivation(&value)?;
        value.try_into().map_err(|e: toml::de::Error| EmgError::Parse {
            reason: format!("Failed to deserialize config: {}", e),
        })
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut found = Vec::new();

        if let Some(dir) = std::env::var_os(paths::CONFIG_DIR_ENV) {
            found.push(PathBuf::from(dir).join(paths::DEFAULT_CONFIG_FILE));
        }

        // Local configurations (in order of precedence)
        found.push(PathBuf::from(paths::DEFAULT_CONFIG_FILE));
        found.push(PathBuf::from(paths::LOCAL_CONFIG_FILE));

        found
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// An unknown derivation is a configuration error, not a parse error
fn check_derivation(value: &toml::Value) -> EmgResult<()> {
    match value.get("tracking").and_then(|tracking| tracking.get("derivation")) {
        Some(toml::Value::String(name)) => {
            validate_enum(name, &Derivation::NAMES, "tracking.derivation")?;
            Ok(())
        }
        Some(other) => Err(EmgErrorBuilder::new("config", "deserialize").configuration(
            "tracking.derivation",
            other,
            "derivation must be a string",
        )),
        None => Ok(()),
    }
}

fn io_error(path: &Path, err: std::io::Error) -> EmgError {
    EmgError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml_values(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

/// `HDEMG_TRACKING__THRESHOLD=0.9` sets `tracking.threshold`
fn apply_environment_overrides(
    config: &mut toml::Value,
    vars: impl Iterator<Item = (String, String)>,
) {
    for (key, value) in vars {
        let Some(stripped) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        if !stripped.contains(ENV_PATH_SEPARATOR) {
            continue;
        }
        let path: Vec<String> = stripped
            .split(ENV_PATH_SEPARATOR)
            .map(str::to_lowercase)
            .collect();
        debug!(variable = %key, "applying environment override");
        set_nested_value(config, &path, parse_env_value(&value));
    }
}

fn parse_env_value(value: &str) -> toml::Value {
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}

fn set_nested_value(config: &mut toml::Value, path: &[String], value: toml::Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = config;
    for part in parents {
        let toml::Value::Table(table) = current else {
            return;
        };
        current = table
            .entry(part.clone())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
    }
    if let toml::Value::Table(table) = current {
        table.insert(last.clone(), value);
    }
}
