use serde::{Deserialize, Serialize};
use std::{
  env, fs,
  path::{Path, PathBuf},
};
use thiserror::Error;

use crate::types::{BracketOptions, SeedingStrategy};

pub const CONFIG_FILE_NAME: &str = "league-bracket.json";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:17880";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("read config {path}: {source}")]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error("parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    source: serde_json::Error,
  },

  #[error("unknown seeding strategy {0:?} (expected \"standard\" or \"sequential\")")]
  InvalidSeeding(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
  pub bind_addr: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
  /// Directory for the daily log file. Logs go to stderr when unset.
  pub dir: Option<PathBuf>,
  /// `EnvFilter` directives used when `RUST_LOG` is not set.
  pub filter: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
  pub server: ServerConfig,
  pub logging: LoggingConfig,
  pub bracket: BracketOptions,
}

impl AppConfig {
  pub fn log_warnings(&self) {
    let mut warnings = Vec::new();

    if !self.server.bind_addr.starts_with("127.0.0.1") && !self.server.bind_addr.starts_with("localhost") {
      warnings.push(format!(
        "server bound to {}; bracket endpoints have no authentication of their own",
        self.server.bind_addr
      ));
    }
    if self.bracket.seeding == SeedingStrategy::Sequential {
      warnings.push("sequential seeding clusters byes at the top of the draw".to_string());
    }
    if !self.bracket.grand_final_reset {
      warnings.push("grand final reset disabled; losers-bracket champion wins with one grand final".to_string());
    }

    for msg in warnings {
      tracing::warn!("{}", msg);
    }
  }
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

pub fn flag_true_default(value: Option<&str>, default: bool) -> bool {
  match value {
    Some(value) => {
      let value = value.trim().to_ascii_lowercase();
      matches!(value.as_str(), "1" | "true" | "yes" | "on")
    }
    None => default,
  }
}

pub fn config_path() -> PathBuf {
  env_default("BRACKET_CONFIG")
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Blank server and logging settings fall back to the environment, then to
/// built-in defaults. Bracket settings in the environment override the file.
pub fn apply_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig, ConfigError>
where
  F: Fn(&str) -> Option<String>,
{
  if config.server.bind_addr.trim().is_empty() {
    config.server.bind_addr = lookup("BRACKET_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
  }
  if config.logging.dir.is_none() {
    config.logging.dir = lookup("BRACKET_LOG_DIR").map(PathBuf::from);
  }
  if config.logging.filter.trim().is_empty() {
    config.logging.filter = lookup("BRACKET_LOG_FILTER").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
  }
  if let Some(raw) = lookup("BRACKET_SEEDING") {
    config.bracket.seeding = SeedingStrategy::parse(&raw).ok_or(ConfigError::InvalidSeeding(raw))?;
  }
  let reset = lookup("BRACKET_GRAND_FINAL_RESET");
  config.bracket.grand_final_reset = flag_true_default(reset.as_deref(), config.bracket.grand_final_reset);
  Ok(config)
}

pub fn apply_env_defaults(config: AppConfig) -> Result<AppConfig, ConfigError> {
  apply_overrides(config, env_default)
}

pub fn load_config() -> Result<AppConfig, ConfigError> {
  load_config_from(&config_path())
}

/// A missing file is not an error: the environment and defaults apply.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
  if !path.is_file() {
    return apply_env_defaults(AppConfig::default());
  }
  let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  let config = serde_json::from_str::<AppConfig>(&data).map_err(|source| ConfigError::Parse {
    path: path.to_path_buf(),
    source,
  })?;
  apply_env_defaults(config)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    move |key| map.get(key).cloned()
  }

  #[test]
  fn test_defaults_fill_blanks() {
    let config = apply_overrides(AppConfig::default(), lookup(&[])).unwrap();
    assert_eq!(config.server.bind_addr, DEFAULT_BIND_ADDR);
    assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
    assert_eq!(config.logging.dir, None);
    assert_eq!(config.bracket, BracketOptions::default());
  }

  #[test]
  fn test_env_fills_blank_server_settings_only() {
    let mut file = AppConfig::default();
    file.server.bind_addr = "0.0.0.0:9000".to_string();
    let config = apply_overrides(
      file,
      lookup(&[("BRACKET_BIND_ADDR", "127.0.0.1:1"), ("BRACKET_LOG_DIR", "/var/log/brackets")]),
    )
    .unwrap();
    assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
    assert_eq!(config.logging.dir, Some(PathBuf::from("/var/log/brackets")));
  }

  #[test]
  fn test_env_overrides_bracket_options() {
    let config = apply_overrides(
      AppConfig::default(),
      lookup(&[("BRACKET_SEEDING", "Sequential"), ("BRACKET_GRAND_FINAL_RESET", "off")]),
    )
    .unwrap();
    assert_eq!(config.bracket.seeding, SeedingStrategy::Sequential);
    assert!(!config.bracket.grand_final_reset);
  }

  #[test]
  fn test_rejects_unknown_seeding() {
    let result = apply_overrides(AppConfig::default(), lookup(&[("BRACKET_SEEDING", "random")]));
    assert!(matches!(result, Err(ConfigError::InvalidSeeding(raw)) if raw == "random"));
  }

  #[test]
  fn test_parses_partial_file() {
    let config: AppConfig =
      serde_json::from_str(r#"{"bracket":{"seeding":"sequential"},"logging":{"filter":"debug"}}"#).unwrap();
    assert_eq!(config.bracket.seeding, SeedingStrategy::Sequential);
    assert!(config.bracket.grand_final_reset);
    assert_eq!(config.logging.filter, "debug");
    assert_eq!(config.server.bind_addr, "");
  }

  #[test]
  fn test_missing_file_uses_defaults() {
    let config = load_config_from(Path::new("/nonexistent/league-bracket.json")).unwrap();
    assert!(!config.server.bind_addr.is_empty());
  }

  #[test]
  fn test_flag_parsing() {
    assert!(flag_true_default(Some(" YES "), false));
    assert!(!flag_true_default(Some("0"), true));
    assert!(flag_true_default(None, true));
  }
}
