use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use toml::{Table, Value};

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "filesystem error: {}", err),
            ConfigError::Parse(err) => write!(f, "invalid config file: {}", err),
            ConfigError::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(value: io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Parse(value)
    }
}

/// Values from the `[defaults]` table; CLI flags take precedence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defaults {
    pub timeout: Option<f64>,
    pub delay: Option<f64>,
    pub format: Option<String>,
    pub ipv6_only: Option<bool>,
}

pub struct ConfigStore {
    path: PathBuf,
    defaults: Defaults,
}

impl ConfigStore {
    /// Read the store; a missing file yields empty defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(default_path())
    }

    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self {
                path,
                defaults: Defaults::default(),
            });
        }
        let content = fs::read_to_string(&path)?;
        let defaults = parse_defaults(&content)?;
        Ok(Self { path, defaults })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }
}

pub fn default_path() -> PathBuf {
    resolve_config_dir().join("config.toml")
}

fn parse_defaults(content: &str) -> Result<Defaults, ConfigError> {
    let root: Table = content.parse::<Table>()?;
    let mut defaults = Defaults::default();
    let Some(table) = root.get("defaults") else {
        return Ok(defaults);
    };
    let table = table
        .as_table()
        .ok_or_else(|| ConfigError::Invalid("[defaults] must be a table".into()))?;

    defaults.timeout = seconds(table.get("timeout"), "timeout")?;
    defaults.delay = seconds(table.get("delay"), "delay")?;
    if let Some(format) = table.get("format").and_then(Value::as_str) {
        defaults.format = Some(format.to_string());
    }
    if let Some(ipv6) = table.get("ipv6_only").and_then(Value::as_bool) {
        defaults.ipv6_only = Some(ipv6);
    }
    Ok(defaults)
}

fn seconds(value: Option<&Value>, key: &str) -> Result<Option<f64>, ConfigError> {
    match value {
        None => Ok(None),
        Some(v) => v
            .as_float()
            .or_else(|| v.as_integer().map(|i| i as f64))
            .map(Some)
            .ok_or_else(|| ConfigError::Invalid(format!("{key} must be a number of seconds"))),
    }
}

fn resolve_config_dir() -> PathBuf {
    if let Some(val) = env::var_os("NTPMAN_CONFIG_DIR") {
        let path = PathBuf::from(val);
        if path.is_absolute() {
            return path;
        }
        return env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| PathBuf::from("."));
    }
    if let Some(base) = dirs::config_dir() {
        return base.join("ntpman");
    }
    PathBuf::from(".ntpman")
}
