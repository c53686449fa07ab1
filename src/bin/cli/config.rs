use super::{OutputFormat, ThemeArg};
use clap::ValueEnum;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use triq::batch::ChannelSize;

/// Defaults for `triq run`, resolved from the `[run]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunDefaults {
    pub channel_size: Option<usize>,
    pub format: Option<OutputFormat>,
    pub theme: Option<ThemeArg>,
    pub log_level: Option<String>,
}

#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    run: RunDefaults,
}

impl CliConfig {
    /// Loads `explicit` (which must exist) or the default location (which
    /// may be absent).
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let data = match explicit.as_ref() {
            Some(path) if !path.exists() => {
                return Err(ConfigError::Missing { path: path.clone() })
            }
            Some(path) => read_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => read_file(&path)?,
                _ => RawConfig::default(),
            },
        };
        let path = explicit.or_else(default_config_path);
        let run = convert_run(&data.run)?;
        Ok(Self { path, run })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn run(&self) -> &RunDefaults {
        &self.run
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn convert_run(raw: &RawRun) -> Result<RunDefaults, ConfigError> {
    let format = match raw.format.as_deref() {
        Some(value) => Some(OutputFormat::from_str(value, true).map_err(|_| {
            ConfigError::InvalidValue {
                key: "run.format",
                value: value.to_string(),
            }
        })?),
        None => None,
    };
    let theme = match raw.theme.as_deref() {
        Some(value) => Some(ThemeArg::from_str(value, true).map_err(|_| {
            ConfigError::InvalidValue {
                key: "run.theme",
                value: value.to_string(),
            }
        })?),
        None => None,
    };
    let channel_size = match raw.channel_size {
        Some(value) => Some(
            usize::try_from(value)
                .ok()
                .filter(|size| *size <= ChannelSize::MAX_CAPACITY)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "run.channel_size",
                    value: value.to_string(),
                })?,
        ),
        None => None,
    };
    Ok(RunDefaults {
        channel_size,
        format,
        theme,
        log_level: raw.log_level.clone(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    run: RawRun,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRun {
    channel_size: Option<i64>,
    format: Option<String>,
    theme: Option<String>,
    log_level: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CLI config {path} does not exist")]
    Missing { path: PathBuf },
    #[error("failed to read CLI config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse CLI config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config value {key} = '{value}' is invalid")]
    InvalidValue { key: &'static str, value: String },
}

impl ConfigError {
    /// Bad values are usage mistakes; everything else is an environment
    /// failure.
    pub fn is_usage(&self) -> bool {
        matches!(self, ConfigError::InvalidValue { .. })
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("triq").join("cli.toml"))
}
