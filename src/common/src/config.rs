use std::path::Path;
use std::str::FromStr;

use bytesize::ByteSize;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use crate::error::CommonError;
use crate::error::Result;
use crate::logging::LogLevel;

pub const DEFAULT_BATCH_SIZE: usize = 4096;
pub const DEFAULT_MAX_WARNINGS: usize = 20;
pub const ENV_PREFIX: &str = "COMPUTE";

#[derive(Deserialize, Copy, Debug, Clone, Default, PartialEq, Eq)]
pub enum WarningsMode {
    #[default]
    #[serde(rename = "collect")]
    Collect,
    #[serde(rename = "ignore")]
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compute {
    /// Upper bound for bytes reserved by blocks and builders of one driver.
    /// `None` means unbounded.
    pub memory_limit: Option<usize>,
    pub warnings_mode: WarningsMode,
    pub max_warnings: usize,
    pub batch_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub level: LevelFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub compute: Compute,
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            compute: Compute::default(),
            log: Log {
                level: LevelFilter::INFO,
            },
        }
    }
}

impl Default for Compute {
    fn default() -> Self {
        Compute {
            memory_limit: None,
            warnings_mode: WarningsMode::Collect,
            max_warnings: DEFAULT_MAX_WARNINGS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Loads a config file and applies `COMPUTE__SECTION__KEY` environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let raw: file::Config = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        raw.try_into()
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let raw: file::Config = ::config::Config::builder()
            .add_source(::config::File::from_str(s, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        raw.try_into()
    }
}

/// Raw, human-editable form of [Config].
pub mod file {
    use serde::Deserialize;

    use super::WarningsMode;
    use crate::logging::LogLevel;

    #[derive(Debug, Deserialize, PartialEq, Eq, Default)]
    pub struct Compute {
        pub memory_limit: Option<String>,
        pub warnings_mode: Option<WarningsMode>,
        pub max_warnings: Option<usize>,
        pub batch_size: Option<usize>,
    }

    #[derive(Debug, Deserialize, PartialEq, Eq)]
    pub struct Log {
        pub level: LogLevel,
    }

    #[derive(Debug, Deserialize, PartialEq, Eq)]
    pub struct Config {
        #[serde(default)]
        pub compute: Compute,
        pub log: Option<Log>,
    }
}

fn parse_bytes(s: &str) -> Result<usize> {
    let size = ByteSize::from_str(s)
        .map_err(|err| CommonError::InvalidConfig(format!("memory_limit {s:?}: {err}")))?;
    usize::try_from(size.as_u64())
        .map_err(|_| CommonError::InvalidConfig(format!("memory_limit {s:?} is too large")))
}

impl TryInto<Config> for file::Config {
    type Error = CommonError;

    fn try_into(self) -> std::result::Result<Config, Self::Error> {
        let memory_limit = match self.compute.memory_limit {
            None => None,
            Some(v) => Some(parse_bytes(v.as_str())?),
        };
        let batch_size = self.compute.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(CommonError::InvalidConfig(
                "batch_size must be positive".to_string(),
            ));
        }

        Ok(Config {
            compute: Compute {
                memory_limit,
                warnings_mode: self.compute.warnings_mode.unwrap_or_default(),
                max_warnings: self.compute.max_warnings.unwrap_or(DEFAULT_MAX_WARNINGS),
                batch_size,
            },
            log: Log {
                level: self.log.map(|l| l.level).unwrap_or(LogLevel::Info).into(),
            },
        })
    }
}
