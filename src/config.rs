use std::path::{Path, PathBuf};
use std::time::Duration;

use docker::Endpoint;
use serde::{Deserialize, Serialize};

use crate::resolve::TaskPolicy;
use crate::{Error, Result};

const fn default_timeout() -> u64 {
    10
}

/// Optional configuration file, flags on the command line take precedence.
///
/// ```yaml
/// docker_host: unix:///var/run/docker.sock
/// tasks: running
/// timeout: 10
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The Docker Engine API address, `DOCKER_HOST` is used if not set
    #[serde(default)]
    pub docker_host: Option<String>,

    /// Which tasks are scrape candidates
    #[serde(default)]
    pub tasks: TaskPolicy,

    /// Upper bound of one resolution, in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            docker_host: None,
            tasks: TaskPolicy::default(),
            timeout: default_timeout(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| Error::io(err, format!("read config {}", path.display())))?;

        Self::parse(&content).map_err(|err| Error::Config {
            path: path.to_path_buf(),
            err,
        })
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        let config = serde_yaml::from_str::<Config>(content).map_err(|err| err.to_string())?;
        if config.timeout == 0 {
            return Err("timeout must be greater than 0".to_string());
        }

        Ok(config)
    }

    /// Load `path` if there is one.
    pub fn load_optional(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// The flag wins over the file, the file wins over `DOCKER_HOST`.
    pub fn endpoint(&self, flag: Option<&str>) -> std::result::Result<Endpoint, String> {
        match flag.or(self.docker_host.as_deref()) {
            Some(host) => Endpoint::parse(host),
            None => Endpoint::from_env(),
        }
    }
}
