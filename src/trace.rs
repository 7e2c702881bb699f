use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Overrides `--log-level` when set, accepts full filter directives.
pub const LOG_ENV: &str = "SWARM_DISCOVERY_LOG";

/// Turn a log level into filter directives for the crates of this project.
pub fn directives(level: &str) -> Result<String, String> {
    if level == "off" {
        return Ok("off".to_string());
    }

    let level = Level::from_str(level).map_err(|_| format!("invalid log level {level:?}"))?;
    let level = level.as_str().to_lowercase();

    Ok(["swarm_discovery", "docker"]
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(","))
}

/// Install the global subscriber. `levels` are filter directives.
pub fn init(color: bool, levels: &str) -> Result<(), String> {
    let filter = EnvFilter::try_new(levels).map_err(|err| err.to_string())?;

    tracing_subscriber::fmt()
        .with_ansi(color)
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| err.to_string())
}
