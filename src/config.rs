use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{anyhow, Context, Result};
use log::{info, warn};

/// Operational timings. Defaults are the values the event ran with.
#[derive(Debug, Clone, PartialEq)]
pub struct Timing {
    pub session_poll: Duration,
    pub phase_poll: Duration,
    pub tick: Duration,
    pub vote_window: Duration,
    pub request_timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            session_poll: Duration::from_millis(5000),
            phase_poll: Duration::from_millis(3000),
            tick: Duration::from_millis(1000),
            vote_window: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub remote_url: String,
    pub remote_key: String,
    pub store_path: PathBuf,
    pub timing: Timing,
}

impl Config {
    pub fn load() -> Result<Self> {
        let remote_url = var("VOTE_REMOTE_URL")
            .ok_or_else(|| anyhow!("VOTE_REMOTE_URL must be set"))?
            .trim_end_matches('/')
            .to_owned();

        Ok(Self {
            remote_url,
            remote_key: load_key()?,
            store_path: PathBuf::from(try_load::<String>("VOTE_STORE_PATH", "vote-terminal.json")?),
            timing: Timing {
                session_poll: Duration::from_millis(try_load("VOTE_SESSION_POLL_MS", "5000")?),
                phase_poll: Duration::from_millis(try_load("VOTE_PHASE_POLL_MS", "3000")?),
                tick: Duration::from_millis(try_load("VOTE_TICK_MS", "1000")?),
                vote_window: Duration::from_secs(try_load("VOTE_WINDOW_SECS", "30")?),
                request_timeout: Duration::from_secs(try_load("VOTE_REQUEST_TIMEOUT_SECS", "10")?),
            },
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    parse_value(key, &raw)
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: Display,
{
    raw.trim().parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow!("Invalid {key} value {raw:?}: {e}")
    })
}

/// The key comes from the environment or from a secret file.
fn load_key() -> Result<String> {
    if let Some(key) = var("VOTE_REMOTE_KEY") {
        return Ok(key);
    }
    let path = var("VOTE_REMOTE_KEY_FILE")
        .ok_or_else(|| anyhow!("Either VOTE_REMOTE_KEY or VOTE_REMOTE_KEY_FILE must be set"))?;
    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .with_context(|| format!("Failed to read remote key from {path}"))
}
