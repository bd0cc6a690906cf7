use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::hub::HubConfig;
use crate::websockets::ConnectionConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

const DEFAULT_OUTBOUND_QUEUE: usize = 256;
const DEFAULT_MAX_MESSAGE_BYTES: usize = 512;
const DEFAULT_PONG_WAIT_SECS: u64 = 60;
const DEFAULT_WRITE_WAIT_SECS: u64 = 10;
const DEFAULT_START_DELAY_MS: u64 = 100;

/// Process settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    /// Messages buffered per connection before it counts as a slow consumer.
    pub outbound_queue: usize,
    pub max_message_bytes: usize,
    /// Read idle deadline; a client must send something (a pong will do)
    /// within this window.
    pub pong_wait: Duration,
    pub write_wait: Duration,
    /// Gap between `game_started` and the first personalized `game_state`.
    pub start_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            pong_wait: Duration::from_secs(DEFAULT_PONG_WAIT_SECS),
            write_wait: Duration::from_secs(DEFAULT_WRITE_WAIT_SECS),
            start_delay: Duration::from_millis(DEFAULT_START_DELAY_MS),
        }
    }
}

impl Settings {
    /// Load settings from `HONG3_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_or(
            &lookup,
            "HONG3_BIND_ADDR",
            "a socket address",
            Settings::default().bind_addr,
        )?;
        let outbound_queue = parse_or(
            &lookup,
            "HONG3_OUTBOUND_QUEUE",
            "a positive integer",
            DEFAULT_OUTBOUND_QUEUE,
        )?;
        let max_message_bytes = parse_or(
            &lookup,
            "HONG3_MAX_MESSAGE_BYTES",
            "a positive integer",
            DEFAULT_MAX_MESSAGE_BYTES,
        )?;
        let pong_wait_secs = parse_or(
            &lookup,
            "HONG3_PONG_WAIT_SECS",
            "a positive number of seconds",
            DEFAULT_PONG_WAIT_SECS,
        )?;
        let write_wait_secs = parse_or(
            &lookup,
            "HONG3_WRITE_WAIT_SECS",
            "a positive number of seconds",
            DEFAULT_WRITE_WAIT_SECS,
        )?;
        let start_delay_ms = parse_or(
            &lookup,
            "HONG3_START_DELAY_MS",
            "a number of milliseconds",
            DEFAULT_START_DELAY_MS,
        )?;

        require_positive("HONG3_OUTBOUND_QUEUE", outbound_queue as u64)?;
        require_positive("HONG3_MAX_MESSAGE_BYTES", max_message_bytes as u64)?;
        require_positive("HONG3_PONG_WAIT_SECS", pong_wait_secs)?;
        require_positive("HONG3_WRITE_WAIT_SECS", write_wait_secs)?;

        Ok(Self {
            bind_addr,
            outbound_queue,
            max_message_bytes,
            pong_wait: Duration::from_secs(pong_wait_secs),
            write_wait: Duration::from_secs(write_wait_secs),
            start_delay: Duration::from_millis(start_delay_ms),
        })
    }

    /// Keep-alive pings go out a little more often than the peer's read
    /// deadline so an idle but healthy client is never timed out.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait * 9 / 10
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            outbound_queue: self.outbound_queue,
            start_delay: self.start_delay,
        }
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            max_message_bytes: self.max_message_bytes,
            pong_wait: self.pong_wait,
            ping_period: self.ping_period(),
            write_wait: self.write_wait,
        }
    }
}

fn parse_or<F, T>(
    lookup: &F,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value: raw,
        }),
    }
}

fn require_positive(name: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            name,
            expected: "greater than zero",
            value: value.to_string(),
        });
    }
    Ok(())
}
