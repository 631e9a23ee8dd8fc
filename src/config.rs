use std::time::Duration;

use clap::Parser;
use tracing::Level;

use crate::signaling::DEFAULT_SIGNALING_PORT;

/// Signaling relay for peer-to-peer audio/video rooms.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Config {
    /// Address the WebSocket listener binds to
    #[arg(long, env = "PARLEY_BIND", default_value_t = default_bind())]
    pub bind: String,

    /// Seconds between keep-alive pings
    #[arg(long, env = "PARLEY_PING_INTERVAL", default_value_t = 30)]
    pub ping_interval: u64,

    /// Seconds a connection may take to answer a ping; capped below the
    /// ping interval
    #[arg(long, env = "PARLEY_PONG_TIMEOUT", default_value_t = 10)]
    pub pong_timeout: u64,

    /// Capacity of the room manager command queue
    #[arg(long, env = "PARLEY_QUEUE_SIZE", default_value_t = 1024)]
    pub queue_size: usize,

    #[arg(long, env = "PARLEY_LOG_LEVEL", default_value_t = Level::INFO)]
    pub log_level: Level,
}

const PONG_MARGIN: Duration = Duration::from_millis(500);

fn default_bind() -> String {
    format!("0.0.0.0:{}", DEFAULT_SIGNALING_PORT)
}

impl Config {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval.max(1))
    }

    /// Pong deadline, always shorter than the ping interval so the next
    /// tick never fires while a pong is still allowed to arrive
    pub fn pong_timeout(&self) -> Duration {
        let cap = self
            .ping_interval()
            .saturating_sub(PONG_MARGIN)
            .max(PONG_MARGIN);
        Duration::from_secs(self.pong_timeout.max(1)).min(cap)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            ping_interval: 30,
            pong_timeout: 10,
            queue_size: 1024,
            log_level: Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let parsed = Config::parse_from(["parley"]);
        let default = Config::default();
        assert_eq!(parsed.bind, default.bind);
        assert_eq!(parsed.ping_interval, default.ping_interval);
        assert_eq!(parsed.pong_timeout, default.pong_timeout);
        assert_eq!(parsed.queue_size, default.queue_size);
        assert_eq!(parsed.log_level, default.log_level);
    }

    #[test]
    fn flags_override_defaults() {
        let parsed = Config::parse_from([
            "parley",
            "--bind",
            "127.0.0.1:9000",
            "--ping-interval",
            "5",
            "--log-level",
            "debug",
        ]);
        assert_eq!(parsed.bind, "127.0.0.1:9000");
        assert_eq!(parsed.ping_interval(), Duration::from_secs(5));
        assert_eq!(parsed.log_level, Level::DEBUG);
    }

    #[test]
    fn zero_intervals_are_clamped() {
        let config = Config {
            ping_interval: 0,
            pong_timeout: 0,
            ..Config::default()
        };
        assert_eq!(config.ping_interval(), Duration::from_secs(1));
        assert_eq!(config.pong_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn pong_timeout_stays_below_ping_interval() {
        let config = Config {
            ping_interval: 5,
            pong_timeout: 10,
            ..Config::default()
        };
        assert!(config.pong_timeout() < config.ping_interval());
        assert_eq!(config.pong_timeout(), Duration::from_millis(4500));

        let config = Config {
            ping_interval: 5,
            pong_timeout: 5,
            ..Config::default()
        };
        assert!(config.pong_timeout() < config.ping_interval());

        let default = Config::default();
        assert_eq!(default.pong_timeout(), Duration::from_secs(10));
    }
}
