//! Hub configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Every key has a fixed default matching
//! the reference deployment, so the hub runs with no configuration at all.

use std::net::SocketAddr;
use std::time::Duration;

/// Top-level hub configuration.
///
/// Loaded once at startup via [`HubConfig::from_env`].
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Socket address to bind the WebSocket listener to.
    pub listen_addr: SocketAddr,

    /// Socket address to bind the UDP datagram socket to.
    pub udp_addr: SocketAddr,

    /// Seconds between liveness sweeps over WebSocket connections.
    pub sweep_interval_secs: u64,

    /// Seconds to wait for a pong before a probed connection is evicted.
    pub probe_timeout_secs: u64,

    /// Seconds between sweeps of the UDP peer table.
    pub udp_sweep_interval_secs: u64,

    /// Seconds of datagram silence after which a UDP peer is evicted.
    pub udp_peer_timeout_secs: u64,

    /// Seconds to wait before restarting a crashed listener.
    pub restart_backoff_secs: u64,

    /// Whether to greet every tracked UDP peer after each handled datagram.
    /// Off by default: the behavior floods peers and exists only for
    /// debugging device discovery.
    pub udp_greet_on_activity: bool,
}

impl HubConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to fixed defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` or `UDP_LISTEN_ADDR` is set but
    /// cannot be parsed as a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:12345".to_string())
            .parse()?;

        let udp_addr: SocketAddr = std::env::var("UDP_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:12345".to_string())
            .parse()?;

        let sweep_interval_secs = parse_env("HEARTBEAT_SWEEP_SECS", 10);
        let probe_timeout_secs = parse_env("HEARTBEAT_PROBE_TIMEOUT_SECS", 5);
        let udp_sweep_interval_secs = parse_env("UDP_SWEEP_SECS", 15);
        let udp_peer_timeout_secs = parse_env("UDP_PEER_TIMEOUT_SECS", 15);
        let restart_backoff_secs = parse_env("RESTART_BACKOFF_SECS", 5);
        let udp_greet_on_activity = parse_env_bool("UDP_GREET_ON_ACTIVITY", false);

        Ok(Self {
            listen_addr,
            udp_addr,
            sweep_interval_secs,
            probe_timeout_secs,
            udp_sweep_interval_secs,
            udp_peer_timeout_secs,
            restart_backoff_secs,
            udp_greet_on_activity,
        })
    }

    /// Interval between liveness sweeps as a [`Duration`].
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Pong probe timeout as a [`Duration`].
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Interval between UDP peer sweeps as a [`Duration`].
    #[must_use]
    pub const fn udp_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.udp_sweep_interval_secs)
    }

    /// UDP peer silence timeout as a [`Duration`].
    #[must_use]
    pub const fn udp_peer_timeout(&self) -> Duration {
        Duration::from_secs(self.udp_peer_timeout_secs)
    }

    /// Listener restart backoff as a [`Duration`].
    #[must_use]
    pub const fn restart_backoff(&self) -> Duration {
        Duration::from_secs(self.restart_backoff_secs)
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("TRUE") | Some("1") => true,
        Some("false") | Some("FALSE") | Some("0") => false,
        _ => default,
    }
}
