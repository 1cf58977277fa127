//! Server configuration loading.
//!
//! TOML is the sole config source; no environment variable overrides.
//! Default config path: `/etc/bboard/server.toml`.
//!
//! # Required fields
//! - `listen`
//! - `mode` (`sequential` | `read_your_writes` | `quorum`)
//! - `servers` (full cluster list, identical on every node, includes `listen`)
//! - `coordinator_addr` unless this node is the coordinator
//! - A `[quorum]` table when `mode = "quorum"`
//!
//! Quorum parameters must satisfy `NR + NW > N` and `NW > N/2`; a violation
//! is fatal at startup.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Config types (validated)
// ---------------------------------------------------------------------------

/// Which consistency regime this cluster runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyMode {
    Sequential,
    ReadYourWrites,
    Quorum,
}

/// Read/write quorum sizes over `n` replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuorumParams {
    pub n: usize,
    pub nr: usize,
    pub nw: usize,
}

/// Timer and timeout knobs. Defaults match production behavior; test
/// harnesses shorten the intervals and disable the latency jitter.
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Sleep a uniform `[0, 2)` s before dispatching each message.
    pub simulate_latency: bool,
    /// Seed for the per-server RNG (latency jitter and quorum selection).
    pub rng_seed: Option<u64>,
    pub propagate_interval: Duration,
    pub sync_interval: Duration,
    pub rpc_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            simulate_latency: true,
            rng_seed: None,
            propagate_interval: Duration::from_secs(5),
            sync_interval: Duration::from_secs(30),
            rpc_timeout: Duration::from_secs(10),
        }
    }
}

/// Top-level validated server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub mode: ConsistencyMode,
    pub coordinator: bool,
    pub coordinator_addr: SocketAddr,
    /// Full cluster list, this node included.
    pub servers: Vec<SocketAddr>,
    /// Present iff `mode` is `Quorum`.
    pub quorum: Option<QuorumParams>,
    pub timing: TimingConfig,
}

impl ServerConfig {
    /// Every cluster member except this node.
    pub fn peers(&self) -> Vec<SocketAddr> {
        self.servers
            .iter()
            .copied()
            .filter(|addr| *addr != self.listen)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Raw TOML deserialization types (with Option for optional fields)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawConfig {
    listen: Option<String>,
    mode: Option<ConsistencyMode>,
    coordinator: Option<bool>,
    coordinator_addr: Option<String>,
    servers: Option<Vec<String>>,
    quorum: Option<RawQuorum>,
    timing: Option<RawTiming>,
}

#[derive(Debug, Deserialize)]
struct RawQuorum {
    n: Option<usize>,
    nr: Option<usize>,
    nw: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawTiming {
    simulate_latency: Option<bool>,
    rng_seed: Option<u64>,
    propagate_interval_ms: Option<u64>,
    sync_interval_ms: Option<u64>,
    rpc_timeout_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load server config from a custom path.
pub fn load_config_from_path(path: &Path) -> Result<ServerConfig, ConfigError> {
    let toml_str = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("reading config file '{}': {}", path.display(), e)))?;
    load_config_from_str(&toml_str)
}

/// Load server config from the default path `/etc/bboard/server.toml`.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
    load_config_from_path(Path::new("/etc/bboard/server.toml"))
}

/// Load server config from a TOML string.
pub fn load_config_from_str(toml_str: &str) -> Result<ServerConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let listen = parse_addr(
        &raw.listen
            .ok_or_else(|| ConfigError::MissingField("listen".to_owned()))?,
        "listen",
    )?;
    let mode = raw
        .mode
        .ok_or_else(|| ConfigError::MissingField("mode".to_owned()))?;
    let coordinator = raw.coordinator.unwrap_or(false);

    let raw_servers = raw
        .servers
        .ok_or_else(|| ConfigError::MissingField("servers".to_owned()))?;
    if raw_servers.is_empty() {
        return Err(ConfigError::InvalidValue(
            "servers must name at least one cluster member".to_owned(),
        ));
    }
    let mut servers = Vec::with_capacity(raw_servers.len());
    for (i, s) in raw_servers.iter().enumerate() {
        servers.push(parse_addr(s, &format!("servers[{i}]"))?);
    }
    if !servers.contains(&listen) {
        return Err(ConfigError::InvalidValue(format!(
            "servers must include the listen address {listen}"
        )));
    }

    // The coordinator is its own coordinator; everyone else must name it.
    let coordinator_addr = match raw.coordinator_addr {
        Some(s) => parse_addr(&s, "coordinator_addr")?,
        None if coordinator => listen,
        None => return Err(ConfigError::MissingField("coordinator_addr".to_owned())),
    };

    let quorum = match (mode, raw.quorum) {
        (ConsistencyMode::Quorum, Some(q)) => {
            let n = q.n.ok_or_else(|| ConfigError::MissingField("quorum.n".to_owned()))?;
            let nr = q
                .nr
                .ok_or_else(|| ConfigError::MissingField("quorum.nr".to_owned()))?;
            let nw = q
                .nw
                .ok_or_else(|| ConfigError::MissingField("quorum.nw".to_owned()))?;
            validate_quorum(n, nr, nw)?;
            if n != servers.len() {
                tracing::warn!(n, servers = servers.len(), "quorum.n disagrees with server list length");
            }
            Some(QuorumParams { n, nr, nw })
        }
        (ConsistencyMode::Quorum, None) => {
            return Err(ConfigError::MissingField("quorum".to_owned()));
        }
        // A [quorum] table in another mode is inert.
        (_, _) => None,
    };

    let timing = match raw.timing {
        Some(t) => TimingConfig {
            simulate_latency: t.simulate_latency.unwrap_or(true),
            rng_seed: t.rng_seed,
            propagate_interval: Duration::from_millis(t.propagate_interval_ms.unwrap_or(5_000)),
            sync_interval: Duration::from_millis(t.sync_interval_ms.unwrap_or(30_000)),
            rpc_timeout: Duration::from_millis(t.rpc_timeout_ms.unwrap_or(10_000)),
        },
        None => TimingConfig::default(),
    };

    Ok(ServerConfig {
        listen,
        mode,
        coordinator,
        coordinator_addr,
        servers,
        quorum,
        timing,
    })
}

fn parse_addr(value: &str, field: &str) -> Result<SocketAddr, ConfigError> {
    value
        .parse()
        .map_err(|e| ConfigError::InvalidValue(format!("{field} '{value}': {e}")))
}

/// `NR + NW > N` guarantees read/write intersection; `NW > N/2` prevents
/// two disjoint write quorums.
fn validate_quorum(n: usize, nr: usize, nw: usize) -> Result<(), ConfigError> {
    if nr + nw <= n || nw * 2 <= n {
        return Err(ConfigError::InvalidValue(format!(
            "quorum sizes must satisfy NR + NW > N and NW > N/2 (got N={n}, NR={nr}, NW={nw})"
        )));
    }
    Ok(())
}
