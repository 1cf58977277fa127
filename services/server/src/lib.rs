pub mod allocator;
pub mod config;
pub mod dispatch;
pub mod modes;
pub mod peer;
pub mod replication;
pub mod rng;
pub mod server;
pub mod sessions;
pub mod store;

pub use config::{ConsistencyMode, QuorumParams, ServerConfig, TimingConfig, load_config,
    load_config_from_path, load_config_from_str};
pub use server::{Server, ServerHandle, ServerState};
