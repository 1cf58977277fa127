//! Shared cluster scaffolding for the integration suites.
//!
//! Binds every listener on port 0 first so the cluster list can name real
//! ports, then assembles one server per listener. Server 0 is always the
//! coordinator. Latency simulation is off and the replication intervals
//! are shortened so eventual-consistency assertions settle quickly.

use server::{ConsistencyMode, QuorumParams, Server, ServerConfig, ServerHandle, TimingConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

pub async fn spawn_cluster(
    mode: ConsistencyMode,
    n: usize,
    quorum: Option<(usize, usize, usize)>,
) -> Vec<ServerHandle> {
    let mut listeners = Vec::with_capacity(n);
    for _ in 0..n {
        listeners.push(TcpListener::bind("127.0.0.1:0").await.unwrap());
    }
    let addrs: Vec<SocketAddr> = listeners
        .iter()
        .map(|l| l.local_addr().unwrap())
        .collect();

    let mut handles = Vec::with_capacity(n);
    for (i, listener) in listeners.into_iter().enumerate() {
        let config = ServerConfig {
            listen: addrs[i],
            mode,
            coordinator: i == 0,
            coordinator_addr: addrs[0],
            servers: addrs.clone(),
            quorum: quorum.map(|(n, nr, nw)| QuorumParams { n, nr, nw }),
            timing: TimingConfig {
                simulate_latency: false,
                rng_seed: Some(1_000 + i as u64),
                propagate_interval: Duration::from_millis(150),
                sync_interval: Duration::from_millis(300),
                rpc_timeout: Duration::from_secs(2),
            },
        };
        handles.push(Server::with_listener(listener, config).spawn());
    }
    handles
}

pub fn shutdown_all(handles: &[ServerHandle]) {
    for handle in handles {
        handle.shutdown();
    }
}
