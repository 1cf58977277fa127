//! Config parsing and validation.

use server::{ConsistencyMode, load_config_from_path, load_config_from_str};
use std::io::Write;
use std::time::Duration;

const MINIMAL: &str = r#"
listen = "127.0.0.1:7101"
mode = "sequential"
coordinator = true
servers = ["127.0.0.1:7101", "127.0.0.1:7102"]
"#;

#[test]
fn minimal_config_applies_defaults() {
    let config = load_config_from_str(MINIMAL).unwrap();
    assert_eq!(config.mode, ConsistencyMode::Sequential);
    assert!(config.coordinator);
    // The coordinator defaults to itself.
    assert_eq!(config.coordinator_addr, config.listen);
    assert!(config.timing.simulate_latency);
    assert_eq!(config.timing.propagate_interval, Duration::from_secs(5));
    assert_eq!(config.timing.sync_interval, Duration::from_secs(30));
    assert_eq!(config.timing.rpc_timeout, Duration::from_secs(10));
    assert_eq!(config.peers(), vec!["127.0.0.1:7102".parse().unwrap()]);
}

#[test]
fn quorum_config_parses() {
    let config = load_config_from_str(
        r#"
listen = "127.0.0.1:7101"
mode = "quorum"
coordinator = true
servers = ["127.0.0.1:7101", "127.0.0.1:7102", "127.0.0.1:7103"]

[quorum]
n = 3
nr = 2
nw = 2

[timing]
simulate_latency = false
rng_seed = 7
rpc_timeout_ms = 2500
"#,
    )
    .unwrap();
    let quorum = config.quorum.unwrap();
    assert_eq!((quorum.n, quorum.nr, quorum.nw), (3, 2, 2));
    assert!(!config.timing.simulate_latency);
    assert_eq!(config.timing.rng_seed, Some(7));
    assert_eq!(config.timing.rpc_timeout, Duration::from_millis(2500));
}

#[test]
fn non_coordinator_must_name_the_coordinator() {
    let err = load_config_from_str(
        r#"
listen = "127.0.0.1:7102"
mode = "sequential"
servers = ["127.0.0.1:7101", "127.0.0.1:7102"]
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("coordinator_addr"));
}

#[test]
fn server_list_must_include_self() {
    let err = load_config_from_str(
        r#"
listen = "127.0.0.1:7109"
mode = "sequential"
coordinator = true
servers = ["127.0.0.1:7101"]
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("listen address"));
}

#[test]
fn quorum_mode_requires_the_quorum_table() {
    let err = load_config_from_str(
        r#"
listen = "127.0.0.1:7101"
mode = "quorum"
coordinator = true
servers = ["127.0.0.1:7101"]
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("quorum"));
}

#[test]
fn overlapping_quorums_are_required() {
    // NR + NW = N: reads may miss writes entirely.
    let err = load_config_from_str(
        r#"
listen = "127.0.0.1:7101"
mode = "quorum"
coordinator = true
servers = ["127.0.0.1:7101"]

[quorum]
n = 4
nr = 2
nw = 2
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("NR + NW > N"));
}

#[test]
fn majority_write_quorum_is_required() {
    // NW = N/2: two disjoint write quorums could commit conflicting state.
    let err = load_config_from_str(
        r#"
listen = "127.0.0.1:7101"
mode = "quorum"
coordinator = true
servers = ["127.0.0.1:7101"]

[quorum]
n = 4
nr = 3
nw = 2
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("NW > N/2"));
}

#[test]
fn unparseable_address_is_rejected() {
    let err = load_config_from_str(
        r#"
listen = "not-an-address"
mode = "sequential"
coordinator = true
servers = ["not-an-address"]
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("listen"));
}

#[test]
fn loads_from_a_file_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MINIMAL.as_bytes()).unwrap();
    let config = load_config_from_path(file.path()).unwrap();
    assert_eq!(config.servers.len(), 2);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_config_from_path(std::path::Path::new("/nonexistent/server.toml")).unwrap_err();
    assert!(err.to_string().contains("IO error"));
}
