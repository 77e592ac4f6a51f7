use std::env;
use std::path::PathBuf;

use ether_runtime::{load_tls_acceptor, Root, ServerCom};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_logging();

    let bind_addr = env::var("ETHER_BIND").unwrap_or_else(|_| "0.0.0.0:10000".to_owned());
    let ssl_cert = env::var("ETHER_SSL_CERT").ok();
    let ssl_key = env::var("ETHER_SSL_KEY").ok();
    let freq = env::var("ETHER_FREQ").ok().and_then(|v| v.parse::<u32>().ok()).unwrap_or(1000);
    let slow_freq = env::var("ETHER_SLOW_FREQ").ok().and_then(|v| v.parse::<u32>().ok()).unwrap_or(1);
    info!(freq, slow_freq, "worker tick budgets configured (informational; tick cadence is fixed internally)");

    let tls = match (ssl_cert, ssl_key) {
        (Some(cert), Some(key)) => {
            info!("TLS enabled");
            Some(load_tls_acceptor(&PathBuf::from(cert), &PathBuf::from(key)).expect("failed to load TLS cert/key"))
        }
        (None, None) => None,
        _ => panic!("ETHER_SSL_CERT and ETHER_SSL_KEY must both be set or both be unset"),
    };

    let root = Root::new();
    root.shutdown_on_ctrl_c();
    let server = ServerCom::new(&root);
    let addr = server
        .bind(&bind_addr, tls, &root)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));
    info!(%addr, "repeater listening");

    while root.is_active() {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    }
    info!("repeater shut down gracefully");
}

/// Builds an `EnvFilter` from `LOG_LEVEL`, then layers `LOG_IGNORE`/
/// `LOG_FOCUS` (comma-separated names, `*` suffix meaning prefix-match) as
/// additional directives targeting this crate's modules.
fn init_logging() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    let mut filter = EnvFilter::new(log_level);

    if let Ok(ignore) = env::var("LOG_IGNORE") {
        for name in ignore.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            for target in targets_for(name) {
                if let Ok(directive) = format!("{target}=off").parse() {
                    filter = filter.add_directive(directive);
                }
            }
        }
    }
    if let Ok(focus) = env::var("LOG_FOCUS") {
        for name in focus.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            for target in targets_for(name) {
                if let Ok(directive) = format!("{target}=trace").parse() {
                    filter = filter.add_directive(directive);
                }
            }
        }
    }

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Maps a `LOG_IGNORE`/`LOG_FOCUS` entry to the module paths it should
/// gate. A trailing `*` is a prefix wildcard; both crates are targeted
/// since either can emit the named module.
fn targets_for(name: &str) -> Vec<String> {
    let base = name.trim_end_matches('*');
    vec![format!("ether_runtime::{base}"), format!("ether_call::{base}")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_for_exact_name() {
        assert_eq!(targets_for("handshake"), vec!["ether_runtime::handshake", "ether_call::handshake"]);
    }

    #[test]
    fn targets_for_wildcard_strips_suffix() {
        assert_eq!(targets_for("com*"), vec!["ether_runtime::com", "ether_call::com"]);
    }
}
