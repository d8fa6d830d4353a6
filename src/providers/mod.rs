//! External gateway clients. One module per upstream system; every client
//! owns its own reqwest::Client with a bounded timeout and exposes a narrow
//! read contract. Callers treat any error as "no data for this field".

pub mod itad;
pub mod protondb;
pub mod steam_store;
pub mod steam_web;
pub mod steamspy;

use std::time::Duration;

use crate::util::env::env_parse;

pub(crate) fn truncate_for_log(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        s.truncate(max_len);
        s.push('…');
    }
    s
}

/// Shared client builder: per-gateway timeout, overridable via env.
pub(crate) fn http_client(timeout_env: &str) -> reqwest::Client {
    let timeout_secs: u64 = env_parse(timeout_env, 15u64);
    reqwest::Client::builder()
        .user_agent(concat!("game-night/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
