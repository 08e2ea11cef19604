#![forbid(unsafe_code)]

use axum::http::HeaderName;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STORAGE_DIR: &str = ".cardtree";
pub const DEFAULT_PORT: u16 = 9090;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_USER_HEADER: &str = "x-acting-user";
/// Upper bound on the gap between the store deadline and the HTTP timeout.
const STORE_DEADLINE_MARGIN_MAX: Duration = Duration::from_millis(250);

/// Built once at startup and handed to [`crate::AppState`].
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub storage_dir: PathBuf,
    pub bind: SocketAddr,
    pub request_timeout: Duration,
    /// Header carrying the verified username set by the upstream auth proxy.
    pub user_header: HeaderName,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            bind: default_bind(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            user_header: HeaderName::from_static(DEFAULT_USER_HEADER),
        }
    }
}

impl ServerConfig {
    /// Process arguments first, then `CARDTREE_*` environment variables, then defaults.
    pub fn from_env() -> Self {
        let args = std::env::args().skip(1).collect::<Vec<_>>();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    pub fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            storage_dir: parse_storage_dir(args, &env),
            bind: parse_bind(args, &env),
            request_timeout: parse_request_timeout(args, &env),
            user_header: parse_user_header(args, &env),
        }
    }

    /// Budget handed to the store for one request. It ends before the HTTP
    /// timeout fires, so a write that would commit after the client already
    /// saw the timeout rolls back instead.
    pub fn store_deadline(&self) -> Duration {
        let margin = (self.request_timeout / 10).min(STORE_DEADLINE_MARGIN_MAX);
        self.request_timeout.saturating_sub(margin)
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT)
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let mut args = args.iter();
    while let Some(arg) = args.next() {
        if arg.as_str() == flag
            && let Some(value) = args.next()
        {
            return Some(value.clone());
        }
        if let Some(value) = arg
            .strip_prefix(flag)
            .and_then(|rest| rest.strip_prefix('='))
        {
            return Some(value.to_string());
        }
    }
    None
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_storage_dir(args: &[String], env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    non_empty(flag_value(args, "--storage-dir").or_else(|| env("CARDTREE_STORAGE_DIR")))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR))
}

fn parse_bind(args: &[String], env: &impl Fn(&str) -> Option<String>) -> SocketAddr {
    if let Some(raw) = non_empty(flag_value(args, "--bind").or_else(|| env("CARDTREE_ADDR"))) {
        // ":9090" listens on every interface.
        if let Some(port) = raw.strip_prefix(':') {
            return match port.parse::<u16>() {
                Ok(port) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
                Err(_) => {
                    tracing::warn!(value = raw.as_str(), "invalid bind address, using default");
                    default_bind()
                }
            };
        }
        return match raw.parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(_) => {
                tracing::warn!(value = raw.as_str(), "invalid bind address, using default");
                default_bind()
            }
        };
    }

    let Some(raw) = non_empty(env("CARDTREE_PORT").or_else(|| env("PORT"))) else {
        return default_bind();
    };
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port),
        _ => {
            tracing::warn!(value = raw.as_str(), "invalid port, using default");
            default_bind()
        }
    }
}

fn parse_request_timeout(args: &[String], env: &impl Fn(&str) -> Option<String>) -> Duration {
    let default = Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS);
    let Some(raw) = non_empty(
        flag_value(args, "--request-timeout-ms").or_else(|| env("CARDTREE_REQUEST_TIMEOUT_MS")),
    ) else {
        return default;
    };
    match raw.parse::<u64>() {
        Ok(ms) if ms > 0 => Duration::from_millis(ms),
        _ => {
            tracing::warn!(value = raw.as_str(), "invalid request timeout, using default");
            default
        }
    }
}

fn parse_user_header(args: &[String], env: &impl Fn(&str) -> Option<String>) -> HeaderName {
    let default = HeaderName::from_static(DEFAULT_USER_HEADER);
    let Some(raw) =
        non_empty(flag_value(args, "--user-header").or_else(|| env("CARDTREE_USER_HEADER")))
    else {
        return default;
    };
    match HeaderName::from_bytes(raw.to_ascii_lowercase().as_bytes()) {
        Ok(name) => name,
        Err(_) => {
            tracing::warn!(value = raw.as_str(), "invalid user header, using default");
            default
        }
    }
}
