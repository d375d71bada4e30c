// Configuration module entry point
// Loads layered configuration and owns the shared application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, HealthConfig, HttpConfig, LoggingConfig, PerformanceConfig, ReplicationConfig,
    ServerConfig,
};

impl Config {
    /// Load configuration from the default `config.toml`
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from the specified file path (without extension).
    ///
    /// Sources, later ones winning: serde defaults, the optional config
    /// file, `REPLIKV_*` environment variables, and finally the container
    /// deployment variables `SOCKET_ADDRESS` and `VIEW`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("REPLIKV"))
            .build()?;

        let mut cfg: Self = settings.try_deserialize()?;
        cfg.apply_deployment_env();
        Ok(cfg)
    }

    /// Apply `SOCKET_ADDRESS` and `VIEW` from the environment.
    ///
    /// These are the names the container recipe supplies: `SOCKET_ADDRESS`
    /// is this replica's `host:port` (bind address and clock identity),
    /// `VIEW` is the comma-separated list of all replica addresses.
    fn apply_deployment_env(&mut self) {
        if let Ok(socket_address) = std::env::var("SOCKET_ADDRESS") {
            if let Some((host, port)) = parse_socket_address(&socket_address) {
                self.server.host = host;
                self.server.port = port;
            }
        }
        if let Ok(view) = std::env::var("VIEW") {
            self.replication.view = parse_view(&view);
        }
    }

    /// This replica's address as it appears in views and vector clocks
    pub fn local_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, String> {
        self.local_address()
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

/// Split a `host:port` string, rejecting malformed ports
fn parse_socket_address(address: &str) -> Option<(String, u16)> {
    let (host, port) = address.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    let port = port.parse().ok()?;
    Some((host.to_string(), port))
}

/// Split a comma-separated view, skipping empty segments
fn parse_view(view: &str) -> Vec<String> {
    view.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_socket_address() {
        assert_eq!(
            parse_socket_address("10.10.0.2:8090"),
            Some(("10.10.0.2".to_string(), 8090))
        );
        assert_eq!(parse_socket_address("8090"), None);
        assert_eq!(parse_socket_address(":8090"), None);
        assert_eq!(parse_socket_address("host:notaport"), None);
    }

    #[test]
    fn test_parse_view() {
        assert_eq!(
            parse_view("a:1,b:2, c:3"),
            vec!["a:1".to_string(), "b:2".to_string(), "c:3".to_string()]
        );
        assert!(parse_view("").is_empty());
        assert_eq!(parse_view("a:1,,"), vec!["a:1".to_string()]);
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.local_address(), "127.0.0.1:8090");
        assert!(cfg.replication.view.is_empty());
        assert_eq!(cfg.replication.connect_timeout_secs, 5);
        assert_eq!(cfg.replication.poll_interval_secs, 1);
        assert!(cfg.bind_addr().is_ok());
    }
}
