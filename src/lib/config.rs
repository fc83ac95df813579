use anyhow::{Context, Result};
use std::env;

pub const BIND_ADDR_VAR: &str = "TODO_BIND_ADDR";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const MAX_CONNECTIONS_VAR: &str = "TODO_MAX_CONNECTIONS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            database_url: "sqlite://todo.db".to_string(),
            max_connections: 5,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(addr) = lookup(BIND_ADDR_VAR) {
            config.bind_addr = addr;
        }
        if let Some(url) = lookup(DATABASE_URL_VAR) {
            config.database_url = url;
        }
        if let Some(raw) = lookup(MAX_CONNECTIONS_VAR) {
            config.max_connections = raw
                .trim()
                .parse()
                .with_context(|| format!("{MAX_CONNECTIONS_VAR} must be a positive integer, got {raw:?}"))?;
            anyhow::ensure!(config.max_connections > 0, "{MAX_CONNECTIONS_VAR} must be at least 1");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            (BIND_ADDR_VAR, "127.0.0.1:8080"),
            (DATABASE_URL_VAR, "sqlite::memory:"),
            (MAX_CONNECTIONS_VAR, " 2 "),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.max_connections, 2);
    }

    #[test]
    fn bad_connection_count_is_an_error() {
        assert!(ServerConfig::from_lookup(lookup(&[(MAX_CONNECTIONS_VAR, "many")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[(MAX_CONNECTIONS_VAR, "0")])).is_err());
    }
}
