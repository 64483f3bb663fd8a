use std::net::SocketAddr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    /// Postgres connection string; the in-memory store is used when unset.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub nats_url: Option<String>,
    pub db_max_connections: u32,
    pub notification_buffer: usize,
    /// Registering with this email creates an approved admin account.
    pub bootstrap_admin_email: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8083)),
            log_level: "info".to_string(),
            nats_url: None,
            db_max_connections: 10,
            notification_buffer: 256,
            bootstrap_admin_email: None,
        }
    }
}

/// Load configuration, reading a `.env` file first when one exists.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_app_config(|key| std::env::var(key).ok())
}

/// Parses configuration from any key lookup, so tests never touch the process environment.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let optional = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let or_default = |var: &str, default: &str| optional(var).unwrap_or_else(|| default.to_string());
    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar { var: var.to_string(), reason };

    let port = or_default("PORT", "8083");
    let host = or_default("BIND_HOST", "0.0.0.0");
    let bind_addr = format!("{host}:{port}")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("PORT", e.to_string()))?;

    let db_max_connections = or_default("DB_MAX_CONNECTIONS", "10")
        .parse::<u32>()
        .map_err(|e| invalid("DB_MAX_CONNECTIONS", e.to_string()))?;

    let notification_buffer = or_default("NOTIFICATION_BUFFER", "256")
        .parse::<usize>()
        .map_err(|e| invalid("NOTIFICATION_BUFFER", e.to_string()))?;
    if notification_buffer == 0 {
        return Err(invalid("NOTIFICATION_BUFFER", "must be greater than zero".to_string()));
    }

    Ok(AppConfig {
        database_url: optional("DATABASE_URL"),
        bind_addr,
        log_level: or_default("LOG_LEVEL", "info"),
        nats_url: optional("NATS_URL"),
        db_max_connections,
        notification_buffer,
        bootstrap_admin_email: optional("BOOTSTRAP_ADMIN_EMAIL").map(|e| e.to_lowercase()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        build_app_config(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config_from(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/market"),
            ("PORT", "9000"),
            ("BIND_HOST", "127.0.0.1"),
            ("NATS_URL", " "),
            ("BOOTSTRAP_ADMIN_EMAIL", "Ops@Market.Example"),
        ])
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/market"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.nats_url, None);
        assert_eq!(config.bootstrap_admin_email.as_deref(), Some("ops@market.example"));
    }

    #[test]
    fn test_invalid_numbers() {
        let err = config_from(&[("DB_MAX_CONNECTIONS", "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "DB_MAX_CONNECTIONS"));
        assert!(config_from(&[("PORT", "99999")]).is_err());
        assert!(config_from(&[("NOTIFICATION_BUFFER", "0")]).is_err());
    }
}
