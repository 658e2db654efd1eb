use std::time::Duration;

use crate::audit;
use crate::auth::role::RolePolicy;
use crate::store::RetryPolicy;

/// Runtime configuration, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Raw `SESSION_KEY`; must be at least 64 bytes to be used.
    pub session_key: Option<String>,
    pub gateway_secret: Option<String>,
    pub admin_emails: Vec<String>,
    pub seed_demo: bool,
    pub audit_retention_days: i64,
    pub retry: RetryPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            database_url: None,
            db_max_connections: 8,
            session_key: None,
            gateway_secret: None,
            admin_emails: Vec::new(),
            seed_demo: false,
            audit_retention_days: 90,
            retry: RetryPolicy::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_ok() {
            log::info!("Loaded .env");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: get("DATABASE_URL"),
            db_max_connections: parse_var(get("DB_MAX_CONNECTIONS")).unwrap_or(defaults.db_max_connections),
            session_key: get("SESSION_KEY"),
            gateway_secret: get("GATEWAY_SECRET"),
            admin_emails: get("ADMIN_EMAILS")
                .map(|csv| {
                    csv.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            seed_demo: get("SEED_DEMO")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.seed_demo),
            audit_retention_days: parse_var::<i64>(get("AUDIT_RETENTION_DAYS"))
                .unwrap_or(defaults.audit_retention_days)
                .clamp(*audit::RETENTION_DAYS.start(), *audit::RETENTION_DAYS.end()),
            retry: RetryPolicy {
                max_attempts: parse_var(get("STORE_RETRY_ATTEMPTS"))
                    .unwrap_or(defaults.retry.max_attempts)
                    .max(1),
                initial_backoff: parse_var(get("STORE_RETRY_BACKOFF_MS"))
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.initial_backoff),
            },
        }
    }

    pub fn role_policy(&self) -> RolePolicy {
        RolePolicy {
            admin_emails: self.admin_emails.clone(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = from_pairs(&[]);
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert!(config.database_url.is_none());
        assert!(!config.seed_demo);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.audit_retention_days, 90);
    }

    #[test]
    fn reads_values() {
        let config = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/hs"),
            ("ADMIN_EMAILS", "a@x.com, b@x.com,,"),
            ("SEED_DEMO", "true"),
            ("STORE_RETRY_ATTEMPTS", "0"),
            ("STORE_RETRY_BACKOFF_MS", "10"),
            ("AUDIT_RETENTION_DAYS", "not-a-number"),
        ]);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/hs"));
        assert_eq!(config.admin_emails, vec!["a@x.com", "b@x.com"]);
        assert!(config.seed_demo);
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(10));
        assert_eq!(config.audit_retention_days, 90);
        assert_eq!(config.role_policy().admin_emails.len(), 2);
    }

    #[test]
    fn clamps_audit_retention() {
        assert_eq!(from_pairs(&[("AUDIT_RETENTION_DAYS", "-5")]).audit_retention_days, 1);
        assert_eq!(from_pairs(&[("AUDIT_RETENTION_DAYS", "0")]).audit_retention_days, 1);
        assert_eq!(
            from_pairs(&[("AUDIT_RETENTION_DAYS", "9223372036854775807")]).audit_retention_days,
            36_500
        );
        assert_eq!(from_pairs(&[("AUDIT_RETENTION_DAYS", "30")]).audit_retention_days, 30);
    }
}
