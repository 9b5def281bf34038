//! Simulation configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

/// Simulation settings with sensible defaults.
///
/// Reads from environment variables:
/// - `SIM_CLIENTS`: concurrent clients (default: `8`)
/// - `SIM_ITERATIONS`: carts each client fills (default: `50`)
/// - `SIM_PRODUCTS`: products in the catalog (default: `5`)
/// - `SIM_STOCK`: initial stock per product (default: `500`)
/// - `SIM_BUCKET_MS`: width of a timing bucket (default: `100`)
/// - `SIM_EXPIRE_AFTER_MS`: age at which abandoned carts are swept (default: `0`)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory store when unset
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorConfig {
    pub clients: usize,
    pub iterations: usize,
    pub products: usize,
    pub stock: u32,
    pub bucket_ms: u64,
    pub expire_after_ms: u64,
    pub database_url: Option<String>,
    pub log_level: String,
}

impl SimulatorConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from any key lookup. Unparsable values fall back
    /// to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            clients: parsed(&lookup, "SIM_CLIENTS").unwrap_or(defaults.clients),
            iterations: parsed(&lookup, "SIM_ITERATIONS").unwrap_or(defaults.iterations),
            products: parsed(&lookup, "SIM_PRODUCTS")
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.products),
            stock: parsed(&lookup, "SIM_STOCK").unwrap_or(defaults.stock),
            bucket_ms: parsed(&lookup, "SIM_BUCKET_MS").unwrap_or(defaults.bucket_ms),
            expire_after_ms: parsed(&lookup, "SIM_EXPIRE_AFTER_MS")
                .unwrap_or(defaults.expire_after_ms),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    /// Returns the timing bucket width.
    pub fn bucket_width(&self) -> Duration {
        Duration::from_millis(self.bucket_ms)
    }

    /// Returns how old an abandoned cart must be to be expired.
    pub fn expire_after(&self) -> Duration {
        Duration::from_millis(self.expire_after_ms)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            clients: 8,
            iterations: 50,
            products: 5,
            stock: 500,
            bucket_ms: 100,
            expire_after_ms: 0,
            database_url: None,
            log_level: "info".to_string(),
        }
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
    fn test_default_values() {
        let config = SimulatorConfig::default();
        assert_eq!(config.clients, 8);
        assert_eq!(config.iterations, 50);
        assert_eq!(config.stock, 500);
        assert_eq!(config.database_url, None);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        assert_eq!(SimulatorConfig::from_lookup(lookup(&[])), SimulatorConfig::default());
    }

    #[test]
    fn test_reads_overrides() {
        let config = SimulatorConfig::from_lookup(lookup(&[
            ("SIM_CLIENTS", "32"),
            ("SIM_ITERATIONS", " 10 "),
            ("SIM_STOCK", "7"),
            ("SIM_BUCKET_MS", "250"),
            ("DATABASE_URL", "postgres://localhost/carts"),
            ("RUST_LOG", "debug"),
        ]));

        assert_eq!(config.clients, 32);
        assert_eq!(config.iterations, 10);
        assert_eq!(config.stock, 7);
        assert_eq!(config.bucket_width(), Duration::from_millis(250));
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/carts"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = SimulatorConfig::from_lookup(lookup(&[
            ("SIM_CLIENTS", "many"),
            ("SIM_PRODUCTS", "0"),
            ("SIM_STOCK", "-3"),
            ("DATABASE_URL", ""),
        ]));

        assert_eq!(config.clients, 8);
        assert_eq!(config.products, 5);
        assert_eq!(config.stock, 500);
        assert_eq!(config.database_url, None);
    }
}
