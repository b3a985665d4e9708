//! Service configuration (read once at startup).
//!
//! Values come from environment variables. `from_lookup` takes any key lookup
//! so parsing is testable without touching the process environment.

use std::collections::BTreeMap;

use thiserror::Error;

/// Destination every outcome event is routed to.
pub const OUTCOME_DESTINATION: &str = "inventory.updated";

const DEFAULT_SINK_URL: &str = "redis://localhost:6379";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown inventory store backend '{0}' (expected 'memory' or 'postgres')")]
    UnknownBackend(String),

    #[error("{0} must be set for the postgres inventory store")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("outcome publishing required but {0}")]
    TransportUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackendConfig {
    /// In-memory reference store, optionally pre-loaded.
    Memory { seed: BTreeMap<String, i64> },
    /// Transactional PostgreSQL store.
    Postgres { database_url: String, table: String },
}

impl StoreBackendConfig {
    pub fn name(&self) -> &'static str {
        match self {
            StoreBackendConfig::Memory { .. } => "memory",
            StoreBackendConfig::Postgres { .. } => "postgres",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    pub enabled: bool,
    pub strict: bool,
    pub sink_url: String,
    pub destination: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strict: false,
            sink_url: DEFAULT_SINK_URL.to_string(),
            destination: OUTCOME_DESTINATION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub store: StoreBackendConfig,
    pub publisher: PublisherConfig,
    pub host: String,
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store: StoreBackendConfig::Memory { seed: BTreeMap::new() },
            publisher: PublisherConfig::default(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = get("INVENTORY_STORE_BACKEND").unwrap_or_else(|| "memory".to_string());
        let store = match backend.trim().to_lowercase().as_str() {
            "memory" => StoreBackendConfig::Memory {
                seed: parse_seed(get("INVENTORY_SEED").as_deref().unwrap_or(""))?,
            },
            "postgres" => {
                let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
                let table = get("INVENTORY_TABLE").ok_or(ConfigError::Missing("INVENTORY_TABLE"))?;
                validate_table_name(&table)?;
                StoreBackendConfig::Postgres { database_url, table }
            }
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        let publisher = PublisherConfig {
            enabled: parse_flag(get("INVENTORY_PUBLISH_ENABLED").as_deref()),
            strict: parse_flag(get("INVENTORY_PUBLISH_STRICT").as_deref()),
            sink_url: get("INVENTORY_SINK_URL")
                .or_else(|| get("REDIS_URL"))
                .unwrap_or_else(|| DEFAULT_SINK_URL.to_string()),
            destination: OUTCOME_DESTINATION.to_string(),
        };

        let host = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "PORT",
                message: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            store,
            publisher,
            host,
            port,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `1`, `true`, `yes`, `on` (any case) are true; anything else is false.
pub fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// Parse `SKU=QTY,SKU=QTY`. Repeated SKUs are summed.
pub fn parse_seed(raw: &str) -> Result<BTreeMap<String, i64>, ConfigError> {
    let mut seed = BTreeMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let invalid = |message: String| ConfigError::Invalid {
            key: "INVENTORY_SEED",
            message,
        };
        let (sku, qty) = pair
            .split_once('=')
            .ok_or_else(|| invalid(format!("expected SKU=QTY, got '{pair}'")))?;
        let sku = sku.trim();
        if sku.is_empty() {
            return Err(invalid(format!("empty SKU in '{pair}'")));
        }
        let qty: i64 = qty
            .trim()
            .parse()
            .map_err(|e| invalid(format!("bad quantity in '{pair}': {e}")))?;
        if qty < 0 {
            return Err(invalid(format!("negative quantity in '{pair}'")));
        }
        let entry = seed.entry(sku.to_string()).or_insert(0i64);
        *entry = entry.saturating_add(qty);
    }
    Ok(seed)
}

/// The table name is interpolated into SQL, so only plain identifiers pass
/// (optionally schema-qualified).
pub fn validate_table_name(table: &str) -> Result<(), ConfigError> {
    let valid_part = |part: &str| {
        !part.is_empty()
            && part.len() <= 63
            && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !part.starts_with(|c: char| c.is_ascii_digit())
    };
    let parts: Vec<&str> = table.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|p| valid_part(p)) {
        return Err(ConfigError::Invalid {
            key: "INVENTORY_TABLE",
            message: format!("'{table}' is not a plain identifier"),
        });
    }
    Ok(())
}
