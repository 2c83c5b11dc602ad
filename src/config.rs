use std::net::IpAddr;

use ipnet::IpNet;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    pub trusted_proxies: Vec<IpNet>,
    pub log_level: String,
    /// Capacity of the ingestion queue between handlers and the writer task.
    pub ingest_queue_size: usize,
    /// Rows fetched per storage round-trip while streaming an export.
    pub export_chunk_size: i64,
    /// Upper bound on a single query/stats storage round-trip.
    pub query_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("VIGIL_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid VIGIL_HOST: {e}"))?;

        let port: u16 = env_or("VIGIL_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid VIGIL_PORT: {e}"))?;

        let max_body_size: usize = env_or("VIGIL_MAX_BODY_SIZE", "262144")
            .parse()
            .map_err(|e| format!("Invalid VIGIL_MAX_BODY_SIZE: {e}"))?;

        let trusted_proxies: Vec<IpNet> = env_or("VIGIL_TRUSTED_PROXIES", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|e| format!("Invalid VIGIL_TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let log_level = env_or("VIGIL_LOG_LEVEL", "info");

        let ingest_queue_size: usize = env_or("VIGIL_INGEST_QUEUE_SIZE", "4096")
            .parse()
            .map_err(|e| format!("Invalid VIGIL_INGEST_QUEUE_SIZE: {e}"))?;

        let export_chunk_size: i64 = env_or("VIGIL_EXPORT_CHUNK_SIZE", "500")
            .parse()
            .map_err(|e| format!("Invalid VIGIL_EXPORT_CHUNK_SIZE: {e}"))?;

        let query_timeout_secs: u64 = env_or("VIGIL_QUERY_TIMEOUT_SECS", "10")
            .parse()
            .map_err(|e| format!("Invalid VIGIL_QUERY_TIMEOUT_SECS: {e}"))?;

        if ingest_queue_size == 0 {
            return Err("VIGIL_INGEST_QUEUE_SIZE must be at least 1".to_string());
        }
        if export_chunk_size < 1 {
            return Err("VIGIL_EXPORT_CHUNK_SIZE must be at least 1".to_string());
        }

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            max_body_size,
            trusted_proxies,
            log_level,
            ingest_queue_size,
            export_chunk_size,
            query_timeout_secs,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
