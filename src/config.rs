//! Process-level configuration: the handful of values the edge layer reads
//! from the environment at startup.
//! Per-request chunking/provider selection travels in `read_config`
//! ([`crate::document::ChunkingConfig`]) instead.

use serde::{Deserialize, Serialize};

use crate::document::{StorageConfig, StorageProvider};

fn default_port() -> u16 {
    50051
}

fn default_max_workers() -> usize {
    4
}

/// Loaded once at process start and shared read-only across every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub port: u16,
    pub max_workers: usize,
    pub storage: StorageConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_workers: default_max_workers(),
            storage: StorageConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Reads `GRPC_PORT` / `GRPC_MAX_WORKERS` plus the storage provider's
    /// credential variables, falling back to the documented defaults for
    /// anything unset or unparsable.
    ///
    /// `GRPC_PORT`'s default of 50051 is kept even though this service binds
    /// it as an HTTP port — the name and default are inherited
    /// from the collaborator contract, not the transport.
    pub fn from_env() -> Self {
        let port = std::env::var("GRPC_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_port);
        let max_workers = std::env::var("GRPC_MAX_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_max_workers);

        Self {
            port,
            max_workers,
            storage: storage_config_from_env(),
        }
    }
}

fn storage_config_from_env() -> StorageConfig {
    let provider = match std::env::var("STORAGE_PROVIDER")
        .unwrap_or_default()
        .to_lowercase()
        .as_str()
    {
        "cos" => StorageProvider::Cos,
        "minio" => StorageProvider::Minio,
        "base64" => StorageProvider::Base64,
        _ => StorageProvider::Local,
    };

    let (access_key_id, secret_access_key, bucket_name, region, endpoint) = match provider {
        StorageProvider::Cos => (
            std::env::var("COS_SECRET_ID").unwrap_or_default(),
            std::env::var("COS_SECRET_KEY").unwrap_or_default(),
            std::env::var("COS_BUCKET").unwrap_or_default(),
            std::env::var("COS_REGION").unwrap_or_default(),
            std::env::var("COS_ENDPOINT").unwrap_or_default(),
        ),
        StorageProvider::Minio => (
            std::env::var("MINIO_ACCESS_KEY").unwrap_or_default(),
            std::env::var("MINIO_SECRET_KEY").unwrap_or_default(),
            std::env::var("MINIO_BUCKET").unwrap_or_default(),
            std::env::var("MINIO_REGION").unwrap_or_default(),
            std::env::var("MINIO_ENDPOINT").unwrap_or_default(),
        ),
        StorageProvider::Local | StorageProvider::Base64 => Default::default(),
    };

    StorageConfig {
        provider,
        access_key_id,
        secret_access_key,
        bucket_name,
        region,
        endpoint,
        path_prefix: std::env::var("STORAGE_PATH_PREFIX").unwrap_or_default(),
        base_dir: std::env::var("STORAGE_BASE_DIR").unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 50051);
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.storage.provider, StorageProvider::Local);
    }

    #[test]
    fn from_env_falls_back_when_unset() {
        std::env::remove_var("GRPC_PORT");
        std::env::remove_var("GRPC_MAX_WORKERS");
        let config = ServiceConfig::from_env();
        assert_eq!(config.port, 50051);
        assert_eq!(config.max_workers, 4);
    }
}
