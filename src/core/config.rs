use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub views: ViewsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory all video content locations are resolved against.
    pub media_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub cache_control: String,
    pub cors_allowed_origins: Vec<String>,
    /// Read buffer size for streamed bodies.
    #[serde(default = "default_stream_chunk_bytes")]
    pub stream_chunk_bytes: usize,
}

fn default_stream_chunk_bytes() -> usize {
    64 * 1024
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Optional JSON document with videos, viewers and ads loaded at startup.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

/// A session token issued by the external auth service, bound to a viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerTokenConfig {
    pub token: String,
    pub viewer_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub admin_bearer_tokens: Vec<String>,
    #[serde(default)]
    pub viewer_tokens: Vec<ViewerTokenConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub max_json_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
    pub metrics_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewsConfig {
    /// Capacity of the view-increment channel. Increments beyond it are dropped.
    pub channel_capacity: usize,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

impl AppConfig {
    /// Load configuration with layered overrides:
    /// 1. config/default.toml
    /// 2. config/{env}.toml (based on VODSTREAM_ENV)
    /// 3. Environment variables (VODSTREAM_* prefix)
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("config"))
    }

    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let default_path = dir.join("default.toml");
        let default_content = std::fs::read_to_string(&default_path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", default_path.display(), e))?;

        let mut config: AppConfig = toml::from_str(&default_content)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", default_path.display(), e))?;

        let env_name =
            std::env::var("VODSTREAM_ENV").unwrap_or_else(|_| "development".to_string());
        let env_path = dir.join(format!("{}.toml", env_name));
        if let Ok(env_content) = std::fs::read_to_string(&env_path) {
            config = toml::from_str(&env_content)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", env_path.display(), e))?;
        }

        Self::apply_env_overrides(&mut config);

        Ok(config)
    }

    fn apply_env_overrides(config: &mut AppConfig) {
        if let Ok(v) = std::env::var("VODSTREAM_SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = std::env::var("VODSTREAM_SERVER_PORT") {
            if let Ok(port) = v.parse() {
                config.server.port = port;
            }
        }
        if let Ok(v) = std::env::var("VODSTREAM_STORAGE_MEDIA_ROOT") {
            config.storage.media_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("VODSTREAM_CATALOG_SEED_PATH") {
            config.catalog.seed_path = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("VODSTREAM_AUTH_ADMIN_BEARER_TOKENS") {
            config.auth.admin_bearer_tokens = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = std::env::var("VODSTREAM_OBSERVABILITY_LOG_LEVEL") {
            config.observability.log_level = v;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                media_root: PathBuf::from("media"),
            },
            delivery: DeliveryConfig {
                cache_control: "private, max-age=0".to_string(),
                cors_allowed_origins: vec!["*".to_string()],
                stream_chunk_bytes: default_stream_chunk_bytes(),
            },
            catalog: CatalogConfig::default(),
            auth: AuthConfig {
                admin_bearer_tokens: Vec::new(),
                viewer_tokens: Vec::new(),
            },
            security: SecurityConfig {
                max_json_body_bytes: 1_048_576, // 1 MB
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                log_format: "json".to_string(),
                metrics_enabled: true,
            },
            views: ViewsConfig::default(),
        }
    }
}
