//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{
    CliArgs, Command, GenerateArgs, GlobalOverrides, IndexArgs, PageArgs, StoreBackendArg,
    WatchArgs,
};

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::artifacts::{ArtifactPaths, DEFAULT_SHORT_NAME_LIMIT};
use crate::cache::SENTINEL_STORAGE_KEY;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "tidecast";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_INDEX_TTL_SECS: u64 = 300;
const DEFAULT_SIGNAL_DEBOUNCE_MS: u64 = 250;
const DEFAULT_SIGNAL_BATCH_LIMIT: u64 = 100;
const DEFAULT_MOBILE_CONFIG_PATH: &str = "mobile/app-config.json";
const DEFAULT_MANIFEST_PATH: &str = "public/manifest.json";
const DEFAULT_SNAPSHOT_PATH: &str = "public/content-snapshot.json";
const DEFAULT_CONSTANTS_PATH: &str = "src/generated/content-constants.ts";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub store: StoreSettings,
    pub cache: CacheSettings,
    pub artifacts: ArtifactSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-memory store, optionally seeded from a JSON file.
    Memory { seed_file: Option<PathBuf> },
    Postgres {
        url: String,
        max_connections: NonZeroU32,
        acquire_timeout: Duration,
    },
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Base URL of the site whose list endpoint page caches read.
    pub content_base_url: Option<String>,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub index_ttl: Duration,
    pub signal_debounce: Duration,
    pub signal_batch_limit: NonZeroUsize,
    pub sentinel_key: String,
}

#[derive(Debug, Clone)]
pub struct ArtifactSettings {
    pub paths: ArtifactPaths,
    pub short_name_limit: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("TIDECAST").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_global_overrides(&cli.overrides);
    if let Command::Generate(args) = &cli.command {
        raw.apply_generate_overrides(args);
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    store: RawStoreSettings,
    cache: RawCacheSettings,
    artifacts: RawArtifactSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(backend) = overrides.store_backend {
            self.store.backend = Some(
                match backend {
                    StoreBackendArg::Memory => "memory",
                    StoreBackendArg::Postgres => "postgres",
                }
                .to_string(),
            );
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.store.database_url = Some(url.clone());
        }
        if let Some(path) = overrides.seed_file.as_ref() {
            self.store.seed_file = Some(path.clone());
        }
        if let Some(url) = overrides.content_base_url.as_ref() {
            self.store.content_base_url = Some(url.clone());
        }
    }

    fn apply_generate_overrides(&mut self, overrides: &GenerateArgs) {
        if let Some(root) = overrides.output_root.as_ref() {
            self.artifacts.output_root = Some(root.clone());
        }
        if let Some(path) = overrides.mobile_config.as_ref() {
            self.artifacts.mobile_config = Some(path.clone());
        }
        if let Some(path) = overrides.manifest.as_ref() {
            self.artifacts.manifest = Some(path.clone());
        }
        if let Some(path) = overrides.snapshot.as_ref() {
            self.artifacts.snapshot = Some(path.clone());
        }
        if let Some(path) = overrides.constants.as_ref() {
            self.artifacts.constants = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            store,
            cache,
            artifacts,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let store = build_store_settings(store)?;
        let cache = build_cache_settings(cache)?;
        let artifacts = build_artifact_settings(artifacts)?;

        Ok(Self {
            logging,
            store,
            cache,
            artifacts,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let database_url = non_blank(store.database_url);
    let backend_name = match store.backend {
        Some(name) => name.trim().to_ascii_lowercase(),
        None if database_url.is_some() => "postgres".to_string(),
        None => "memory".to_string(),
    };

    let backend = match backend_name.as_str() {
        "memory" => StoreBackend::Memory {
            seed_file: store.seed_file.filter(|path| !path.as_os_str().is_empty()),
        },
        "postgres" => {
            let url = database_url.ok_or_else(|| {
                LoadError::invalid(
                    "store.database_url",
                    "required when the postgres backend is selected",
                )
            })?;
            let max_connections = non_zero_u32(
                store
                    .max_connections
                    .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
                    .into(),
                "store.max_connections",
            )?;
            let acquire_timeout = positive_secs(
                store
                    .acquire_timeout_seconds
                    .unwrap_or(DEFAULT_DB_ACQUIRE_TIMEOUT_SECS),
                "store.acquire_timeout_seconds",
            )?;
            StoreBackend::Postgres {
                url,
                max_connections,
                acquire_timeout,
            }
        }
        other => {
            return Err(LoadError::invalid(
                "store.backend",
                format!("unknown backend `{other}` (expected `memory` or `postgres`)"),
            ));
        }
    };

    let content_base_url = non_blank(store.content_base_url);
    if let Some(url) = content_base_url.as_deref() {
        url::Url::parse(url).map_err(|err| {
            LoadError::invalid("store.content_base_url", format!("invalid url: {err}"))
        })?;
    }

    let connect_timeout = positive_secs(
        store
            .connect_timeout_seconds
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        "store.connect_timeout_seconds",
    )?;

    Ok(StoreSettings {
        backend,
        content_base_url,
        connect_timeout,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let index_ttl = positive_secs(
        cache.index_ttl_seconds.unwrap_or(DEFAULT_INDEX_TTL_SECS),
        "cache.index_ttl_seconds",
    )?;
    let signal_debounce =
        Duration::from_millis(cache.signal_debounce_ms.unwrap_or(DEFAULT_SIGNAL_DEBOUNCE_MS));
    let signal_batch_limit = non_zero_usize(
        cache
            .signal_batch_limit
            .unwrap_or(DEFAULT_SIGNAL_BATCH_LIMIT),
        "cache.signal_batch_limit",
    )?;

    let sentinel_key = match cache.sentinel_key {
        Some(key) if key.trim().is_empty() => {
            return Err(LoadError::invalid(
                "cache.sentinel_key",
                "must not be empty",
            ));
        }
        Some(key) => key.trim().to_string(),
        None => SENTINEL_STORAGE_KEY.to_string(),
    };

    Ok(CacheSettings {
        index_ttl,
        signal_debounce,
        signal_batch_limit,
        sentinel_key,
    })
}

fn build_artifact_settings(artifacts: RawArtifactSettings) -> Result<ArtifactSettings, LoadError> {
    let root = artifacts.output_root.unwrap_or_default();
    let resolve = |value: Option<PathBuf>, default: &str, key: &'static str| {
        let path = value.unwrap_or_else(|| PathBuf::from(default));
        if path.as_os_str().is_empty() {
            return Err(LoadError::invalid(key, "path must not be empty"));
        }
        Ok(join_root(&root, path))
    };

    let paths = ArtifactPaths {
        mobile_config: resolve(
            artifacts.mobile_config,
            DEFAULT_MOBILE_CONFIG_PATH,
            "artifacts.mobile_config",
        )?,
        manifest: resolve(
            artifacts.manifest,
            DEFAULT_MANIFEST_PATH,
            "artifacts.manifest",
        )?,
        snapshot: resolve(
            artifacts.snapshot,
            DEFAULT_SNAPSHOT_PATH,
            "artifacts.snapshot",
        )?,
        constants: resolve(
            artifacts.constants,
            DEFAULT_CONSTANTS_PATH,
            "artifacts.constants",
        )?,
    };

    let short_name_limit = non_zero_usize(
        artifacts
            .short_name_limit
            .unwrap_or(DEFAULT_SHORT_NAME_LIMIT as u64),
        "artifacts.short_name_limit",
    )?;

    Ok(ArtifactSettings {
        paths,
        short_name_limit,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    backend: Option<String>,
    database_url: Option<String>,
    max_connections: Option<u32>,
    acquire_timeout_seconds: Option<u64>,
    seed_file: Option<PathBuf>,
    content_base_url: Option<String>,
    connect_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    index_ttl_seconds: Option<u64>,
    signal_debounce_ms: Option<u64>,
    signal_batch_limit: Option<u64>,
    sentinel_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawArtifactSettings {
    output_root: Option<PathBuf>,
    mobile_config: Option<PathBuf>,
    manifest: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    constants: Option<PathBuf>,
    short_name_limit: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn join_root(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() || root.as_os_str().is_empty() {
        path
    } else {
        root.join(path)
    }
}

fn positive_secs(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
