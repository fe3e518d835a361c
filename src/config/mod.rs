//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::content::DEFAULT_FETCH_CONCURRENCY;
use crate::domain::assets::DEFAULT_ASSET_PREFIX;
use crate::domain::keys::DEFAULT_POST_KEY_PREFIX;

mod cli;

pub use cli::{CliArgs, Command, ExportArgs, MigrateKeysArgs, ServeArgs, ServeOverrides, StoreOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "medee";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_ADMIN_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 3000;
const DEFAULT_ADMIN_PORT: u16 = 3001;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_ASSET_DIR: &str = "uploads";
const DEFAULT_FIXTURE_PATH: &str = "data/posts.json";
pub const DEFAULT_CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";
/// Value shipped in sample environment files; treated as "no token".
pub const PLACEHOLDER_API_TOKEN: &str = "YOUR_CLOUDFLARE_API_TOKEN_HERE";

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub admin: AdminSettings,
    pub kv: KvSettings,
    pub assets: AssetSettings,
    pub uploads: UploadSettings,
    pub fixture: FixtureSettings,
    pub build: BuildSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub graceful_shutdown: Duration,
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

#[derive(Debug, Clone, Default)]
pub struct AdminSettings {
    /// `None` makes every admin request fail as misconfigured.
    pub token_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct KvSettings {
    pub api_base: Url,
    pub account_id: Option<String>,
    pub namespace_id: Option<String>,
    pub api_token: Option<String>,
    pub key_prefix: String,
    pub legacy_key_fallback: bool,
    pub fetch_concurrency: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct KvCredentials {
    pub api_base: Url,
    pub account_id: String,
    pub namespace_id: String,
    pub api_token: String,
}

impl KvSettings {
    /// Complete credentials, or `None` when the token is absent.
    pub fn credentials(&self) -> Option<KvCredentials> {
        Some(KvCredentials {
            api_base: self.api_base.clone(),
            account_id: self.account_id.clone()?,
            namespace_id: self.namespace_id.clone()?,
            api_token: self.api_token.clone()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetBackend {
    Cloudflare,
    Filesystem,
    Memory,
}

impl FromStr for AssetBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cloudflare" | "r2" => Ok(Self::Cloudflare),
            "filesystem" | "fs" => Ok(Self::Filesystem),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown asset backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssetSettings {
    pub backend: AssetBackend,
    pub api_base: Url,
    pub account_id: Option<String>,
    pub bucket: Option<String>,
    pub api_token: Option<String>,
    pub directory: PathBuf,
    pub key_prefix: String,
    pub public_base_url: Option<String>,
    pub absolute_urls: bool,
}

#[derive(Debug, Clone)]
pub struct R2Credentials {
    pub api_base: Url,
    pub account_id: String,
    pub bucket: String,
    pub api_token: String,
}

impl AssetSettings {
    pub fn r2_credentials(&self) -> Option<R2Credentials> {
        Some(R2Credentials {
            api_base: self.api_base.clone(),
            account_id: self.account_id.clone()?,
            bucket: self.bucket.clone()?,
            api_token: self.api_token.clone()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub max_request_bytes: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct FixtureSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Whether exports may read the remote store.
    pub store_access: bool,
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

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("MEDEE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_store_overrides(&cli.stores);
    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Export(args)) => {
            if let Some(store_access) = args.store_access {
                raw.build.store_access = Some(store_access);
            }
        }
        Some(Command::StaticPaths) | Some(Command::MigrateKeys(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    admin: RawAdminSettings,
    kv: RawKvSettings,
    assets: RawAssetSettings,
    uploads: RawUploadSettings,
    fixture: RawFixtureSettings,
    build: RawBuildSettings,
}

impl RawSettings {
    fn apply_store_overrides(&mut self, overrides: &StoreOverrides) {
        if let Some(token) = overrides.kv_api_token.as_ref() {
            self.kv.api_token = Some(token.clone());
        }
        if let Some(secret) = overrides.admin_token_secret.as_ref() {
            self.admin.token_secret = Some(secret.clone());
        }
        if let Some(base) = overrides.assets_public_base_url.as_ref() {
            self.assets.public_base_url = Some(base.clone());
        }
        if let Some(path) = overrides.fixture_path.as_ref() {
            self.fixture.path = Some(path.clone());
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(host) = overrides.server_admin_host.as_ref() {
            self.server.admin_host = Some(host.clone());
        }
        if let Some(port) = overrides.public_port {
            self.server.public_port = Some(port);
        }
        if let Some(port) = overrides.admin_port {
            self.server.admin_port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(backend) = overrides.assets_backend.as_ref() {
            self.assets.backend = Some(backend.clone());
        }
        if let Some(directory) = overrides.assets_directory.as_ref() {
            self.assets.directory = Some(directory.clone());
        }
        if let Some(limit) = overrides.uploads_max_request_bytes {
            self.uploads.max_request_bytes = Some(limit);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            admin,
            kv,
            assets,
            uploads,
            fixture,
            build,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let admin = AdminSettings {
            token_secret: non_empty(admin.token_secret),
        };
        let kv = build_kv_settings(kv)?;
        let assets = build_asset_settings(assets, &kv)?;
        let uploads = build_upload_settings(uploads)?;
        let fixture = FixtureSettings {
            path: fixture
                .path
                .filter(|path| !path.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FIXTURE_PATH)),
        };
        let build = BuildSettings {
            store_access: build.store_access.unwrap_or(true),
        };

        Ok(Self {
            server,
            logging,
            admin,
            kv,
            assets,
            uploads,
            fixture,
            build,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let admin_host = server
        .admin_host
        .unwrap_or_else(|| DEFAULT_ADMIN_HOST.to_string());

    let public_port = server.public_port.unwrap_or(DEFAULT_PUBLIC_PORT);
    if public_port == 0 {
        return Err(LoadError::invalid(
            "server.public_port",
            "port must be greater than zero",
        ));
    }

    let admin_port = server.admin_port.unwrap_or(DEFAULT_ADMIN_PORT);
    if admin_port == 0 {
        return Err(LoadError::invalid(
            "server.admin_port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, public_port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;
    let admin_addr = parse_socket_addr(&admin_host, admin_port)
        .map_err(|reason| LoadError::invalid("server.admin_addr", reason))?;
    if public_addr == admin_addr {
        return Err(LoadError::invalid(
            "server.admin_port",
            "admin listener must not share the public address",
        ));
    }

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        public_addr,
        admin_addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
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

fn build_kv_settings(kv: RawKvSettings) -> Result<KvSettings, LoadError> {
    let api_base = parse_api_base(kv.api_base, "kv.api_base")?;
    let api_token = non_empty(kv.api_token).filter(|token| token != PLACEHOLDER_API_TOKEN);
    let account_id = non_empty(kv.account_id);
    let namespace_id = non_empty(kv.namespace_id);

    if api_token.is_some() {
        if account_id.is_none() {
            return Err(LoadError::invalid(
                "kv.account_id",
                "required when an api token is configured",
            ));
        }
        if namespace_id.is_none() {
            return Err(LoadError::invalid(
                "kv.namespace_id",
                "required when an api token is configured",
            ));
        }
    }

    let key_prefix = kv
        .key_prefix
        .unwrap_or_else(|| DEFAULT_POST_KEY_PREFIX.to_string());
    if key_prefix.contains('/') {
        return Err(LoadError::invalid("kv.key_prefix", "must not contain `/`"));
    }

    let concurrency = kv.fetch_concurrency.unwrap_or(DEFAULT_FETCH_CONCURRENCY);
    let fetch_concurrency = NonZeroUsize::new(concurrency)
        .ok_or_else(|| LoadError::invalid("kv.fetch_concurrency", "must be greater than zero"))?;

    Ok(KvSettings {
        api_base,
        account_id,
        namespace_id,
        api_token,
        key_prefix,
        legacy_key_fallback: kv.legacy_key_fallback.unwrap_or(true),
        fetch_concurrency,
    })
}

fn build_asset_settings(
    assets: RawAssetSettings,
    kv: &KvSettings,
) -> Result<AssetSettings, LoadError> {
    let backend = match assets.backend.as_deref() {
        Some(value) => AssetBackend::from_str(value)
            .map_err(|reason| LoadError::invalid("assets.backend", reason))?,
        None => AssetBackend::Cloudflare,
    };
    let api_base = parse_api_base(assets.api_base, "assets.api_base")?;
    let api_token = non_empty(assets.api_token)
        .filter(|token| token != PLACEHOLDER_API_TOKEN)
        .or_else(|| kv.api_token.clone());

    let public_base_url = non_empty(assets.public_base_url);
    if let Some(base) = public_base_url.as_deref() {
        Url::parse(base).map_err(|err| {
            LoadError::invalid("assets.public_base_url", format!("invalid url: {err}"))
        })?;
    }

    let absolute_urls = assets.absolute_urls.unwrap_or(false);
    if absolute_urls && public_base_url.is_none() {
        return Err(LoadError::invalid(
            "assets.absolute_urls",
            "requires assets.public_base_url",
        ));
    }

    Ok(AssetSettings {
        backend,
        api_base,
        account_id: non_empty(assets.account_id).or_else(|| kv.account_id.clone()),
        bucket: non_empty(assets.bucket),
        api_token,
        directory: assets
            .directory
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSET_DIR)),
        key_prefix: non_empty(assets.key_prefix)
            .unwrap_or_else(|| DEFAULT_ASSET_PREFIX.to_string()),
        public_base_url,
        absolute_urls,
    })
}

fn build_upload_settings(uploads: RawUploadSettings) -> Result<UploadSettings, LoadError> {
    let max_request_bytes_value = uploads
        .max_request_bytes
        .unwrap_or(DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES);
    let max_request_bytes = NonZeroU64::new(max_request_bytes_value).ok_or_else(|| {
        LoadError::invalid("uploads.max_request_bytes", "must be greater than zero")
    })?;
    usize::try_from(max_request_bytes_value).map_err(|_| {
        LoadError::invalid(
            "uploads.max_request_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(UploadSettings { max_request_bytes })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    admin_host: Option<String>,
    public_port: Option<u16>,
    admin_port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAdminSettings {
    token_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawKvSettings {
    api_base: Option<String>,
    account_id: Option<String>,
    namespace_id: Option<String>,
    api_token: Option<String>,
    key_prefix: Option<String>,
    legacy_key_fallback: Option<bool>,
    fetch_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAssetSettings {
    backend: Option<String>,
    api_base: Option<String>,
    account_id: Option<String>,
    bucket: Option<String>,
    api_token: Option<String>,
    directory: Option<PathBuf>,
    key_prefix: Option<String>,
    public_base_url: Option<String>,
    absolute_urls: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUploadSettings {
    max_request_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFixtureSettings {
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBuildSettings {
    store_access: Option<bool>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_api_base(value: Option<String>, key: &'static str) -> Result<Url, LoadError> {
    let raw = non_empty(value).unwrap_or_else(|| DEFAULT_CLOUDFLARE_API_BASE.to_string());
    Url::parse(raw.trim_end_matches('/'))
        .map_err(|err| LoadError::invalid(key, format!("invalid url: {err}")))
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
