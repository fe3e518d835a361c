use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the medee binary.
#[derive(Debug, Parser)]
#[command(name = "medee", version, about = "Medee blog server and static exporter")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MEDEE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub stores: StoreOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the public site and the admin API.
    Serve(Box<ServeArgs>),
    /// Render the public site into a directory.
    Export(ExportArgs),
    /// Print every post path variant the static export generates.
    #[command(name = "static-paths")]
    StaticPaths,
    /// Move posts stored under bare slugs to the `post:` namespace.
    #[command(name = "migrate-keys")]
    MigrateKeys(MigrateKeysArgs),
}

/// Store credentials. The plain environment names are accepted for
/// compatibility with existing deployments.
#[derive(Debug, Args, Default, Clone)]
pub struct StoreOverrides {
    /// Cloudflare API token used for the key-value namespace.
    #[arg(
        long = "kv-api-token",
        env = "CLOUDFLARE_API_TOKEN",
        value_name = "TOKEN",
        global = true,
        hide_env_values = true
    )]
    pub kv_api_token: Option<String>,

    /// Shared secret for the admin API.
    #[arg(
        long = "admin-token-secret",
        env = "ADMIN_TOKEN_SECRET",
        value_name = "SECRET",
        global = true,
        hide_env_values = true
    )]
    pub admin_token_secret: Option<String>,

    /// Public base URL of the asset bucket.
    #[arg(
        long = "assets-public-base-url",
        env = "R2_PUBLIC_URL",
        value_name = "URL",
        global = true
    )]
    pub assets_public_base_url: Option<String>,

    /// Override the local fixture path.
    #[arg(
        long = "fixture-path",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub fixture_path: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST")]
    pub server_admin_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the asset backend (cloudflare|filesystem|memory).
    #[arg(long = "assets-backend", value_name = "BACKEND")]
    pub assets_backend: Option<String>,

    /// Override the directory used by the filesystem asset backend.
    #[arg(long = "assets-directory", value_name = "PATH")]
    pub assets_directory: Option<PathBuf>,

    /// Override the maximum request size for admin requests in bytes.
    #[arg(long = "uploads-max-request-bytes", value_name = "BYTES")]
    pub uploads_max_request_bytes: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    /// Output directory; created when missing.
    #[arg(value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub out_dir: PathBuf,

    /// Allow the export to read the remote key-value store.
    #[arg(
        long = "store-access",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub store_access: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateKeysArgs {
    /// Report what would move without writing.
    #[arg(long = "dry-run", action = clap::ArgAction::SetTrue)]
    pub dry_run: bool,
}
