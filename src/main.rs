use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use medee::{
    application::{
        assets::{AssetService, AssetUrls},
        catalog::{CatalogService, RenderContext},
        content::ContentStore,
        error::AppError,
        fixture::FixtureSource,
        stores::{KvStore, ObjectStore},
    },
    config,
    domain::keys::KeyScheme,
    infra::{
        cloudflare::{CloudflareKv, CloudflareR2, UnavailableObjectStore},
        error::InfraError,
        export::SiteExporter,
        filesystem::FilesystemObjectStore,
        http::{self, ApiState, HttpState, LocalAssets},
        memory::MemoryObjectStore,
        telemetry,
    },
};
use tokio::{sync::watch, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Export(args) => run_export(settings, args).await,
        config::Command::StaticPaths => run_static_paths(settings).await,
        config::Command::MigrateKeys(args) => run_migrate_keys(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let content = Arc::new(build_content_store(&settings)?);
    let urls = asset_urls(&settings);
    let (object_store, local_assets) = build_object_store(&settings)?;
    let assets = Arc::new(AssetService::new(
        object_store,
        Some(settings.assets.key_prefix.clone()),
        urls.clone(),
    ));

    info!(
        target = "medee::serve",
        content_source = content.source_label(),
        asset_backend = ?settings.assets.backend,
        "starting servers"
    );

    let http_state = HttpState {
        catalog: Arc::new(CatalogService::new(content.clone())),
        assets: urls,
        local_assets,
    };
    let api_state = ApiState {
        content,
        assets,
        token_secret: settings.admin.token_secret.as_deref().map(Arc::from),
    };

    serve_http(&settings, http_state, api_state).await
}

async fn run_export(settings: config::Settings, args: config::ExportArgs) -> Result<(), AppError> {
    let content = Arc::new(build_export_content_store(&settings)?);
    let catalog = CatalogService::new(content.clone());
    let urls = asset_urls(&settings);

    info!(
        target = "medee::export",
        out_dir = %args.out_dir.display(),
        content_source = content.source_label(),
        "starting export"
    );

    let report = SiteExporter::new(&catalog, &urls, args.out_dir.clone())
        .export()
        .await?;

    info!(
        target = "medee::export",
        files = report.files.len(),
        skipped = report.skipped.len(),
        "export completed"
    );
    Ok(())
}

async fn run_static_paths(settings: config::Settings) -> Result<(), AppError> {
    let content = Arc::new(build_content_store(&settings)?);
    let catalog = CatalogService::new(content);
    let ctx = RenderContext::new();

    for path in catalog.static_paths(&ctx).await? {
        println!("{path}");
    }
    Ok(())
}

async fn run_migrate_keys(
    settings: config::Settings,
    args: config::MigrateKeysArgs,
) -> Result<(), AppError> {
    let content = build_content_store(&settings)?;
    let report = content.migrate_legacy_keys(args.dry_run).await?;

    for (from, to) in &report.moved {
        info!(
            target = "medee::migrate_keys",
            from = %from,
            to = %to,
            dry_run = report.dry_run,
            "legacy key migrated"
        );
    }
    for key in &report.conflicts {
        warn!(
            target = "medee::migrate_keys",
            key = %key,
            "canonical key already exists; legacy key left in place"
        );
    }
    for key in &report.invalid {
        warn!(
            target = "medee::migrate_keys",
            key = %key,
            "value is not a post; key left in place"
        );
    }

    info!(
        target = "medee::migrate_keys",
        moved = report.moved.len(),
        conflicts = report.conflicts.len(),
        invalid = report.invalid.len(),
        dry_run = report.dry_run,
        "key migration finished"
    );
    Ok(())
}

fn key_scheme(settings: &config::Settings) -> KeyScheme {
    KeyScheme::new(
        settings.kv.key_prefix.clone(),
        settings.kv.legacy_key_fallback,
    )
}

fn remote_content_store(
    settings: &config::Settings,
    credentials: config::KvCredentials,
) -> Result<ContentStore, AppError> {
    let kv: Arc<dyn KvStore> = Arc::new(CloudflareKv::new(credentials)?);
    Ok(ContentStore::remote(kv, key_scheme(settings))
        .with_fetch_concurrency(settings.kv.fetch_concurrency.get()))
}

fn fixture_content_store(settings: &config::Settings) -> Result<ContentStore, AppError> {
    let source = FixtureSource::load(&settings.fixture.path)?;
    Ok(ContentStore::fixture(source, key_scheme(settings)))
}

/// Remote store when credentials are configured, else the local fixture,
/// else a store that reports the missing configuration on every call.
fn build_content_store(settings: &config::Settings) -> Result<ContentStore, AppError> {
    if let Some(credentials) = settings.kv.credentials() {
        return remote_content_store(settings, credentials);
    }

    if settings.fixture.path.is_file() {
        warn!(
            target = "medee::content",
            fixture = %settings.fixture.path.display(),
            "key-value credentials missing; serving posts from the local fixture"
        );
        return fixture_content_store(settings);
    }

    warn!(
        target = "medee::content",
        "key-value credentials missing and no fixture found; content operations will fail"
    );
    Ok(ContentStore::unconfigured(
        "key-value credentials are not configured and no fixture is available",
    ))
}

fn build_export_content_store(settings: &config::Settings) -> Result<ContentStore, AppError> {
    let fixture_available = settings.fixture.path.is_file();

    if !settings.build.store_access {
        if !fixture_available {
            return Err(InfraError::configuration(format!(
                "store access is disabled and no fixture exists at {}",
                settings.fixture.path.display()
            ))
            .into());
        }
        return fixture_content_store(settings);
    }

    match settings.kv.credentials() {
        Some(credentials) => remote_content_store(settings, credentials),
        None if fixture_available => {
            warn!(
                target = "medee::export",
                fixture = %settings.fixture.path.display(),
                "key-value credentials missing; exporting from the local fixture"
            );
            fixture_content_store(settings)
        }
        None => Err(InfraError::configuration(
            "key-value credentials are required for export (set kv.account_id, kv.namespace_id and CLOUDFLARE_API_TOKEN)",
        )
        .into()),
    }
}

fn asset_urls(settings: &config::Settings) -> AssetUrls {
    AssetUrls::new(
        settings.assets.public_base_url.clone(),
        settings.assets.absolute_urls,
    )
}

fn build_object_store(
    settings: &config::Settings,
) -> Result<(Arc<dyn ObjectStore>, Option<LocalAssets>), AppError> {
    match settings.assets.backend {
        config::AssetBackend::Cloudflare => {
            let store: Arc<dyn ObjectStore> = match settings.assets.r2_credentials() {
                Some(credentials) => Arc::new(CloudflareR2::new(credentials)?),
                None => {
                    warn!(
                        target = "medee::assets",
                        "object store credentials missing; image uploads are disabled"
                    );
                    Arc::new(UnavailableObjectStore)
                }
            };
            Ok((store, None))
        }
        config::AssetBackend::Filesystem => {
            let local = Arc::new(
                FilesystemObjectStore::new(settings.assets.directory.clone())
                    .map_err(InfraError::from)?,
            );
            let store: Arc<dyn ObjectStore> = local.clone();
            Ok((
                store,
                Some(LocalAssets {
                    prefix: settings.assets.key_prefix.clone(),
                    store: local,
                }),
            ))
        }
        config::AssetBackend::Memory => {
            let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
            Ok((store, None))
        }
    }
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    api_state: ApiState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state);
    let upload_body_limit =
        usize::try_from(settings.uploads.max_request_bytes.get()).unwrap_or(usize::MAX);
    let api_router = http::build_api_router(api_state, upload_body_limit);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "medee::serve",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(target = "medee::serve", "shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(shutdown_requested(shutdown_rx.clone()));
    let admin_server = axum::serve(admin_listener, api_router.into_make_service())
        .with_graceful_shutdown(shutdown_requested(shutdown_rx.clone()));

    let servers = async {
        try_join!(public_server.into_future(), admin_server.into_future())
            .map(|_| ())
            .map_err(|err| AppError::unexpected(format!("server error: {err}")))
    };

    tokio::select! {
        result = servers => result,
        () = drain_deadline(shutdown_rx, settings.server.graceful_shutdown) => {
            warn!(
                target = "medee::serve",
                "graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

async fn shutdown_requested(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|requested| *requested).await;
}

/// Resolves once shutdown was requested and `grace` has elapsed since.
async fn drain_deadline(mut rx: watch::Receiver<bool>, grace: Duration) {
    if rx.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(grace).await;
}
