use std::{process, sync::Arc};

use edgeblock::{
    application::{blocks::BlockLoader, context::DefaultContextManager, error::AppError},
    cache::{CacheKeySet, FragmentCache, SsiError, SsiFragmentCache, TokenSigner},
    config::{self, FragmentArgs, Settings},
    infra::{
        catalog::BlockCatalog,
        error::InfraError,
        http::{self, SsiHttpState},
        routes::RouteTable,
        telemetry,
    },
    presentation::blocks::HtmlBlockRenderer,
};
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

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    match command {
        config::Command::Serve(_) => {
            telemetry::init(&settings.logging)?;
            run_serve(settings).await
        }
        config::Command::Include(args) => run_include(&settings, &args),
        config::Command::Sign(args) => run_sign(&settings, &args),
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let catalog = load_catalog(&settings).await?;
    let cache = build_fragment_cache(&settings, Arc::new(catalog))?;

    let state = SsiHttpState {
        cache: Arc::new(cache),
        cache_control: settings.ssi.render_cache_control.clone(),
    };
    let router = http::build_router(state, &settings.ssi.route_prefix);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "edgeblock::serve",
        addr = %settings.server.addr,
        route_prefix = %settings.ssi.route_prefix,
        "fragment service listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "edgeblock::serve", "fragment service stopped");
    Ok(())
}

fn run_include(settings: &Settings, args: &FragmentArgs) -> Result<(), AppError> {
    let cache = build_fragment_cache(settings, Arc::new(BlockCatalog::new()))?;
    let keys = CacheKeySet::for_block(args.block_id.as_str(), args.updated_at.as_str());
    let element = cache.get(&keys)?;
    println!("{}", element.data().content());
    Ok(())
}

fn run_sign(settings: &Settings, args: &FragmentArgs) -> Result<(), AppError> {
    let signer = build_signer(settings)?;
    let keys = CacheKeySet::for_block(args.block_id.as_str(), args.updated_at.as_str());
    let token = signer.sign(&keys).map_err(SsiError::from)?;
    println!("{token}");
    Ok(())
}

async fn load_catalog(settings: &Settings) -> Result<BlockCatalog, AppError> {
    match settings.blocks.catalog.as_deref() {
        Some(path) => Ok(BlockCatalog::from_path(path).await?),
        None => {
            warn!(
                target = "edgeblock::catalog",
                "no block catalog configured, every render request will miss"
            );
            Ok(BlockCatalog::new())
        }
    }
}

fn build_signer(settings: &Settings) -> Result<TokenSigner, AppError> {
    TokenSigner::new(settings.ssi.secret.expose())
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))
}

fn build_fragment_cache(
    settings: &Settings,
    loader: Arc<dyn BlockLoader>,
) -> Result<SsiFragmentCache, AppError> {
    let signer = build_signer(settings)?;
    let routes = RouteTable::for_ssi(&settings.ssi.route_prefix).map_err(SsiError::from)?;

    Ok(SsiFragmentCache::new(
        signer,
        Arc::new(routes),
        Arc::new(HtmlBlockRenderer::new()),
        loader,
        Arc::new(DefaultContextManager::new()),
    ))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target = "edgeblock::serve", "shutdown signal received");
}
