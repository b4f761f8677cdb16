use std::{future::IntoFuture, process, sync::Arc};

use promocal::{
    application::{
        calendar::CalendarService,
        error::AppError,
        repos::{CalendarRepo, HealthRepo},
        revalidate::{CacheInvalidator, Revalidator},
    },
    cache::{CacheConfig, CalendarDataCache, Clock, SystemClock},
    config,
    infra::{
        cache::ResponseCache,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, HttpState, RouterState},
        telemetry,
    },
};
use tokio::sync::Notify;
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
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let router_state = build_router_state(repositories, &settings);
    serve_http(&settings, router_state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;
    info!("Migrations applied");
    Ok(())
}

async fn connect_pool(settings: &config::Settings) -> Result<sqlx::PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = connect_pool(settings).await?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_router_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> RouterState {
    let calendar_repo: Arc<dyn CalendarRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let cache_config = CacheConfig::from(&settings.cache);
    let data_cache = Arc::new(CalendarDataCache::new(
        calendar_repo.clone(),
        clock.clone(),
        &cache_config,
    ));
    let response_cache = cache_config
        .enable_response_cache
        .then(|| ResponseCache::new(clock.clone(), &cache_config));

    let calendar = Arc::new(CalendarService::new(
        calendar_repo,
        data_cache.clone(),
        clock,
        settings.calendar.timezone,
        settings.calendar.default_background.clone(),
    ));
    let invalidator: Arc<dyn CacheInvalidator> =
        Arc::new(Revalidator::new(data_cache, response_cache.clone()));

    RouterState {
        http: HttpState {
            calendar,
            health: health_repo,
            response_cache,
        },
        admin: AdminState { invalidator },
    }
}

async fn serve_http(
    settings: &config::Settings,
    router_state: RouterState,
) -> Result<(), AppError> {
    let router = http::build_router(router_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "Listening");

    let shutdown = Arc::new(Notify::new());
    let server_shutdown = shutdown.clone();
    let mut server = Box::pin(
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move { server_shutdown.notified().await })
            .into_future(),
    );

    tokio::select! {
        result = &mut server => {
            return result.map_err(server_error);
        }
        () = shutdown_signal() => {
            info!("Shutdown signal received");
            shutdown.notify_one();
        }
    }

    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(result) => result.map_err(server_error),
        Err(_) => {
            warn!(
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "Graceful shutdown timed out"
            );
            Ok(())
        }
    }
}

fn server_error(err: std::io::Error) -> AppError {
    AppError::unexpected(format!("server error: {err}"))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
