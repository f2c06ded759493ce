use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postboard::{
    api,
    config::Settings,
    db,
    jobs::{ImageCleanupJob, PublishScheduledJob, Schedule, Scheduler, SessionCleanupJob},
    service::ServiceContext,
};

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });
    let gc_time = settings.jobs.gc_time()?;
    let publish_interval = settings.jobs.publish_check_interval()?;

    tracing::info!("Starting Postboard server on {}:{}", settings.server.host, settings.server.port);

    // Initialize database
    let db_pool = db::connect(&settings.database).await?;
    db::run_migrations(&db_pool).await?;

    tokio::fs::create_dir_all(&settings.uploads.dir).await?;

    let service_context = Arc::new(ServiceContext::new(db_pool.clone(), &settings));

    let generated = service_context.admin_service
        .ensure_super_admin(
            &settings.auth.bootstrap_username,
            settings.auth.bootstrap_password.as_deref(),
        )
        .await?;
    if let Some(password) = generated {
        tracing::warn!(
            "Created super administrator '{}' with generated password: {}. Change it after first login.",
            settings.auth.bootstrap_username,
            password
        );
    }

    // Background jobs
    let mut scheduler = Scheduler::new();
    scheduler.spawn(
        Arc::new(PublishScheduledJob::new(service_context.publication_tracker.clone())),
        Schedule::Every(publish_interval),
        true,
    );
    scheduler.spawn(
        Arc::new(ImageCleanupJob::new(service_context.image_service.clone())),
        Schedule::DailyAt(gc_time),
        false,
    );
    scheduler.spawn(
        Arc::new(SessionCleanupJob::new(service_context.auth_service.clone())),
        Schedule::Every(SESSION_CLEANUP_INTERVAL),
        true,
    );

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    db_pool.close().await;
    tracing::info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
