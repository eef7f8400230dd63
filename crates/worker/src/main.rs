//! Worker binary: claims generation jobs and runs them to a terminal
//! state, alongside the stuck-job monitor and the cleanup sweeper.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelforge_events::EventBus;
use reelforge_pipeline::cleanup::CleanupSweeper;
use reelforge_pipeline::monitor::StuckJobMonitor;
use reelforge_pipeline::PipelineContext;
use reelforge_providers::registry::ProviderRegistry;

mod dispatcher;

use dispatcher::Dispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reelforge_worker=debug,reelforge_pipeline=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let pool = reelforge_db::connect(&database_url).await?;

    let storage: Arc<dyn reelforge_storage::ObjectStore> =
        reelforge_storage::from_env().await.map_err(|e| anyhow::anyhow!(e))?.into();
    let ctx = PipelineContext {
        pool: pool.clone(),
        providers: Arc::new(ProviderRegistry::from_env()),
        storage,
        bus: Arc::new(EventBus::default()),
    };

    let worker_name = std::env::var("WORKER_NAME")
        .unwrap_or_else(|_| format!("worker-{}", uuid::Uuid::new_v4()));

    let cancel = CancellationToken::new();

    // Event logger: structured trail of everything the pipeline publishes.
    let mut events = ctx.bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::info!(
                    event_type = %event.event_type,
                    job_id = event.job_id,
                    "Job event",
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Event logger lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let monitor = StuckJobMonitor::new(pool.clone(), Arc::clone(&ctx.bus));
    let monitor_cancel = cancel.clone();
    let monitor_task = tokio::spawn(async move { monitor.run(monitor_cancel).await });

    let sweeper = CleanupSweeper::new(pool.clone());
    let sweeper_cancel = cancel.clone();
    let sweeper_task = tokio::spawn(async move { sweeper.run(sweeper_cancel).await });

    let dispatcher = Dispatcher::new(ctx, worker_name);
    let dispatcher_cancel = cancel.clone();
    let dispatcher_task = tokio::spawn(async move { dispatcher.run(dispatcher_cancel).await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received; draining");
    cancel.cancel();

    let _ = tokio::join!(dispatcher_task, monitor_task, sweeper_task);
    Ok(())
}
