use anyhow::Context;
use document_approval::config::ServiceConfig;
use document_approval::worker::Worker;
use document_approval::{BatchProcessor, Store};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "document_approval=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ServiceConfig::load(&path)?,
        None => {
            tracing::info!("No config file given, using defaults");
            ServiceConfig::default()
        }
    };

    let store = Store::open(&config.storage.path).with_context(|| {
        format!(
            "failed to open document store at {}",
            config.storage.path.display()
        )
    })?;
    let store = Arc::new(store);
    tracing::info!(
        path = %config.storage.path.display(),
        documents = store.document_count(),
        "Document store opened"
    );

    let processor = Arc::new(BatchProcessor::new(Arc::clone(&store)));
    let shutdown = CancellationToken::new();

    let handles = if config.worker.enabled {
        Arc::new(Worker::new(processor, config.worker.clone())).spawn(shutdown.clone())
    } else {
        tracing::info!("Workers disabled");
        vec![]
    };

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown requested");

    shutdown.cancel();
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Worker exited abnormally");
        }
    }

    store.flush().context("failed to flush document store")?;
    tracing::info!("Document store flushed, exiting");

    Ok(())
}
