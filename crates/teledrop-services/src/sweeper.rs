use std::time::Duration;
use teledrop_storage::ChunkStore;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Background task that purges expired chunks of abandoned upload sessions
pub struct ChunkSweeper {
    shutdown_tx: mpsc::Sender<()>,
}

impl ChunkSweeper {
    pub fn spawn(chunks: ChunkStore, sweep_interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::worker_loop(chunks, sweep_interval, shutdown_rx).await;
        });

        Self { shutdown_tx }
    }

    pub async fn shutdown(&self) {
        if self.shutdown_tx.send(()).await.is_err() {
            tracing::debug!("Chunk sweeper already stopped");
        }
    }

    async fn worker_loop(
        chunks: ChunkStore,
        sweep_interval: Duration,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut ticker = interval(sweep_interval);

        tracing::info!(
            interval_seconds = sweep_interval.as_secs(),
            "Chunk sweeper started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    Self::sweep_once(&chunks).await;
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Chunk sweeper shutting down");
                    break;
                }
            }
        }
    }

    async fn sweep_once(chunks: &ChunkStore) -> usize {
        match chunks.purge_expired().await {
            Ok(0) => 0,
            Ok(purged) => {
                tracing::info!(purged, "Purged expired chunks");
                purged
            }
            Err(e) => {
                tracing::error!(error = %e, "Error purging expired chunks");
                0
            }
        }
    }
}
