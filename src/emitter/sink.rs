//! Event sinks

use super::OhlcEvent;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Event sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("event sink is closed")]
    Closed,
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write event: {0}")]
    Io(#[from] std::io::Error),
    #[error("event writer task failed: {0}")]
    Writer(String),
}

/// Downstream consumer of candle events
///
/// `publish` resolves once the sink has accepted the event, so a caller that
/// checkpoints after publishing never skips an event the sink refused.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: OhlcEvent) -> Result<(), SinkError>;

    /// Flush everything accepted so far; later publishes may fail
    async fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes one JSON document per line to stdout
///
/// Writes go through tokio's stdout handle, which runs them on the blocking
/// pool rather than on the async worker.
pub struct StdoutSink {
    out: Mutex<tokio::io::Stdout>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            out: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for StdoutSink {
    async fn publish(&self, event: OhlcEvent) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');

        let mut out = self.out.lock().await;
        out.write_all(&line).await?;
        out.flush().await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.out.lock().await.flush().await?;
        Ok(())
    }
}

/// Forwards events over an in-process channel
///
/// Events published after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OhlcEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<OhlcEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn publish(&self, event: OhlcEvent) -> Result<(), SinkError> {
        if self.tx.send(event).is_err() {
            tracing::debug!("Event receiver dropped, discarding event");
        }
        Ok(())
    }
}

/// Appends JSON lines to a file from a background writer task
///
/// `publish` waits for queue space instead of dropping events. `close` stops
/// the queue, waits for the writer to drain it and flushes the file.
pub struct FileSink {
    path: PathBuf,
    tx: RwLock<Option<mpsc::Sender<OhlcEvent>>>,
    writer: Mutex<Option<JoinHandle<std::io::Result<()>>>>,
}

impl FileSink {
    /// Open (or create) `path` for appending and start the writer task
    pub async fn open(path: impl AsRef<Path>, buffer_size: usize) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            let result = Self::run_writer(rx, file).await;
            if let Err(e) = &result {
                tracing::error!(
                    error = %e,
                    path = %writer_path.display(),
                    "Event file writer failed"
                );
            }
            result
        });

        tracing::info!(path = %path.display(), "Writing events to file");
        Ok(Self {
            path,
            tx: RwLock::new(Some(tx)),
            writer: Mutex::new(Some(writer)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain the queue, flushing after each burst and once more at the end
    async fn run_writer(
        mut rx: mpsc::Receiver<OhlcEvent>,
        file: tokio::fs::File,
    ) -> std::io::Result<()> {
        let mut writer = BufWriter::new(file);

        while let Some(event) = rx.recv().await {
            Self::write_event(&mut writer, &event).await?;
            while let Ok(event) = rx.try_recv() {
                Self::write_event(&mut writer, &event).await?;
            }
            writer.flush().await?;
        }

        writer.flush().await
    }

    async fn write_event(
        writer: &mut BufWriter<tokio::fs::File>,
        event: &OhlcEvent,
    ) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        writer.write_all(&line).await
    }
}

#[async_trait]
impl EventSink for FileSink {
    async fn publish(&self, event: OhlcEvent) -> Result<(), SinkError> {
        let tx = self.tx.read().await.clone().ok_or(SinkError::Closed)?;
        tx.send(event).await.map_err(|_| {
            tracing::error!(path = %self.path.display(), "Event file writer stopped");
            SinkError::Closed
        })
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.tx.write().await.take();

        let writer = self.writer.lock().await.take();
        if let Some(writer) = writer {
            writer
                .await
                .map_err(|e| SinkError::Writer(e.to_string()))??;
            tracing::info!(path = %self.path.display(), "Event file closed");
        }
        Ok(())
    }
}
