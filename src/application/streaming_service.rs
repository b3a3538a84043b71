// Streaming service - Push updates for a live dashboard session
use crate::application::snapshot_service::SnapshotService;
use crate::domain::snapshot::Snapshot;
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Connected { timestamp: String },
    Snapshot(Snapshot),
    Error { message: String },
    /// Ask the client to reopen the stream after the given delay.
    Reconnect(Duration),
}

#[derive(Debug, Clone, Copy)]
pub struct StreamSettings {
    pub poll_interval: Duration,
    /// Must stay below the hosting server's own connection timeout.
    pub session_max: Duration,
    pub reconnect_after: Duration,
    pub error_retry: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Closed(CloseReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    SessionCap,
    ClientGone,
    Cancelled,
    Failed,
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn next_snapshot(&self) -> anyhow::Result<Snapshot>;
}

#[async_trait]
impl SnapshotSource for SnapshotService {
    async fn next_snapshot(&self) -> anyhow::Result<Snapshot> {
        // A panic while building must end the session, not the server.
        // Dropping the future (session closed mid-build) aborts the build.
        let service = self.clone();
        AbortOnDropHandle::new(tokio::spawn(async move { service.build_snapshot().await }))
            .await
            .context("snapshot build aborted")
    }
}

pub struct StreamSession {
    pub events: mpsc::Receiver<StreamEvent>,
    pub task: JoinHandle<CloseReason>,
}

#[derive(Clone)]
pub struct StreamingService {
    source: Arc<dyn SnapshotSource>,
    settings: StreamSettings,
}

impl StreamingService {
    pub fn new(source: Arc<dyn SnapshotSource>, settings: StreamSettings) -> Self {
        Self { source, settings }
    }

    /// Start a polling session. It ends when the receiver is dropped,
    /// `cancel` fires, the session cap is reached, or a snapshot cannot be
    /// built.
    pub fn open(&self, cancel: CancellationToken) -> StreamSession {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let session = Session {
            source: self.source.clone(),
            settings: self.settings,
            tx,
            cancel,
            started: Instant::now(),
            last_sent: None,
        };

        StreamSession {
            events: rx,
            task: tokio::spawn(session.run()),
        }
    }
}

struct Session {
    source: Arc<dyn SnapshotSource>,
    settings: StreamSettings,
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
    started: Instant,
    last_sent: Option<i64>,
}

impl Session {
    async fn run(mut self) -> CloseReason {
        tracing::debug!("Stream session opened");
        let greeting = StreamEvent::Connected {
            timestamp: Utc::now().to_rfc3339(),
        };

        let reason = if self.tx.send(greeting).await.is_err() {
            CloseReason::ClientGone
        } else {
            loop {
                match self.tick().await {
                    SessionState::Connected => continue,
                    SessionState::Closed(reason) => break reason,
                }
            }
        };

        tracing::debug!("Stream session closed: {:?}", reason);
        reason
    }

    async fn tick(&mut self) -> SessionState {
        if self.started.elapsed() >= self.settings.session_max {
            let _ = self
                .tx
                .send(StreamEvent::Reconnect(self.settings.reconnect_after))
                .await;
            return SessionState::Closed(CloseReason::SessionCap);
        }

        let built = tokio::select! {
            _ = self.cancel.cancelled() => return SessionState::Closed(CloseReason::Cancelled),
            _ = self.tx.closed() => return SessionState::Closed(CloseReason::ClientGone),
            built = self.source.next_snapshot() => built,
        };

        match built {
            Ok(snapshot) => {
                if self.last_sent.is_none_or(|last| snapshot.timestamp > last) {
                    self.last_sent = Some(snapshot.timestamp);
                    if self.tx.send(StreamEvent::Snapshot(snapshot)).await.is_err() {
                        return SessionState::Closed(CloseReason::ClientGone);
                    }
                }
            }
            Err(e) => {
                tracing::error!("Error in stream session: {:#}", e);
                let _ = self
                    .tx
                    .send(StreamEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                let _ = self
                    .tx
                    .send(StreamEvent::Reconnect(self.settings.error_retry))
                    .await;
                return SessionState::Closed(CloseReason::Failed);
            }
        }

        let remaining = self
            .settings
            .session_max
            .saturating_sub(self.started.elapsed());
        let pause = self.settings.poll_interval.min(remaining);

        tokio::select! {
            _ = self.cancel.cancelled() => SessionState::Closed(CloseReason::Cancelled),
            _ = self.tx.closed() => SessionState::Closed(CloseReason::ClientGone),
            _ = tokio::time::sleep(pause) => SessionState::Connected,
        }
    }
}
