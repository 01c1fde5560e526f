//! SyncWorker - Processes inbound frames on a dedicated tokio task
//!
//! The transport callback only enqueues; the worker applies frames to the
//! [`Synchronizer`] one at a time in arrival order.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace};

use super::Synchronizer;

/// Commands accepted by the worker
pub enum SyncCommand {
    /// Raw inbound frame
    Frame(Value),
    Connected,
    Disconnected { expected: bool },
    /// Answered once every earlier command has been applied
    Flush { response: oneshot::Sender<()> },
    Shutdown,
}

impl std::fmt::Debug for SyncCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncCommand::Frame(frame) => {
                let event = frame.get(0).and_then(Value::as_str).unwrap_or("?");
                write!(f, "Frame({})", event)
            }
            SyncCommand::Connected => write!(f, "Connected"),
            SyncCommand::Disconnected { expected } => {
                write!(f, "Disconnected {{ expected: {} }}", expected)
            }
            SyncCommand::Flush { .. } => write!(f, "Flush"),
            SyncCommand::Shutdown => write!(f, "Shutdown"),
        }
    }
}

pub struct SyncWorker {
    sync: Arc<Synchronizer>,
    command_rx: mpsc::UnboundedReceiver<SyncCommand>,
    processed: u64,
}

impl SyncWorker {
    /// Spawn the worker on the current tokio runtime
    ///
    /// # Arguments
    ///
    /// * `sync` - Synchronizer that frames are applied to
    ///
    /// # Returns
    ///
    /// A `SyncWorkerHandle` for feeding the worker
    pub fn spawn(sync: Arc<Synchronizer>) -> SyncWorkerHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let worker = SyncWorker {
            sync,
            command_rx: cmd_rx,
            processed: 0,
        };

        tokio::spawn(worker.run());
        info!("SyncWorker spawned");

        SyncWorkerHandle { cmd_tx }
    }

    async fn run(mut self) {
        debug!("SyncWorker run loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            trace!(?cmd, "Processing command");

            match cmd {
                SyncCommand::Frame(frame) => {
                    // Failures are already published on the error channel
                    let _ = self.sync.handle_frame(frame);
                    self.processed += 1;
                }
                SyncCommand::Connected => self.sync.connected(),
                SyncCommand::Disconnected { expected } => self.sync.disconnected(expected),
                SyncCommand::Flush { response } => {
                    let _ = response.send(());
                }
                SyncCommand::Shutdown => {
                    info!("SyncWorker received shutdown command");
                    break;
                }
            }
        }

        info!(processed = self.processed, "SyncWorker stopped");
    }
}

/// Cheap, cloneable sender side of the worker
#[derive(Clone)]
pub struct SyncWorkerHandle {
    cmd_tx: mpsc::UnboundedSender<SyncCommand>,
}

impl SyncWorkerHandle {
    /// Enqueue an inbound frame (fire-and-forget)
    pub fn submit(&self, frame: Value) {
        let _ = self.cmd_tx.send(SyncCommand::Frame(frame));
    }

    pub fn connected(&self) {
        let _ = self.cmd_tx.send(SyncCommand::Connected);
    }

    pub fn disconnected(&self, expected: bool) {
        let _ = self.cmd_tx.send(SyncCommand::Disconnected { expected });
    }

    /// Wait until everything enqueued so far has been applied
    ///
    /// Returns false if the worker is gone.
    pub async fn flush(&self) -> bool {
        let (response_tx, response_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SyncCommand::Flush {
                response: response_tx,
            })
            .is_err()
        {
            return false;
        }
        response_rx.await.is_ok()
    }

    pub fn is_alive(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    /// Signal the worker to stop after the commands already queued
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(SyncCommand::Shutdown);
    }
}
