//! Notification emitters for the running service.
//!
//! [`ChannelEmitter`] hands each event to an unbounded tokio channel so the
//! engine never waits on a slow consumer. [`forward_events`] drains the
//! receiving end and writes one JSON object per line.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use herd_core::traits::NotificationEmitter;
use herd_core::types::HerdEvent;

/// Emitter backed by an unbounded mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<HerdEvent>,
}

impl ChannelEmitter {
    /// Create an emitter and the receiver that drains it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<HerdEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationEmitter for ChannelEmitter {
    fn emit(&self, event: HerdEvent) {
        if let Err(e) = self.tx.send(event) {
            warn!(event = ?e.0, "notification dropped: receiver closed");
        }
    }
}

/// Write every event from `rx` to `out` as a JSON line until the channel
/// closes. Returns the number of events written.
pub async fn forward_events<W: AsyncWrite + Unpin>(
    mut rx: mpsc::UnboundedReceiver<HerdEvent>,
    mut out: W,
) -> usize {
    let mut written = 0;
    while let Some(event) = rx.recv().await {
        let mut line = match serde_json::to_vec(&event) {
            Ok(line) => line,
            Err(e) => {
                warn!("failed to encode notification: {e}");
                continue;
            }
        };
        line.push(b'\n');
        if let Err(e) = out.write_all(&line).await {
            warn!("failed to write notification: {e}");
            continue;
        }
        if let Err(e) = out.flush().await {
            warn!("failed to flush notification: {e}");
            continue;
        }
        written += 1;
    }
    debug!(written, "notification channel closed");
    written
}
