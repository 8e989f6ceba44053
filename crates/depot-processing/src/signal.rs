//! Outbound job signals.
//!
//! The pipeline only announces work; running it belongs to whatever consumes the
//! channel.

use tokio::sync::mpsc;
use uuid::Uuid;

/// Work requested from the background runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSignal {
    AvatarThumbnails {
        upload_id: Uuid,
        user_id: Option<Uuid>,
    },
}

/// Sink for job signals emitted by the pipeline.
pub trait ThumbnailSignal: Send + Sync {
    fn emit(&self, signal: JobSignal);
}

/// Forwards signals over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSignal {
    sender: mpsc::UnboundedSender<JobSignal>,
}

impl ChannelSignal {
    pub fn new(sender: mpsc::UnboundedSender<JobSignal>) -> Self {
        Self { sender }
    }

    /// A signal paired with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<JobSignal>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl ThumbnailSignal for ChannelSignal {
    fn emit(&self, signal: JobSignal) {
        if let Err(e) = self.sender.send(signal) {
            tracing::warn!(signal = ?e.0, "Job signal dropped, no runner is listening");
        }
    }
}

/// Discards every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSignal;

impl ThumbnailSignal for NoopSignal {
    fn emit(&self, signal: JobSignal) {
        tracing::trace!(signal = ?signal, "Job signal discarded");
    }
}
