//! Consumer for signals raised by the upload pipeline.
//!
//! Thumbnail generation itself runs elsewhere; this process only records that work was
//! requested so an external worker (or the logs) can pick it up.

use depot_processing::JobSignal;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

pub fn spawn_signal_listener(mut receiver: UnboundedReceiver<JobSignal>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(signal) = receiver.recv().await {
            match signal {
                JobSignal::AvatarThumbnails { upload_id, user_id } => {
                    tracing::info!(
                        upload_id = %upload_id,
                        user_id = ?user_id,
                        job = "create_avatar_thumbnails",
                        "Avatar thumbnail job requested"
                    );
                }
            }
        }
        tracing::debug!("Job signal channel closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_processing::{ChannelSignal, ThumbnailSignal};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_listener_exits_when_senders_drop() {
        let (signal, receiver) = ChannelSignal::channel();
        let handle = spawn_signal_listener(receiver);

        signal.emit(JobSignal::AvatarThumbnails {
            upload_id: Uuid::new_v4(),
            user_id: None,
        });
        drop(signal);

        handle.await.unwrap();
    }
}
