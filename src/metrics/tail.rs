use std::time::Duration;

use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::metrics::{JournalCursor, MetricsJournalReader, ReadOutcome};

/// Follow a member's journal from `cursor`, yielding every read outcome.
///
/// Drained reads are yielded and followed by a `poll_interval` pause. Gaps
/// are yielded before the cursor moves past them. The stream ends on the
/// first error (which is yielded), on cancellation, or when the consumer
/// drops it.
pub fn tail(
    reader: MetricsJournalReader,
    mut cursor: JournalCursor,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> ReceiverStream<Result<ReadOutcome>> {
    let (tx, rx) = tokio::sync::mpsc::channel(32);

    tokio::spawn(async move {
        loop {
            let polled = tokio::select! {
                _ = cancel.cancelled() => break,
                polled = cursor.poll(&reader) => polled,
            };

            let outcome = match polled {
                Ok(outcome) => outcome,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    break;
                }
            };

            if let Some(skipped) = cursor.accept_gap(&outcome) {
                tracing::warn!(
                    member = %cursor.member(),
                    skipped,
                    resume_at = cursor.position(),
                    "Metrics journal entries were evicted before they were read"
                );
            }

            let drained = matches!(outcome, ReadOutcome::Drained { .. });
            if tx.send(Ok(outcome)).await.is_err() {
                // Consumer dropped the stream
                break;
            }

            if drained {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        }
    });

    ReceiverStream::new(rx)
}
