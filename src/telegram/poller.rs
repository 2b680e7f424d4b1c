//! Long-polling update loop

use super::updates::{to_inbound, Inbound};
use super::TelegramClient;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Poll until cancelled, handing each update to `dispatch` in arrival order.
///
/// The offset only advances past updates that were dispatched, so a crash
/// mid-batch redelivers the rest on the next start.
pub async fn poll_updates<F, Fut>(
    client: &TelegramClient,
    long_poll: Duration,
    cancel: CancellationToken,
    mut dispatch: F,
) where
    F: FnMut(Inbound) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut offset: Option<i64> = None;
    let mut backoff = INITIAL_BACKOFF;

    tracing::info!(long_poll_secs = long_poll.as_secs(), "Polling for updates");

    loop {
        let result = tokio::select! {
            () = cancel.cancelled() => break,
            result = client.get_updates(offset, long_poll) => result,
        };

        match result {
            Ok(updates) => {
                backoff = INITIAL_BACKOFF;
                for update in updates {
                    let update_id = update.update_id;
                    offset = Some(update_id + 1);
                    match to_inbound(update) {
                        Some(inbound) => dispatch(inbound).await,
                        None => tracing::debug!(update_id, "Ignoring update"),
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retry_in_ms = %backoff.as_millis(),
                    "Polling for updates failed"
                );
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }

    tracing::info!("Update polling stopped");
}
