//! Coalescing of notification bursts.

use std::time::Duration;

use tokio::select;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Instant, sleep};

/// How a burst is delimited
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Coalesce {
    /// The burst ends a fixed delay after its first notification
    Window,
    /// The burst ends once no notification arrived for the delay
    Quiet,
}

/// Waits for the next burst of notifications on `rx`.
///
/// Returns `None` once the channel is closed and drained.
pub async fn next_batch<T>(rx: &mut UnboundedReceiver<T>, delay: Duration, mode: Coalesce) -> Option<Vec<T>> {
    let first = rx.recv().await?;
    let mut batch = vec![first];
    let deadline = sleep(delay);
    tokio::pin!(deadline);

    loop {
        select! {
            _ = &mut deadline => return Some(batch),
            item = rx.recv() => match item {
                Some(item) => {
                    batch.push(item);
                    if mode == Coalesce::Quiet {
                        deadline.as_mut().reset(Instant::now() + delay);
                    }
                }
                None => return Some(batch),
            },
        }
    }
}
