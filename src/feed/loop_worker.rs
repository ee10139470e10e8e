use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use anyhow::anyhow;
use log::{error, info, warn};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::camera::{Frame, FrameSource};

/// Fixed-cadence preview refresh. Grabs run on the blocking pool so a
/// slow camera never stalls the scheduler; the freshest frame is
/// published on the watch channel for whoever wants it. Capture and
/// weigh actions never pass through here, so they cannot block it.
pub async fn feed_loop(
    mut source: Box<dyn FrameSource>,
    interval: Duration,
    latest_tx: watch::Sender<Option<Frame>>,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let (returned, result) = match tokio::task::spawn_blocking(move || {
                    // A panicking driver is treated like a failed grab,
                    // and the source stays alive for the next tick.
                    let result = panic::catch_unwind(AssertUnwindSafe(|| source.grab()))
                        .unwrap_or_else(|_| Err(anyhow!("frame source panicked")));
                    (source, result)
                })
                .await
                {
                    Ok(pair) => pair,
                    Err(err) => {
                        error!("frame grab worker join failed: {err}");
                        return;
                    }
                };
                source = returned;

                match result {
                    Ok(frame) => {
                        let _ = latest_tx.send(Some(frame));
                    }
                    // A bad grab only costs one preview refresh.
                    Err(err) => warn!("frame grab failed: {err:#}"),
                }
            }
            _ = cancel_token.cancelled() => {
                info!("live feed shutting down");
                break;
            }
        }
    }
}
