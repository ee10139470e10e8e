use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::loop_worker::feed_loop;
use crate::camera::{Frame, FrameSource};

/// Owns the live feed task. The preview runs on its own cadence from the
/// moment `start` is called until `stop` cancels and joins it.
pub struct FeedController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    latest_rx: watch::Receiver<Option<Frame>>,
}

impl FeedController {
    pub fn start(source: Box<dyn FrameSource>, interval: Duration) -> Self {
        let (latest_tx, latest_rx) = watch::channel(None);
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(feed_loop(
            source,
            interval,
            latest_tx,
            cancel_token.clone(),
        ));

        Self {
            handle: Some(handle),
            cancel_token: Some(cancel_token),
            latest_rx,
        }
    }

    pub fn handle(&self) -> FeedHandle {
        FeedHandle {
            latest_rx: self.latest_rx.clone(),
        }
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle.await.context("live feed task failed to join")?;
        }
        Ok(())
    }
}

/// Cheap read-side view of the feed: hands out the most recent frame
/// without ever waiting on the grabber.
#[derive(Clone)]
pub struct FeedHandle {
    latest_rx: watch::Receiver<Option<Frame>>,
}

impl FeedHandle {
    pub fn latest(&self) -> Option<Frame> {
        self.latest_rx.borrow().clone()
    }

    /// A handle that always serves the given frame. Used on bench rigs
    /// and in tests where no feed task is running.
    pub fn preloaded(frame: Frame) -> Self {
        let (latest_tx, latest_rx) = watch::channel(Some(frame));
        drop(latest_tx);
        Self { latest_rx }
    }
}
