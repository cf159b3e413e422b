//! Periodic reporter of the accumulated total.

use crate::server::{accum::ReadTotal, stage::Stage};
use core::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublisherOptions {
    /// Time between two reports.
    pub interval: Duration,
}

/// Logs the bound total on every tick. Never writes to it.
pub struct Publisher<T> {
    total: T,
    options: PublisherOptions,
}

impl<T: ReadTotal> Publisher<T> {
    pub const fn new(total: T, options: PublisherOptions) -> Self {
        Self { total, options }
    }
}

impl<T: ReadTotal> Stage for Publisher<T> {
    async fn run(self, token: CancellationToken) {
        tracing::info!("Publisher - start");

        let period = self.options.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                _ = ticker.tick() => {
                    tracing::info!("Publisher: {}", self.total.get());
                }
            }
        }

        drop(ticker);
        tracing::info!("Publisher - done");
        tracing::info!("Publisher - end");
    }
}
