//! Periodic packet source feeding the worker pool.

use crate::server::{
    stage::Stage,
    telemetry::{increment_packets_dropped, increment_packets_generated},
};
use core::time::Duration;
use pipeline_core::{
    Packet, PacketBuilder,
    pipe::PipeSender,
};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Time between two generated packets.
    pub interval: Duration,
}

/// Builds one packet per tick and offers it to the pool.
///
/// Every packet gets exactly one delivery attempt. If cancellation wins the
/// race the packet is dropped and a `NODELIVERY` line is logged.
pub struct Generator<P, B> {
    out: PipeSender<P>,
    builder: B,
    options: GeneratorOptions,
}

impl<P, B> Generator<P, B>
where
    P: Packet,
    B: PacketBuilder<P>,
{
    pub const fn new(out: PipeSender<P>, builder: B, options: GeneratorOptions) -> Self {
        Self {
            out,
            builder,
            options,
        }
    }

    /// Returns `false` once the output pipe is closed.
    async fn deliver(&self, packet: P, token: &CancellationToken) -> bool {
        let rendered = packet.to_string();
        match self.out.send(packet, token).await {
            Ok(()) => {
                tracing::info!("Generator - delivered : {rendered}");
                true
            }
            Err(err) if err.is_cancelled() => {
                increment_packets_dropped("generator");
                tracing::info!("Generator - NODELIVERY: {}", err.into_inner());
                true
            }
            Err(err) => {
                tracing::error!("Generator - output pipe closed, dropping {}", err.into_inner());
                false
            }
        }
    }
}

impl<P, B> Stage for Generator<P, B>
where
    P: Packet,
    B: PacketBuilder<P> + 'static,
{
    async fn run(self, token: CancellationToken) {
        tracing::info!("Generator start");

        let period = self.options.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    tracing::info!("Generator - done");
                    break;
                }
                _ = ticker.tick() => {
                    let packet = self.builder.build();
                    increment_packets_generated();
                    tracing::debug!("Generator - new packet: {packet}");
                    if !self.deliver(packet, &token).await {
                        break;
                    }
                }
            }
        }
        drop(ticker);

        tracing::info!("Generator end");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_core::{BasicPacket, BuilderOptions, RandomPacketBuilder, pipe};
    use tokio::time::timeout;

    fn generator(
        out: PipeSender<BasicPacket>,
        size: usize,
    ) -> Generator<BasicPacket, RandomPacketBuilder<BasicPacket>> {
        Generator::new(
            out,
            RandomPacketBuilder::new(BuilderOptions { size }),
            GeneratorOptions {
                interval: Duration::from_millis(10),
            },
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn first_tick_delivers_a_packet_of_configured_size() {
        for size in [10, 20] {
            let (tx, rx) = pipe::channel(0);
            let token = CancellationToken::new();
            let task = tokio::spawn(generator(tx, size).run(token.clone()));

            let packet = timeout(Duration::from_secs(1), rx.recv(&token))
                .await
                .expect("no packet within a second")
                .unwrap();
            assert_eq!(packet.len(), size);
            assert!(packet.values().iter().all(|v| (0..20).contains(v)));

            token.cancel();
            timeout(Duration::from_secs(1), task)
                .await
                .expect("generator did not stop")
                .unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn pending_send_yields_to_cancellation() {
        // Nobody receives, so the first send blocks until cancellation.
        let (tx, _rx) = pipe::channel::<BasicPacket>(0);
        let token = CancellationToken::new();
        let task = tokio::spawn(generator(tx, 10).run(token.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        timeout(Duration::from_millis(500), task)
            .await
            .expect("generator did not stop")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stops_when_output_is_closed() {
        let (tx, rx) = pipe::channel::<BasicPacket>(0);
        rx.close().await;

        let token = CancellationToken::new();
        timeout(Duration::from_secs(1), generator(tx, 3).run(token))
            .await
            .expect("generator kept running on a closed pipe");
    }
}
