//! Running sum of every reduced packet.

use crate::server::{stage::Stage, telemetry::record_accumulated};
use parking_lot::RwLock;
use pipeline_core::{
    Packet,
    pipe::{PipeReceiver, RecvError},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Read access to an accumulated total.
///
/// `Option<T>` implements this too: an absent total reads as `0`.
pub trait ReadTotal: Send + Sync + 'static {
    fn get(&self) -> i64;
}

/// Shared handle to the accumulator's sum. Clones observe the same value.
///
/// Readers never block each other; the accumulator is the only writer.
#[derive(Clone, Debug, Default)]
pub struct Total(Arc<RwLock<i64>>);

impl Total {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every value under a single write lock and returns what was added.
    ///
    /// The total saturates at the bounds of `i64` instead of wrapping.
    fn add_all(&self, values: &[i64]) -> i64 {
        let mut total = self.0.write();
        let mut added = 0_i64;
        for &value in values {
            *total = total.saturating_add(value);
            added = added.saturating_add(value);
        }
        added
    }
}

impl ReadTotal for Total {
    fn get(&self) -> i64 {
        *self.0.read()
    }
}

impl<T: ReadTotal> ReadTotal for Option<T> {
    fn get(&self) -> i64 {
        self.as_ref().map_or(0, ReadTotal::get)
    }
}

/// Consumes reduced packets and folds their values into a [`Total`].
pub struct Accumulator<P> {
    input: PipeReceiver<P>,
    total: Total,
}

impl<P: Packet> Accumulator<P> {
    pub fn new(input: PipeReceiver<P>) -> Self {
        Self {
            input,
            total: Total::new(),
        }
    }

    /// Handle that keeps reading the sum after the accumulator has been
    /// moved into its task.
    pub fn total(&self) -> Total {
        self.total.clone()
    }

    fn process(&self, packet: &P) {
        fold(&self.total, packet);
    }
}

/// Adds every value of `packet` to `total`.
fn fold<P: Packet>(total: &Total, packet: &P) {
    let added = total.add_all(packet.values());
    record_accumulated(added);
}

/// Folds every packet still buffered in `input` into `total`. Returns how
/// many packets were folded.
pub fn drain<P: Packet>(input: &PipeReceiver<P>, total: &Total) -> usize {
    let mut drained = 0;
    while let Some(packet) = input.try_recv() {
        tracing::info!("Accum drained packet: {packet}");
        fold(total, &packet);
        drained += 1;
    }
    drained
}

impl<P: Packet> ReadTotal for Accumulator<P> {
    fn get(&self) -> i64 {
        self.total.get()
    }
}

impl<P: Packet> Stage for Accumulator<P> {
    async fn run(self, token: CancellationToken) {
        tracing::info!("Accum start");

        loop {
            match self.input.recv(&token).await {
                Ok(packet) => {
                    tracing::info!("Accum got packet: {packet}");
                    self.process(&packet);
                }
                Err(RecvError::Cancelled) => {
                    // A buffered pipe may still hold packets whose send
                    // already succeeded.
                    drain(&self.input, &self.total);
                    tracing::info!("Accum done");
                    break;
                }
                Err(RecvError::Closed) => {
                    tracing::warn!("Accum - input pipe closed");
                    break;
                }
            }
        }

        tracing::info!("Accum end");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use pipeline_core::{BasicPacket, pipe};
    use tokio::time::{sleep, timeout};

    async fn wait_for(total: &Total, expected: i64) {
        timeout(Duration::from_secs(1), async {
            while total.get() != expected {
                sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("total stuck at {} instead of {expected}", total.get()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn folds_packets_into_running_sum() {
        let (tx, rx) = pipe::channel(0);
        let accum = Accumulator::<BasicPacket>::new(rx);
        let total = accum.total();
        assert_eq!(accum.get(), 0);

        let token = CancellationToken::new();
        let task = tokio::spawn(accum.run(token.clone()));

        let feed: [(&[i64], i64); 4] = [(&[], 0), (&[0], 0), (&[0, 1], 1), (&[0, 1], 2)];
        for (values, expected) in feed {
            tx.send(BasicPacket::from(values), &token).await.unwrap();
            wait_for(&total, expected).await;
        }

        token.cancel();
        timeout(Duration::from_secs(1), task)
            .await
            .expect("accumulator did not stop")
            .unwrap();
        assert_eq!(total.get(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sum_does_not_depend_on_arrival_order() {
        let (tx, rx) = pipe::channel(4);
        let accum = Accumulator::<BasicPacket>::new(rx);
        let total = accum.total();
        let token = CancellationToken::new();
        let task = tokio::spawn(accum.run(token.clone()));

        let mut producers = Vec::new();
        for sign in [1_i64, -2, 3] {
            let tx = tx.clone();
            let token = token.clone();
            producers.push(tokio::spawn(async move {
                for value in 1..=10_i64 {
                    tx.send(BasicPacket::from(vec![sign * value]), &token)
                        .await
                        .unwrap();
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }

        // 55 * (1 - 2 + 3)
        wait_for(&total, 110).await;

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn buffered_packets_count_after_cancellation() {
        let (tx, rx) = pipe::channel(4);
        let accum = Accumulator::<BasicPacket>::new(rx);
        let total = accum.total();
        let token = CancellationToken::new();

        tx.send(BasicPacket::from(vec![5]), &token).await.unwrap();
        tx.send(BasicPacket::from(vec![7]), &token).await.unwrap();
        token.cancel();

        timeout(Duration::from_secs(1), accum.run(token))
            .await
            .expect("accumulator did not stop");
        assert_eq!(total.get(), 12);
    }

    #[test]
    fn saturates_instead_of_wrapping() {
        let total = Total::new();
        total.add_all(&[i64::MAX, 1]);
        assert_eq!(total.get(), i64::MAX);
        total.add_all(&[i64::MIN, i64::MIN]);
        assert_eq!(total.get(), i64::MIN);
    }

    #[test]
    fn absent_total_reads_zero() {
        assert_eq!(None::<Total>.get(), 0);

        let total = Total::new();
        total.add_all(&[4, 5]);
        assert_eq!(Some(total).get(), 9);
    }
}
