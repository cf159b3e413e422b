use crate::server::{
    stage::Stage,
    telemetry::{increment_packets_dropped, increment_packets_reduced},
};
use pipeline_core::{
    Packet, Reduce, TopN,
    pipe::{PipeReceiver, PipeSender, RecvError},
};
use tokio_util::sync::CancellationToken;

/// The two pipes a [`Processor`] sits between.
pub struct Pipes<P> {
    pub input: PipeReceiver<P>,
    pub output: PipeSender<P>,
}

impl<P> Clone for Pipes<P> {
    fn clone(&self) -> Self {
        Self {
            input: self.input.clone(),
            output: self.output.clone(),
        }
    }
}

/// Pool worker: pulls packets from the shared input pipe, reduces each one and
/// forwards the result.
///
/// Processors compete for the same input, so every packet is handled by
/// exactly one of them. A packet that was already pulled is always reduced
/// and offered downstream, even if cancellation arrives while reducing.
///
/// # Logs
///
/// `id` only tags log lines; it has no effect on scheduling.
pub struct Processor<P, R = TopN> {
    id: usize,
    pipes: Pipes<P>,
    reducer: R,
}

impl<P, R> Processor<P, R>
where
    P: Packet,
    R: Reduce<P>,
{
    pub const fn new(id: usize, pipes: Pipes<P>, reducer: R) -> Self {
        Self { id, pipes, reducer }
    }

    /// Returns `false` once the output pipe is closed.
    async fn deliver(&self, packet: P, token: &CancellationToken) -> bool {
        let id = self.id;
        let rendered = packet.to_string();
        match self.pipes.output.send(packet, token).await {
            Ok(()) => {
                tracing::info!("Processor [{id}] - delivered : {rendered}");
                true
            }
            Err(err) if err.is_cancelled() => {
                increment_packets_dropped("processor");
                tracing::info!("Processor [{id}] - NODELIVERY: {}", err.into_inner());
                true
            }
            Err(err) => {
                tracing::error!(
                    "Processor [{id}] - output pipe closed, dropping {}",
                    err.into_inner()
                );
                false
            }
        }
    }
}

impl<P, R> Stage for Processor<P, R>
where
    P: Packet,
    R: Reduce<P> + 'static,
{
    async fn run(self, token: CancellationToken) {
        let id = self.id;
        tracing::info!("Processor [{id}] - start");

        loop {
            let packet = match self.pipes.input.recv(&token).await {
                Ok(packet) => packet,
                Err(RecvError::Cancelled) => {
                    tracing::info!("Processor [{id}] - done");
                    break;
                }
                Err(RecvError::Closed) => {
                    tracing::warn!("Processor [{id}] - input pipe closed");
                    break;
                }
            };

            tracing::info!("Processor [{id}] - received  : {packet}");
            let result = self.reducer.reduce(packet);
            increment_packets_reduced();
            tracing::info!("Processor [{id}] - prepared  : {result}");

            if !self.deliver(result, &token).await {
                break;
            }
        }

        tracing::info!("Processor [{id}] - end");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use pipeline_core::{BasicPacket, pipe};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio::time::timeout;

    fn processor(
        result_size: usize,
    ) -> (
        Processor<BasicPacket>,
        PipeSender<BasicPacket>,
        PipeReceiver<BasicPacket>,
    ) {
        let (in_tx, in_rx) = pipe::channel(0);
        let (out_tx, out_rx) = pipe::channel(0);
        let pipes = Pipes {
            input: in_rx,
            output: out_tx,
        };
        (
            Processor::new(0, pipes, TopN::new(result_size)),
            in_tx,
            out_rx,
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn forwards_the_largest_values() {
        let (processor, input, output) = processor(2);
        let token = CancellationToken::new();
        let task = tokio::spawn(processor.run(token.clone()));

        input
            .send(BasicPacket::from(vec![5, 1, 9, 3]), &token)
            .await
            .unwrap();
        let result = timeout(Duration::from_secs(1), output.recv(&token))
            .await
            .expect("nothing forwarded")
            .unwrap();
        assert_eq!(result.to_string(), "[5,9]");

        token.cancel();
        timeout(Duration::from_secs(1), task)
            .await
            .expect("processor did not stop")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stops_on_cancel_while_idle() {
        let (processor, _input, _output) = processor(3);
        let token = CancellationToken::new();
        token.cancel();

        timeout(Duration::from_millis(500), processor.run(token))
            .await
            .expect("processor did not stop");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn drops_result_when_cancelled_before_delivery() {
        // No one reads the output, so delivery can only end by cancellation.
        let (processor, input, _output) = processor(1);
        let token = CancellationToken::new();
        let task = tokio::spawn(processor.run(token.clone()));

        input
            .send(BasicPacket::from(vec![7, 2]), &token)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        timeout(Duration::from_millis(500), task)
            .await
            .expect("processor did not stop")
            .unwrap();
    }

    /// Counts calls and cancels the run from inside the reduction.
    struct CancellingReduce {
        calls: Arc<AtomicUsize>,
        token: CancellationToken,
    }

    impl Reduce<BasicPacket> for CancellingReduce {
        fn reduce(&self, packet: BasicPacket) -> BasicPacket {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.token.cancel();
            TopN::new(1).reduce(packet)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn pulled_packet_is_reduced_despite_cancellation() {
        let (in_tx, in_rx) = pipe::channel(1);
        let (out_tx, out_rx) = pipe::channel::<BasicPacket>(1);
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let processor = Processor::new(
            0,
            Pipes {
                input: in_rx,
                output: out_tx,
            },
            CancellingReduce {
                calls: calls.clone(),
                token: token.clone(),
            },
        );

        in_tx
            .send(BasicPacket::from(vec![4, 8]), &token)
            .await
            .unwrap();

        timeout(Duration::from_secs(1), processor.run(token))
            .await
            .expect("processor did not stop");

        // Reduced exactly once, and the delivery attempt lost to the
        // cancellation raised during reduction.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(out_rx.try_recv().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stops_when_input_is_closed() {
        let (processor, _input, _output) = processor(3);
        let pipes = processor.pipes.clone();
        pipes.input.close().await;

        timeout(Duration::from_secs(1), processor.run(CancellationToken::new()))
            .await
            .expect("processor kept running on a closed pipe");
    }
}
