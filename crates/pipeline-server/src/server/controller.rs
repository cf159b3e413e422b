//! Composition root of the pipeline.
//!
//! ```text
//! Generator --pipe--> Processor 0..workers --pipe--> Accumulator <--read-- Publisher
//! ```
//!
//! [`Controller::run`] spawns every stage on one [`TaskTracker`] under the
//! caller's [`CancellationToken`] and hands back a [`Shutdown`] that closes
//! both pipes once every task has joined.

use crate::server::{
    accum::{self, Accumulator, ReadTotal, Total},
    config::PipelineConfig,
    generator::{Generator, GeneratorOptions},
    pool::{
        manager::WorkerPool,
        worker::{Pipes, Processor},
    },
    publisher::{Publisher, PublisherOptions},
    stage::Stage,
};
use pipeline_core::{
    BasicPacket, BuilderOptions, RandomPacketBuilder, TopN,
    pipe::{self, PipeReceiver, PipeSender},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

type PacketGenerator = Generator<BasicPacket, RandomPacketBuilder<BasicPacket>>;

pub struct Controller {
    config: PipelineConfig,
}

impl Controller {
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    fn build_packet_builder(&self) -> RandomPacketBuilder<BasicPacket> {
        let builder = RandomPacketBuilder::new(BuilderOptions {
            size: self.config.packet_size_in,
        });
        tracing::debug!("Built packet builder: {:?}", builder.options());
        builder
    }

    fn build_generator(&self) -> (PacketGenerator, PipeReceiver<BasicPacket>) {
        tracing::debug!("Building generator");
        let (tx, rx) = pipe::channel(self.config.pipe_capacity);
        let generator = Generator::new(
            tx,
            self.build_packet_builder(),
            GeneratorOptions {
                interval: self.config.generator_interval,
            },
        );
        (generator, rx)
    }

    fn build_pool(
        &self,
        input: PipeReceiver<BasicPacket>,
        output: PipeSender<BasicPacket>,
    ) -> WorkerPool<impl Fn(usize) -> Processor<BasicPacket> + use<>> {
        tracing::debug!("Building pool");
        let pipes = Pipes { input, output };
        let reducer = TopN::new(self.config.packet_size_out);
        tracing::debug!("Processors keep the top {} values", reducer.result_size());
        WorkerPool::new(self.config.workers, move |id| {
            Processor::new(id, pipes.clone(), reducer)
        })
    }

    fn build_accum(
        &self,
    ) -> (
        Accumulator<BasicPacket>,
        PipeSender<BasicPacket>,
        PipeReceiver<BasicPacket>,
    ) {
        tracing::debug!("Building accum");
        let (tx, rx) = pipe::channel(self.config.pipe_capacity);
        (Accumulator::new(rx.clone()), tx, rx)
    }

    fn build_publisher(&self, total: Total) -> Publisher<Total> {
        tracing::debug!("Building publisher");
        Publisher::new(
            total,
            PublisherOptions {
                interval: self.config.publisher_interval,
            },
        )
    }

    /// Starts every stage and returns immediately.
    ///
    /// The returned tracker counts one generator, one accumulator, one
    /// publisher and `workers` processors. Stages stop once `token` is
    /// cancelled; [`Shutdown::close`] then waits for them and closes the pipes.
    pub fn run(&self, token: &CancellationToken) -> (TaskTracker, Shutdown) {
        let (generator, generator_pipe) = self.build_generator();
        let (accum, accum_input, accum_pipe) = self.build_accum();
        let pool = self.build_pool(generator_pipe.clone(), accum_input);
        let total = accum.total();
        let publisher = self.build_publisher(total.clone());

        tracing::info!(
            "Launching components with {} workers, pipe capacity {}",
            pool.size(),
            generator_pipe.capacity()
        );

        let tracker = TaskTracker::new();
        tracker.spawn(generator.run(token.clone()));
        tracker.spawn(accum.run(token.clone()));
        tracker.spawn(publisher.run(token.clone()));
        pool.launch(token, &tracker);

        let shutdown = Shutdown {
            tracker: tracker.clone(),
            generator_pipe,
            accum_pipe,
            total,
        };
        (tracker, shutdown)
    }
}

/// Closes the pipes of a running pipeline once all of its tasks are done.
#[must_use = "pipes stay open until `Shutdown::close` is awaited"]
pub struct Shutdown {
    tracker: TaskTracker,
    generator_pipe: PipeReceiver<BasicPacket>,
    accum_pipe: PipeReceiver<BasicPacket>,
    total: Total,
}

impl Shutdown {
    /// Waits for every task on the tracker, closes both pipes and returns the
    /// final total.
    ///
    /// Does not cancel anything itself: if the token is never cancelled this
    /// never resolves.
    pub async fn close(self) -> i64 {
        self.tracker.close();
        self.tracker.wait().await;

        // Nothing sends any more; count what a buffered pipe still holds.
        let late = accum::drain(&self.accum_pipe, &self.total);
        if late > 0 {
            tracing::info!("Folded {late} late packets into the total");
        }

        tracing::info!("Closing generator pipe");
        self.generator_pipe.close().await;
        tracing::info!("Closing accum pipe");
        self.accum_pipe.close().await;

        self.total.get()
    }
}
