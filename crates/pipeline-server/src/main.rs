#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use server::config::{CliArgs, Command, PipelineConfig, scrub_empty_env};
use server::controller::Controller;
use server::telemetry::init_telemetry;
use tokio::signal;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    // Environment is only mutated here, before the runtime starts any thread.
    scrub_empty_env();

    let args = CliArgs::parse();
    let providers = init_telemetry(&args.log_level, &args.log_format)?;

    let config = match args.command {
        Command::Serve(serve) => PipelineConfig::try_from(serve)?,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config));

    providers.shutdown();
    Ok(())
}

async fn serve(config: PipelineConfig) {
    log_startup_info(&config);

    let token = CancellationToken::new();
    tokio::spawn(shutdown_signal(token.clone()));

    if let Some(timeout) = config.timeout {
        tracing::info!("Will run for {} sec", timeout.as_secs());
        let token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = tokio::time::sleep(timeout) => {
                    tracing::info!("Run timeout elapsed");
                    token.cancel();
                }
            }
        });
    }

    let controller = Controller::new(config);
    let (tracker, shutdown) = controller.run(&token);

    token.cancelled().await;
    tracing::info!("Shutting down...");

    let total = shutdown.close().await;
    debug_assert!(tracker.is_empty());
    tracing::info!("Shut down, final total: {total}");
}

fn log_startup_info(config: &PipelineConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting service with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting service: generator-interval {}ms, publisher-interval {}s, \
             packet-size-in {}, packet-size-out {}, workers {}, pipe-capacity {}",
            config.generator_interval.as_millis(),
            config.publisher_interval.as_secs(),
            config.packet_size_in,
            config.packet_size_out,
            config.workers,
            config.pipe_capacity,
        );
    }
}

async fn shutdown_signal(token: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = token.cancelled() => return,
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    token.cancel();
}
