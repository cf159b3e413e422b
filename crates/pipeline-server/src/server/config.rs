use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use core::time::Duration;

/// Environment variables read by [`CliArgs`]. Each is the flag name
/// upper-cased with dashes replaced by underscores.
pub const ENV_KEYS: &[&str] = &[
    "LOG_LEVEL",
    "LOG_FORMAT",
    "GENERATOR_INTERVAL",
    "PUBLISHER_INTERVAL",
    "PACKET_SIZE_IN",
    "PACKET_SIZE_OUT",
    "WORKERS",
    "TIMEOUT",
    "PIPE_CAPACITY",
];

/// Command line of the `pipeline` binary.
///
/// Every option can also be set from the environment (see [`ENV_KEYS`]).
/// Explicit flags take precedence over the environment, which takes
/// precedence over the defaults.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pipeline",
    version,
    about = "Pipeline service",
    long_about = "Pipeline service is used to serve pipelines. Pipeline with caution."
)]
pub struct CliArgs {
    /// Log level, one of: panic, fatal, error, warn, warning, info, debug,
    /// trace.
    ///
    /// Unknown values fall back to `info`.
    ///
    /// Environment variable: `LOG_LEVEL`
    #[arg(short = 'l', long, global = true, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format, one of: text, json.
    ///
    /// Unknown values fall back to `text`.
    ///
    /// Environment variable: `LOG_FORMAT`
    #[arg(short = 'f', long, global = true, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve pipelines
    Serve(ServeArgs),
}

/// Tunables of the `serve` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Interval in milliseconds between packets produced by the generator.
    ///
    /// Environment variable: `GENERATOR_INTERVAL`
    #[arg(short = 'g', long, env = "GENERATOR_INTERVAL", default_value_t = 1000)]
    pub generator_interval: u64,

    /// Interval in seconds between publisher reports.
    ///
    /// Environment variable: `PUBLISHER_INTERVAL`
    #[arg(short = 'p', long, env = "PUBLISHER_INTERVAL", default_value_t = 1)]
    pub publisher_interval: u64,

    /// Number of values in every generated packet.
    ///
    /// Environment variable: `PACKET_SIZE_IN`
    #[arg(short = 's', long, env = "PACKET_SIZE_IN", default_value_t = 10)]
    pub packet_size_in: usize,

    /// Number of largest values kept from every processed packet.
    ///
    /// Environment variable: `PACKET_SIZE_OUT`
    #[arg(short = 'o', long, env = "PACKET_SIZE_OUT", default_value_t = 3)]
    pub packet_size_out: usize,

    /// Number of processor tasks competing for generated packets.
    ///
    /// Environment variable: `WORKERS`
    #[arg(short = 'w', long, env = "WORKERS", default_value_t = 3)]
    pub workers: usize,

    /// Run timeout in seconds; `0` runs until interrupted.
    ///
    /// Environment variable: `TIMEOUT`
    #[arg(short = 't', long, env = "TIMEOUT", default_value_t = 0)]
    pub timeout: u64,

    /// Buffer size of each inter-stage pipe. `0` makes every hand-off a
    /// rendezvous: a send completes only once a receiver takes the packet.
    ///
    /// Environment variable: `PIPE_CAPACITY`
    #[arg(long, env = "PIPE_CAPACITY", default_value_t = 0)]
    pub pipe_capacity: usize,
}

/// Validated, immutable pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub generator_interval: Duration,
    pub publisher_interval: Duration,
    pub packet_size_in: usize,
    pub packet_size_out: usize,
    pub workers: usize,
    pub timeout: Option<Duration>,
    pub pipe_capacity: usize,
}

impl TryFrom<ServeArgs> for PipelineConfig {
    type Error = anyhow::Error;

    fn try_from(args: ServeArgs) -> Result<Self, Self::Error> {
        if args.workers == 0 {
            bail!("WORKERS must be greater than 0");
        }

        if args.generator_interval == 0 {
            bail!("GENERATOR_INTERVAL must be greater than 0");
        }

        if args.publisher_interval == 0 {
            bail!("PUBLISHER_INTERVAL must be greater than 0");
        }

        Ok(Self {
            generator_interval: Duration::from_millis(args.generator_interval),
            publisher_interval: Duration::from_secs(args.publisher_interval),
            packet_size_in: args.packet_size_in,
            packet_size_out: args.packet_size_out,
            workers: args.workers,
            timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
            pipe_capacity: args.pipe_capacity,
        })
    }
}

/// Removes empty [`ENV_KEYS`] so they fall back to the defaults instead of
/// failing to parse.
///
/// Must run before any other thread is started.
pub fn scrub_empty_env() {
    for key in ENV_KEYS {
        if std::env::var_os(key).is_some_and(|value| value.is_empty()) {
            // SAFETY: called from `main` before the runtime spawns any thread.
            unsafe { std::env::remove_var(key) };
        }
    }
}
