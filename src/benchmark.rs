//! # Load Test Engine Module
//!
//! This module contains the orchestrator that drives a load test run. It
//! turns the user's configuration into a fleet of simulated clients, lets
//! them hammer both echo servers until a shared deadline, and summarizes what
//! they recorded.
//!
//! ## Key Components
//!
//! - **HarnessConfig**: Validated configuration for one run
//! - **LoadTestRunner**: Spawns, joins and summarizes the workers
//!
//! ## Run Lifecycle
//!
//! 1. **Planning**: One deadline (`now + duration`) and one result sink are created
//! 2. **Spawning**: Every TCP and UDP worker becomes its own Tokio task
//! 3. **Joining**: The runner waits for every task, whatever the reason it stopped
//! 4. **Summarizing**: The frozen result set is summarized exactly once
//!
//! ## Failure Handling
//!
//! Worker failures never abort the run. Connect, send and receive errors are
//! recorded as failed exchanges by the worker that hit them, and even a
//! panicking worker task is only logged before the runner moves on.

use crate::{
    cli::{Args, Protocol},
    metrics::Summary,
    report::LoadTestReport,
    results::{ResultSink, SharedResults},
    samples::{SampleCatalog, SampleSource},
    transport::TransportConfig,
    utils::{
        format_duration, validate_buffer_size, validate_endpoint, validate_max_duration,
        validate_non_zero, validate_worker_counts, MAX_DURATION,
    },
    worker::{ClientWorker, WorkerExit, WorkerOutcome},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A helper struct to provide a consistent, single source of truth for
/// displaying the run configuration.
struct HarnessConfigDisplay<'a> {
    config: &'a HarnessConfig,
}

impl<'a> std::fmt::Display for HarnessConfigDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = self.config;
        writeln!(
            f,
            "-----------------------------------------------------------------"
        )?;
        writeln!(f, "Starting Load Test")?;
        writeln!(
            f,
            "  TCP Clients:        {} -> {}",
            config.stream_workers, config.stream_addr
        )?;
        writeln!(
            f,
            "  UDP Clients:        {} -> {}",
            config.datagram_workers, config.datagram_addr
        )?;
        writeln!(f, "  Test Duration:      {}", format_duration(config.duration))?;
        writeln!(
            f,
            "  Pacing Interval:    {}",
            format_duration(config.pacing_interval)
        )?;
        writeln!(
            f,
            "  UDP Reply Timeout:  {}",
            format_duration(config.receive_timeout)
        )?;
        writeln!(f, "  Response Buffer:    {} bytes", config.buffer_size)?;
        writeln!(f, "  Sample Messages:    {}", config.catalog.len())?;
        let seed_str = config
            .seed
            .map_or("Not set".to_string(), |seed| seed.to_string());
        writeln!(f, "  Seed:               {}", seed_str)?;
        write!(
            f,
            "-----------------------------------------------------------------"
        )
    }
}

/// Configuration for a load test run
///
/// Every knob of the harness lives here: how many clients of each protocol
/// to simulate, where the echo servers are, how long and how fast to send,
/// and which payloads to send.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Number of concurrent TCP clients
    pub stream_workers: usize,

    /// Number of concurrent UDP clients
    pub datagram_workers: usize,

    /// `host:port` of the TCP echo server
    pub stream_addr: String,

    /// `host:port` of the UDP echo server
    pub datagram_addr: String,

    /// Length of the window in which workers start new exchanges
    pub duration: Duration,

    /// Sleep between two exchanges of one worker
    pub pacing_interval: Duration,

    /// How long a UDP worker waits for each reply
    pub receive_timeout: Duration,

    /// Size of the buffer a response is read into
    pub buffer_size: usize,

    /// Payloads the workers draw their requests from
    pub catalog: SampleCatalog,

    /// Base seed for the per-worker payload generators
    ///
    /// Worker `n` is seeded with `seed + n`, so a seeded run sends the same
    /// request sequence on every invocation. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            stream_workers: crate::defaults::STREAM_WORKERS,
            datagram_workers: crate::defaults::DATAGRAM_WORKERS,
            stream_addr: crate::defaults::STREAM_ADDR.to_string(),
            datagram_addr: crate::defaults::DATAGRAM_ADDR.to_string(),
            duration: crate::defaults::DURATION,
            pacing_interval: crate::defaults::PACING_INTERVAL,
            receive_timeout: crate::defaults::RECEIVE_TIMEOUT,
            buffer_size: crate::defaults::BUFFER_SIZE,
            catalog: SampleCatalog::default(),
            seed: None,
        }
    }
}

impl HarnessConfig {
    /// Create a validated configuration from CLI arguments
    ///
    /// An empty `--message` list selects the built-in catalog.
    pub fn from_args(args: &Args) -> Result<Self> {
        let catalog = if args.messages.is_empty() {
            SampleCatalog::default()
        } else {
            SampleCatalog::new(args.messages.clone()).context("Invalid --message catalog")?
        };

        let config = Self {
            stream_workers: args.tcp_clients,
            datagram_workers: args.udp_clients,
            stream_addr: args.tcp_addr.clone(),
            datagram_addr: args.udp_addr.clone(),
            duration: args.duration,
            pacing_interval: args.pacing,
            receive_timeout: args.udp_timeout,
            buffer_size: args.buffer_size,
            catalog,
            seed: args.seed,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration before any worker is spawned
    pub fn validate(&self) -> Result<()> {
        validate_worker_counts(self.stream_workers, self.datagram_workers)?;
        validate_endpoint(&self.stream_addr).context("Invalid TCP endpoint")?;
        validate_endpoint(&self.datagram_addr).context("Invalid UDP endpoint")?;
        validate_non_zero("Test duration", self.duration)?;
        validate_non_zero("UDP reply timeout", self.receive_timeout)?;
        validate_max_duration("Pacing interval", self.pacing_interval)?;
        validate_buffer_size(self.buffer_size)?;
        Ok(())
    }

    pub fn total_workers(&self) -> usize {
        self.stream_workers + self.datagram_workers
    }

    /// Transport settings handed to every worker
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            stream_addr: self.stream_addr.clone(),
            datagram_addr: self.datagram_addr.clone(),
            buffer_size: self.buffer_size,
            receive_timeout: self.receive_timeout,
        }
    }

    fn sample_source(&self, worker_id: usize) -> SampleSource {
        match self.seed {
            Some(seed) => {
                SampleSource::seeded(self.catalog.clone(), seed.wrapping_add(worker_id as u64))
            }
            None => SampleSource::from_entropy(self.catalog.clone()),
        }
    }
}

/// Orchestrator for one load test run
///
/// ## Usage Pattern
///
/// ```rust,no_run
/// # use transport_stress::benchmark::{HarnessConfig, LoadTestRunner};
/// # use transport_stress::cli::Args;
/// # use clap::Parser;
/// #
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let args = Args::parse_from(["transport-stress", "-t", "10", "-u", "10", "-d", "5s"]);
/// let config = HarnessConfig::from_args(&args)?;
/// let report = LoadTestRunner::new(config).run().await;
/// println!("{}", report);
/// # Ok(())
/// # }
/// ```
pub struct LoadTestRunner {
    config: HarnessConfig,
}

impl LoadTestRunner {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Run the load test and return the summarized report
    ///
    /// Blocks until every worker has terminated, then summarizes the shared
    /// results exactly once.
    pub async fn run(&self) -> LoadTestReport {
        info!(
            "{}",
            HarnessConfigDisplay {
                config: &self.config
            }
        );

        let sink = Arc::new(SharedResults::new());
        let timestamp = chrono::Utc::now();
        let started = Instant::now();

        let outcomes = self.execute(Arc::clone(&sink)).await;

        let elapsed = started.elapsed();
        let results = sink.snapshot();
        let connect_failures = outcomes
            .iter()
            .filter(|o| o.exit == WorkerExit::ConnectFailed)
            .count();
        if connect_failures > 0 {
            warn!(
                "{} of {} workers could not reach their echo server",
                connect_failures,
                outcomes.len()
            );
        }
        info!(
            "All {} workers finished after {}; {} exchanges recorded",
            outcomes.len(),
            format_duration(elapsed),
            results.len()
        );

        LoadTestReport::new(
            &self.config,
            Summary::from_results(&results),
            timestamp,
            elapsed,
        )
    }

    /// Spawn every worker against `sink` and wait for all of them
    ///
    /// Returns the outcome of each worker that exited normally. A worker task
    /// that panicked is logged and left out; whatever it recorded before
    /// panicking stays in the sink.
    pub async fn execute<S>(&self, sink: Arc<S>) -> Vec<WorkerOutcome>
    where
        S: ResultSink + 'static,
    {
        // An unvalidated config may carry a duration past the clock's range.
        let now = Instant::now();
        let deadline = now
            .checked_add(self.config.duration)
            .unwrap_or(now + MAX_DURATION);
        let transport_config = Arc::new(self.config.transport_config());

        let plan = std::iter::repeat(Protocol::Stream)
            .take(self.config.stream_workers)
            .chain(std::iter::repeat(Protocol::Datagram).take(self.config.datagram_workers));

        let mut tasks = JoinSet::new();
        for (worker_id, protocol) in plan.enumerate() {
            let sink: Arc<dyn ResultSink> = sink.clone();
            let worker = ClientWorker::new(
                worker_id,
                protocol,
                self.config.sample_source(worker_id),
                sink,
                deadline,
                self.config.pacing_interval,
            );
            let transport_config = Arc::clone(&transport_config);
            tasks.spawn(async move { worker.run(&transport_config).await });
        }
        debug!("Spawned {} workers", tasks.len());

        let mut outcomes = Vec::with_capacity(self.config.total_workers());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("Worker task terminated abnormally: {}", e),
            }
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_harness_config_defaults() {
        let config = HarnessConfig::default();

        assert_eq!(config.stream_workers, 50);
        assert_eq!(config.datagram_workers, 50);
        assert_eq!(config.total_workers(), 100);
        assert_eq!(config.duration, Duration::from_secs(20));
        assert_eq!(config.pacing_interval, Duration::from_millis(100));
        assert_eq!(config.receive_timeout, Duration::from_secs(1));
        assert_eq!(config.buffer_size, 2048);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_args_builds_custom_catalog() {
        let args = Args::parse_from([
            "transport-stress",
            "-t",
            "2",
            "-u",
            "3",
            "-m",
            "ping",
            "--tcp-addr",
            "127.0.0.1:4000",
        ]);
        let config = HarnessConfig::from_args(&args).unwrap();

        assert_eq!(config.stream_workers, 2);
        assert_eq!(config.datagram_workers, 3);
        assert_eq!(config.stream_addr, "127.0.0.1:4000");
        assert_eq!(config.catalog.messages(), &["ping".to_string()]);

        let transport = config.transport_config();
        assert_eq!(transport.stream_addr, "127.0.0.1:4000");
        assert_eq!(transport.datagram_addr, "localhost:3001");
    }

    #[test]
    fn test_from_args_rejects_invalid_configuration() {
        let cases: [&[&str]; 8] = [
            &["transport-stress", "-t", "0", "-u", "0"],
            &["transport-stress", "-d", "0s"],
            &["transport-stress", "-d", "1e19s"],
            &["transport-stress", "--pacing", "1e19s"],
            &["transport-stress", "--udp-timeout", "200h"],
            &["transport-stress", "--udp-timeout", "0ms"],
            &["transport-stress", "--tcp-addr", "no-port"],
            &["transport-stress", "--buffer-size", "0"],
        ];

        for argv in cases {
            let args = Args::parse_from(argv.iter().copied());
            assert!(
                HarnessConfig::from_args(&args).is_err(),
                "expected {:?} to be rejected",
                argv
            );
        }
    }

    #[test]
    fn test_seeded_workers_draw_distinct_sequences() {
        let config = HarnessConfig {
            seed: Some(11),
            ..Default::default()
        };

        let draw = |worker_id: usize| -> Vec<String> {
            let mut source = config.sample_source(worker_id);
            (0..32).map(|_| source.next_message().to_string()).collect()
        };

        assert_eq!(draw(0), draw(0));
        assert_ne!(draw(0), draw(1));
    }

    #[test]
    fn test_config_display_mentions_endpoints() {
        let config = HarnessConfig::default();
        let text = HarnessConfigDisplay { config: &config }.to_string();

        assert!(text.contains("TCP Clients:        50 -> localhost:3000"));
        assert!(text.contains("UDP Clients:        50 -> localhost:3001"));
        assert!(text.contains("Test Duration:      20.00s"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoints_are_joined_not_fatal() {
        // Reserve ports and release them so nothing answers there.
        let tcp = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let tcp_addr = tcp.local_addr().unwrap();
        drop(tcp);

        let config = HarnessConfig {
            stream_workers: 3,
            datagram_workers: 0,
            stream_addr: tcp_addr.to_string(),
            duration: Duration::from_millis(200),
            ..Default::default()
        };
        let runner = LoadTestRunner::new(config);
        let sink = Arc::new(SharedResults::new());

        let outcomes = runner.execute(Arc::clone(&sink)).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.exit == WorkerExit::ConnectFailed));
        let results = sink.snapshot();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.failed && r.latency == Duration::ZERO));
    }

    #[tokio::test]
    async fn test_unvalidated_huge_duration_does_not_overflow_the_deadline() {
        let tcp = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let tcp_addr = tcp.local_addr().unwrap();
        drop(tcp);

        let config = HarnessConfig {
            stream_workers: 1,
            datagram_workers: 0,
            stream_addr: tcp_addr.to_string(),
            duration: Duration::from_secs(u64::MAX / 2),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let sink = Arc::new(SharedResults::new());
        let outcomes = LoadTestRunner::new(config).execute(Arc::clone(&sink)).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].exit, WorkerExit::ConnectFailed);
    }
}
