//! # Transport Stress Library
//!
//! A concurrent load generator that compares a connection-oriented stream
//! protocol (TCP) against a connectionless datagram protocol (UDP) by driving
//! many simulated clients at independent echo servers.
//!
//! ## Architecture Overview
//!
//! The library is organized into several key modules:
//!
//! - `benchmark`: Harness configuration and the orchestrator that spawns and joins workers
//! - `cli`: Command-line interface parsing
//! - `transport`: Per-worker TCP session and connected UDP socket behind one trait
//! - `worker`: The time-bounded request loop every simulated client runs
//! - `samples`: Random request payloads drawn from a fixed catalog
//! - `results`: The concurrency-safe sink every worker records into
//! - `metrics`: Per-protocol statistics and the qualitative comparison
//! - `report`: Text and JSON rendering of a finished run
//! - `utils`: Formatting and validation helpers
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use transport_stress::{HarnessConfig, LoadTestRunner};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = HarnessConfig {
//!         stream_workers: 4,
//!         datagram_workers: 4,
//!         duration: Duration::from_secs(5),
//!         ..Default::default()
//!     };
//!     config.validate()?;
//!
//!     let report = LoadTestRunner::new(config).run().await;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

/// Harness configuration and orchestration
///
/// Contains `HarnessConfig` and the `LoadTestRunner` that spawns one task per
/// simulated client, joins them all, and summarizes the shared results once.
pub mod benchmark;

/// Command-line interface
///
/// Argument parsing with clap, including human-readable durations
/// (e.g. "500ms", "20s") and the `Protocol` tag shared by the whole crate.
pub mod cli;

pub mod logging;

/// Latency statistics and protocol comparison
///
/// Pure functions over a frozen snapshot of exchange results: per-protocol
/// counts, min/max/average latency over successes, and the winner verdicts.
pub mod metrics;

pub mod report;

/// Exchange records and the shared result sink
pub mod results;

pub mod samples;

/// Network transports
///
/// The `Transport` trait and its TCP and UDP implementations. Each worker
/// owns exactly one transport for its whole lifetime.
pub mod transport;

pub mod utils;

pub mod worker;

pub use benchmark::{HarnessConfig, LoadTestRunner};
pub use cli::{Args, Protocol};
pub use metrics::{Comparison, ProtocolStats, Summary, Verdict};
pub use report::LoadTestReport;
pub use results::{ExchangeResult, ResultSink, SharedResults};
pub use samples::{SampleCatalog, SampleSource};
pub use transport::{Transport, TransportConfig, TransportError};
pub use worker::{ClientWorker, WorkerExit, WorkerOutcome};

/// The current version of the harness, reported in JSON output
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
///
/// Fifty clients per protocol hammering local echo servers for twenty seconds.
pub mod defaults {
    use std::time::Duration;

    /// Number of concurrent TCP clients
    pub const STREAM_WORKERS: usize = 50;

    /// Number of concurrent UDP clients
    pub const DATAGRAM_WORKERS: usize = 50;

    /// TCP echo server address
    pub const STREAM_ADDR: &str = "localhost:3000";

    /// UDP echo server address
    pub const DATAGRAM_ADDR: &str = "localhost:3001";

    /// Length of the measurement window shared by every worker
    pub const DURATION: Duration = Duration::from_secs(20);

    /// Sleep between two exchanges of the same worker
    pub const PACING_INTERVAL: Duration = Duration::from_millis(100);

    /// How long a UDP worker waits for a reply before counting the exchange as lost
    pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);

    /// Size of the buffer a single response is read into
    pub const BUFFER_SIZE: usize = 2048;
}
