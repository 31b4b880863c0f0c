//! # Transport Stress - Main Entry Point
//!
//! Command-line front end of the TCP versus UDP load tester.
//!
//! ## Execution Flow
//!
//! 1. **Parse arguments**: clap validates types and ranges
//! 2. **Initialize logging**: stderr or `--log-file`, level from `-v`/`-q`/`RUST_LOG`
//! 3. **Build the configuration**: cross-field validation happens here, before any worker runs
//! 4. **Run the load test**: every worker is joined before the summary is computed
//! 5. **Print the report**: text by default, JSON with `--json`, always on stdout
//!
//! ## Error Handling
//!
//! Only setup errors (bad configuration, logging, serialization) make the
//! process exit non-zero. Failed exchanges are data and end up in the report.

use anyhow::Result;
use clap::Parser;
use transport_stress::{
    benchmark::{HarnessConfig, LoadTestRunner},
    cli::Args,
    logging,
};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Keep the guard alive so buffered log lines reach the file.
    let _log_guard = logging::init(args.verbose, args.quiet, args.log_file.as_deref())?;

    info!("Starting transport stress test v{}", transport_stress::VERSION);
    debug!("Arguments: {:?}", args);

    let config = HarnessConfig::from_args(&args)?;
    let report = LoadTestRunner::new(config).run().await;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report);
    }

    info!("Load test completed (run {})", report.metadata.run_id);
    Ok(())
}
