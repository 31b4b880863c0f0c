//! Rendering of a finished run.
//!
//! [`LoadTestReport`] bundles the summary with the configuration it was
//! produced under and some run metadata. Its `Display` implementation is the
//! text report printed to stdout; `to_json` gives the same content for
//! machine consumption.

use crate::benchmark::HarnessConfig;
use crate::cli::Protocol;
use crate::metrics::{ProtocolStats, Summary, Verdict};
use crate::utils::{format_duration_ns, format_percentage, generate_run_id};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const BANNER: &str = "========= STRESS TEST SUMMARY =========";
const FOOTER: &str = "========================================";

/// Complete output of one load test run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadTestReport {
    pub metadata: RunMetadata,
    pub test_config: TestConfiguration,
    pub summary: Summary,
}

/// Run metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub version: String,
    pub run_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Wall-clock time from spawning the first worker to joining the last
    pub elapsed: Duration,
}

/// Test configuration used for the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfiguration {
    pub stream_workers: usize,
    pub datagram_workers: usize,
    pub stream_addr: String,
    pub datagram_addr: String,
    pub duration: Duration,
    pub pacing_interval: Duration,
    pub receive_timeout: Duration,
    pub buffer_size: usize,
    pub catalog_size: usize,
    pub seed: Option<u64>,
}

impl From<&HarnessConfig> for TestConfiguration {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            stream_workers: config.stream_workers,
            datagram_workers: config.datagram_workers,
            stream_addr: config.stream_addr.clone(),
            datagram_addr: config.datagram_addr.clone(),
            duration: config.duration,
            pacing_interval: config.pacing_interval,
            receive_timeout: config.receive_timeout,
            buffer_size: config.buffer_size,
            catalog_size: config.catalog.len(),
            seed: config.seed,
        }
    }
}

impl LoadTestReport {
    pub fn new(
        config: &HarnessConfig,
        summary: Summary,
        timestamp: chrono::DateTime<chrono::Utc>,
        elapsed: Duration,
    ) -> Self {
        Self {
            metadata: RunMetadata {
                version: crate::VERSION.to_string(),
                run_id: generate_run_id(),
                timestamp,
                elapsed,
            },
            test_config: TestConfiguration::from(config),
            summary,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report to JSON")
    }
}

fn latency_line(verdict: Verdict) -> String {
    match verdict {
        Verdict::Winner(protocol) => format!("✅ {} has lower average latency.", protocol),
        Verdict::Similar => "⚖️  Both have similar latency.".to_string(),
    }
}

fn error_line(verdict: Verdict) -> String {
    match verdict {
        Verdict::Winner(protocol) => format!("✅ {} experienced fewer errors.", protocol),
        Verdict::Similar => "⚖️  Both have similar error rates.".to_string(),
    }
}

fn optional_latency(latency_ns: Option<u64>) -> String {
    latency_ns.map_or_else(|| "n/a".to_string(), format_duration_ns)
}

struct StatsDisplay<'a>(&'a ProtocolStats);

impl fmt::Display for StatsDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.0;
        writeln!(f, "{}:", stats.protocol)?;
        writeln!(f, "  Messages:     {}", stats.exchanges)?;
        writeln!(f, "  Errors:       {}", stats.failures)?;
        writeln!(
            f,
            "  Error Rate:   {}",
            format_percentage(stats.error_rate_percent())
        )?;
        writeln!(
            f,
            "  Avg Latency:  {}",
            format_duration_ns(stats.average_latency_ns)
        )?;
        writeln!(f, "  Min Latency:  {}", optional_latency(stats.min_latency_ns))?;
        writeln!(f, "  Max Latency:  {}", optional_latency(stats.max_latency_ns))
    }
}

impl fmt::Display for LoadTestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", BANNER)?;
        for (i, protocol) in Protocol::ALL.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", StatsDisplay(self.summary.stats(*protocol)))?;
        }

        writeln!(f)?;
        writeln!(f, "Comparison:")?;
        writeln!(f, "  {}", latency_line(self.summary.comparison.latency))?;
        for protocol in Protocol::ALL {
            if !self.summary.stats(protocol).has_latency_data() {
                writeln!(
                    f,
                    "     ({} had no successful exchanges, so it has no latency to compare.)",
                    protocol
                )?;
            }
        }
        writeln!(f, "  {}", error_line(self.summary.comparison.errors))?;
        write!(f, "{}", FOOTER)
    }
}
