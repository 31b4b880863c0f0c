//! # Utility Functions and Helper Module
//!
//! Helpers shared by the harness: human-readable formatting for the report
//! and validation of user supplied configuration.
//!
//! ## Key Functionality Categories
//!
//! - **Formatting**: Human-readable display of latencies and rates
//! - **Validation**: Configuration checks with clear error messages
//! - **Identification**: Unique identifiers for individual runs
//!
//! ## Usage Examples
//!
//! ```rust
//! use transport_stress::utils::*;
//! use std::time::Duration;
//!
//! // Format latencies for display
//! let latency = format_duration(Duration::from_micros(1500));
//! assert_eq!(latency, "1.50ms");
//!
//! // Validate configuration parameters
//! # fn main() -> anyhow::Result<()> {
//! validate_endpoint("localhost:3000")?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use std::time::Duration;
use uuid::Uuid;

/// Largest payload a UDP datagram can carry; response buffers beyond this are wasted
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Upper bound on workers per protocol
pub const MAX_WORKERS_PER_PROTOCOL: usize = 10_000;

/// Upper bound on any timing parameter (one week)
///
/// Keeps `Instant + Duration` arithmetic in the run loop far away from overflow.
pub const MAX_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Generate a unique identifier for a run
///
/// Creates a UUID v4 string attached to the JSON report so results from
/// several invocations can be told apart once collected elsewhere.
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Convert nanoseconds to a human-readable duration string
///
/// Convenience wrapper around [`format_duration`] for the nanosecond values
/// stored in the summary.
///
/// ## Examples
///
/// ```rust
/// # use transport_stress::utils::format_duration_ns;
/// assert_eq!(format_duration_ns(500), "500ns");
/// assert_eq!(format_duration_ns(1500), "1.50μs");
/// assert_eq!(format_duration_ns(1500000), "1.50ms");
/// ```
pub fn format_duration_ns(ns: u64) -> String {
    format_duration(Duration::from_nanos(ns))
}

/// Format a duration in a human-readable way
///
/// Automatically selects the most appropriate unit based on the magnitude.
///
/// ## Unit Selection Logic
///
/// - **Nanoseconds**: < 1,000 ns (e.g., "500ns")
/// - **Microseconds**: < 1,000,000 ns (e.g., "1.50μs")
/// - **Milliseconds**: < 1,000,000,000 ns (e.g., "25.75ms")
/// - **Seconds**: < 60 seconds (e.g., "5.25s")
/// - **Minutes and Hours**: For longer durations (e.g., "5m 30s", "2h 15m 30s")
///
/// ## Examples
///
/// ```rust
/// # use transport_stress::utils::format_duration;
/// # use std::time::Duration;
/// assert_eq!(format_duration(Duration::from_nanos(750)), "750ns");
/// assert_eq!(format_duration(Duration::from_nanos(1250)), "1.25μs");
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    const SUB_SECOND_UNITS: [(u128, &str); 2] = [(1_000, "μs"), (1_000_000, "ms")];

    let total_ns = duration.as_nanos();
    if total_ns < 1_000 {
        return format!("{}ns", total_ns);
    }
    if total_ns < 1_000_000_000 {
        let (scale, unit) = if total_ns < 1_000_000 {
            SUB_SECOND_UNITS[0]
        } else {
            SUB_SECOND_UNITS[1]
        };
        return format!("{:.2}{}", total_ns as f64 / scale as f64, unit);
    }

    let secs = duration.as_secs();
    match (secs / 3600, secs % 3600 / 60, secs % 60) {
        (0, 0, _) => format!("{:.2}s", duration.as_secs_f64()),
        (0, m, s) => format!("{}m {}s", m, s),
        (h, m, s) => format!("{}h {}m {}s", h, m, s),
    }
}

/// Format a ratio already expressed in percent, e.g. `12.5` -> "12.50%"
pub fn format_percentage(percent: f64) -> String {
    format!("{:.2}%", percent)
}

/// Validate an endpoint address of the form `host:port`
///
/// The host may be a name, an IPv4 address or a bracketed IPv6 address.
/// Resolution happens later, per worker, so an unknown host is not an error
/// here; it shows up as connect failures in the report.
///
/// ## Validation Rules
///
/// - A `:` separating host and port must be present
/// - The host must not be empty
/// - The port must be a number between 1 and 65535
pub fn validate_endpoint(endpoint: &str) -> Result<()> {
    let (host, port) = match endpoint.rsplit_once(':') {
        Some(parts) => parts,
        None => anyhow::bail!("Endpoint '{}' must be of the form host:port", endpoint),
    };

    if host.is_empty() {
        anyhow::bail!("Endpoint '{}' is missing a host", endpoint);
    }

    match port.parse::<u16>() {
        Ok(0) => anyhow::bail!("Endpoint '{}' cannot use port 0", endpoint),
        Ok(_) => Ok(()),
        Err(_) => anyhow::bail!("Endpoint '{}' has an invalid port '{}'", endpoint, port),
    }
}

/// Validate the response buffer size
///
/// ## Validation Rules
///
/// - **Minimum**: 1 byte, a zero-length read can never observe a response
/// - **Maximum**: 65,507 bytes, the largest possible UDP payload
pub fn validate_buffer_size(buffer_size: usize) -> Result<()> {
    if buffer_size == 0 {
        anyhow::bail!("Buffer size cannot be zero");
    }
    if buffer_size > MAX_DATAGRAM_SIZE {
        anyhow::bail!(
            "Buffer size {} is too large (maximum {} bytes)",
            buffer_size,
            MAX_DATAGRAM_SIZE
        );
    }
    Ok(())
}

/// Validate the number of simulated clients
///
/// Either protocol may be disabled with a count of zero, but a run needs at
/// least one worker overall.
pub fn validate_worker_counts(stream_workers: usize, datagram_workers: usize) -> Result<()> {
    if stream_workers == 0 && datagram_workers == 0 {
        anyhow::bail!("At least one TCP or UDP client is required");
    }
    for (label, count) in [("TCP", stream_workers), ("UDP", datagram_workers)] {
        if count > MAX_WORKERS_PER_PROTOCOL {
            anyhow::bail!(
                "{} client count {} is too high (maximum {})",
                label,
                count,
                MAX_WORKERS_PER_PROTOCOL
            );
        }
    }
    Ok(())
}

/// Validate a single catalog payload
///
/// Payloads are sent as one line over TCP, so an embedded newline would
/// split one request into two.
pub fn validate_message(message: &str) -> Result<()> {
    if message.is_empty() {
        anyhow::bail!("Sample messages cannot be empty");
    }
    if message.contains('\n') || message.contains('\r') {
        anyhow::bail!("Sample message {:?} must not contain line breaks", message);
    }
    if message.len() > MAX_DATAGRAM_SIZE {
        anyhow::bail!(
            "Sample message is {} bytes, larger than a UDP datagram",
            message.len()
        );
    }
    Ok(())
}

/// Validate that a timing parameter is non-zero and within [`MAX_DURATION`]
pub fn validate_non_zero(name: &str, duration: Duration) -> Result<()> {
    if duration.is_zero() {
        anyhow::bail!("{} must be greater than zero", name);
    }
    validate_max_duration(name, duration)
}

/// Validate that a timing parameter does not exceed [`MAX_DURATION`]
pub fn validate_max_duration(name: &str, duration: Duration) -> Result<()> {
    if duration > MAX_DURATION {
        anyhow::bail!(
            "{} of {} is too long (maximum {})",
            name,
            format_duration(duration),
            format_duration(MAX_DURATION)
        );
    }
    Ok(())
}
