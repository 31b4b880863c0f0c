use crate::cli::Protocol;
use crate::results::ExchangeResult;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;

/// Aggregate statistics for one protocol
///
/// Latency figures only cover successful exchanges. When a protocol has no
/// successes the average is zero and min/max are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolStats {
    pub protocol: Protocol,
    /// Successful plus failed exchanges
    pub exchanges: usize,
    pub failures: usize,
    pub average_latency_ns: u64,
    pub min_latency_ns: Option<u64>,
    pub max_latency_ns: Option<u64>,
}

impl ProtocolStats {
    /// Compute statistics for `protocol` over a frozen result set
    ///
    /// Results tagged with the other protocol are ignored.
    pub fn from_results(protocol: Protocol, results: &[ExchangeResult]) -> Self {
        let mut exchanges = 0;
        let mut failures = 0;
        let mut successes: u128 = 0;
        let mut total_ns: u128 = 0;
        let mut min_ns: Option<u64> = None;
        let mut max_ns: Option<u64> = None;

        for result in results.iter().filter(|r| r.protocol == protocol) {
            exchanges += 1;
            if result.failed {
                failures += 1;
                continue;
            }

            let latency_ns = duration_to_ns(result.latency);
            successes += 1;
            total_ns += latency_ns as u128;
            min_ns = Some(min_ns.map_or(latency_ns, |min| min.min(latency_ns)));
            max_ns = Some(max_ns.map_or(latency_ns, |max| max.max(latency_ns)));
        }

        let average_latency_ns = if successes > 0 {
            (total_ns / successes) as u64
        } else {
            0
        };

        Self {
            protocol,
            exchanges,
            failures,
            average_latency_ns,
            min_latency_ns: min_ns,
            max_latency_ns: max_ns,
        }
    }

    pub fn successes(&self) -> usize {
        self.exchanges - self.failures
    }

    /// Whether any successful exchange contributed latency figures
    pub fn has_latency_data(&self) -> bool {
        self.successes() > 0
    }

    /// Failed exchanges as a percentage of all exchanges; zero when nothing ran
    pub fn error_rate_percent(&self) -> f64 {
        if self.exchanges == 0 {
            0.0
        } else {
            self.failures as f64 * 100.0 / self.exchanges as f64
        }
    }

    pub fn average_latency(&self) -> Duration {
        Duration::from_nanos(self.average_latency_ns)
    }

    pub fn min_latency(&self) -> Option<Duration> {
        self.min_latency_ns.map(Duration::from_nanos)
    }

    pub fn max_latency(&self) -> Option<Duration> {
        self.max_latency_ns.map(Duration::from_nanos)
    }
}

fn duration_to_ns(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Outcome of one head-to-head comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Winner(Protocol),
    Similar,
}

impl Verdict {
    fn from_ordering(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Verdict::Winner(Protocol::Stream),
            Ordering::Greater => Verdict::Winner(Protocol::Datagram),
            Ordering::Equal => Verdict::Similar,
        }
    }
}

/// Qualitative comparison of the two protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    /// Lower average latency wins
    pub latency: Verdict,
    /// Fewer failed exchanges wins
    pub errors: Verdict,
}

impl Comparison {
    /// Compare stream statistics against datagram statistics
    ///
    /// A protocol without a single successful exchange has no latency to
    /// compare and cannot win the latency verdict.
    pub fn between(stream: &ProtocolStats, datagram: &ProtocolStats) -> Self {
        let latency = match (stream.has_latency_data(), datagram.has_latency_data()) {
            (true, true) => Verdict::from_ordering(
                stream
                    .average_latency_ns
                    .cmp(&datagram.average_latency_ns),
            ),
            (true, false) => Verdict::Winner(Protocol::Stream),
            (false, true) => Verdict::Winner(Protocol::Datagram),
            (false, false) => Verdict::Similar,
        };

        let errors = Verdict::from_ordering(stream.failures.cmp(&datagram.failures));

        Self { latency, errors }
    }
}

/// Everything the report shows, computed once from the final result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub stream: ProtocolStats,
    pub datagram: ProtocolStats,
    pub comparison: Comparison,
}

impl Summary {
    /// Summarize a snapshot of the result sink
    ///
    /// Deterministic for a given input and independent of result order.
    pub fn from_results(results: &[ExchangeResult]) -> Self {
        let stream = ProtocolStats::from_results(Protocol::Stream, results);
        let datagram = ProtocolStats::from_results(Protocol::Datagram, results);
        let comparison = Comparison::between(&stream, &datagram);

        Self {
            stream,
            datagram,
            comparison,
        }
    }

    pub fn stats(&self, protocol: Protocol) -> &ProtocolStats {
        match protocol {
            Protocol::Stream => &self.stream,
            Protocol::Datagram => &self.datagram,
        }
    }

    pub fn total_exchanges(&self) -> usize {
        self.stream.exchanges + self.datagram.exchanges
    }
}
