use crate::cli::Protocol;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of a single request/response exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeResult {
    pub protocol: Protocol,
    /// Time from just before the send to the end of the receive.
    /// Zero when the send itself failed or no session could be established.
    pub latency: Duration,
    pub failed: bool,
}

impl ExchangeResult {
    pub fn success(protocol: Protocol, latency: Duration) -> Self {
        Self {
            protocol,
            latency,
            failed: false,
        }
    }

    pub fn failure(protocol: Protocol, latency: Duration) -> Self {
        Self {
            protocol,
            latency,
            failed: true,
        }
    }
}

/// Destination for exchange results, shared by every worker of a run
///
/// `record` may be called concurrently from any number of tasks. `snapshot`
/// observes everything recorded so far; the orchestrator only calls it once
/// all workers have been joined.
pub trait ResultSink: Send + Sync {
    fn record(&self, result: ExchangeResult);

    fn snapshot(&self) -> Vec<ExchangeResult>;
}

/// Mutex-guarded append-only result collection
#[derive(Debug, Default)]
pub struct SharedResults {
    results: Mutex<Vec<ExchangeResult>>,
}

impl SharedResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }
}

impl ResultSink for SharedResults {
    fn record(&self, result: ExchangeResult) {
        self.results.lock().push(result);
    }

    fn snapshot(&self) -> Vec<ExchangeResult> {
        self.results.lock().clone()
    }
}
