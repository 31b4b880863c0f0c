//! The simulated client.
//!
//! A [`ClientWorker`] connects one transport, then runs exchanges back to
//! back, pacing each by a fixed interval, until the shared deadline passes or
//! its transport reports a failure it cannot recover from. Every exchange,
//! successful or not, lands in the shared [`ResultSink`].

use crate::cli::Protocol;
use crate::results::{ExchangeResult, ResultSink};
use crate::samples::SampleSource;
use crate::transport::{Transport, TransportConfig, TransportFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace, warn};

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerExit {
    /// The shared deadline passed; the normal way out
    DeadlineReached,
    /// The transport could not be resolved, bound or connected
    ConnectFailed,
    /// A request could not be sent
    SendFailed,
    /// A response could not be read from a transport that cannot recover
    ReceiveFailed,
}

/// Summary a worker hands back to the orchestrator when it exits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerOutcome {
    pub worker_id: usize,
    pub protocol: Protocol,
    /// Results this worker recorded into the sink
    pub recorded: usize,
    /// How many of those were failures
    pub failures: usize,
    pub exit: WorkerExit,
}

pub struct ClientWorker {
    id: usize,
    protocol: Protocol,
    samples: SampleSource,
    sink: Arc<dyn ResultSink>,
    deadline: Instant,
    pacing: Duration,
    recorded: usize,
    failures: usize,
}

impl ClientWorker {
    pub fn new(
        id: usize,
        protocol: Protocol,
        samples: SampleSource,
        sink: Arc<dyn ResultSink>,
        deadline: Instant,
        pacing: Duration,
    ) -> Self {
        Self {
            id,
            protocol,
            samples,
            sink,
            deadline,
            pacing,
            recorded: 0,
            failures: 0,
        }
    }

    /// Connect a transport and run the exchange loop until the worker exits
    ///
    /// A connection failure is recorded as a single failed exchange with zero
    /// latency; the worker does not retry.
    pub async fn run(mut self, config: &TransportConfig) -> WorkerOutcome {
        let exit = match TransportFactory::connect(self.protocol, config).await {
            Ok(mut transport) => {
                debug!(
                    "{} worker {} connected to {}",
                    self.protocol,
                    self.id,
                    transport.peer_addr()
                );
                self.drive(transport.as_mut()).await
            }
            Err(e) => {
                if e.is_setup_failure() {
                    debug!(
                        "{} worker {} could not establish its transport: {}",
                        self.protocol, self.id, e
                    );
                } else {
                    warn!(
                        "{} worker {} failed unexpectedly while connecting: {}",
                        self.protocol, self.id, e
                    );
                }
                self.record(ExchangeResult::failure(self.protocol, Duration::ZERO));
                WorkerExit::ConnectFailed
            }
        };

        // The transport was dropped at the end of the match arm above.
        self.finish(exit)
    }

    /// Run exchanges over an already established transport
    ///
    /// Latency is measured from just before the send until the receive
    /// completes. Send failures always end the loop; receive failures end it
    /// only when the transport says they are fatal. A non-fatal receive
    /// failure retries straight away, without the pacing sleep.
    pub async fn drive(&mut self, transport: &mut dyn Transport) -> WorkerExit {
        while Instant::now() < self.deadline {
            let payload = self.samples.next_message().to_owned();

            let start = Instant::now();
            if let Err(e) = transport.send(&payload).await {
                debug!("{} worker {} send failed: {}", self.protocol, self.id, e);
                self.record(ExchangeResult::failure(self.protocol, Duration::ZERO));
                return WorkerExit::SendFailed;
            }

            match transport.receive().await {
                Ok(bytes) => {
                    let latency = start.elapsed();
                    trace!(
                        "{} worker {} received {} bytes in {:?}",
                        self.protocol,
                        self.id,
                        bytes,
                        latency
                    );
                    self.record(ExchangeResult::success(self.protocol, latency));
                }
                Err(e) => {
                    let latency = start.elapsed();
                    self.record(ExchangeResult::failure(self.protocol, latency));
                    if transport.receive_failure_is_fatal() {
                        debug!("{} worker {} receive failed: {}", self.protocol, self.id, e);
                        return WorkerExit::ReceiveFailed;
                    }
                    trace!("{} worker {} lost an exchange: {}", self.protocol, self.id, e);
                    continue;
                }
            }

            // Pace the next exchange, but never sleep past the deadline.
            let wake = Instant::now()
                .checked_add(self.pacing)
                .map_or(self.deadline, |wake| wake.min(self.deadline));
            sleep_until(wake).await;
        }

        WorkerExit::DeadlineReached
    }

    fn record(&mut self, result: ExchangeResult) {
        self.recorded += 1;
        if result.failed {
            self.failures += 1;
        }
        self.sink.record(result);
    }

    fn finish(self, exit: WorkerExit) -> WorkerOutcome {
        debug!(
            "{} worker {} exited ({:?}) after {} exchanges, {} failed",
            self.protocol, self.id, exit, self.recorded, self.failures
        );
        WorkerOutcome {
            worker_id: self.id,
            protocol: self.protocol,
            recorded: self.recorded,
            failures: self.failures,
            exit,
        }
    }
}
