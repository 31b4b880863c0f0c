//! Request payloads.
//!
//! Every worker owns a [`SampleSource`] with its own random generator, so no
//! generator state is shared between tasks. All sources of one run share the
//! same immutable [`SampleCatalog`].

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Payload the echo servers treat as "end this session"
pub const TERMINATION_MESSAGE: &str = "bye";

/// The built-in catalog of representative chat traffic
pub const DEFAULT_MESSAGES: &[&str] = &[
    "Hello",
    "/time",
    "/date",
    "/echo test",
    TERMINATION_MESSAGE,
    "/help",
    "/nocknock",
    "How are you?",
    "/clients",
];

/// A validated, non-empty set of request payloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleCatalog {
    messages: Arc<[String]>,
}

impl Default for SampleCatalog {
    fn default() -> Self {
        Self {
            messages: DEFAULT_MESSAGES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl SampleCatalog {
    /// Build a catalog from user supplied payloads
    ///
    /// Messages must be non-empty and free of newlines, since the stream
    /// transport frames each request with a trailing `\n`.
    pub fn new(messages: Vec<String>) -> Result<Self> {
        if messages.is_empty() {
            return Err(anyhow!("Sample catalog must contain at least one message"));
        }

        for message in &messages {
            crate::utils::validate_message(message)?;
        }

        Ok(Self {
            messages: messages.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn contains(&self, message: &str) -> bool {
        self.messages.iter().any(|m| m == message)
    }
}

/// Uniform random draws, with replacement, from a [`SampleCatalog`]
pub struct SampleSource {
    catalog: SampleCatalog,
    rng: StdRng,
}

impl SampleSource {
    /// A source seeded from OS entropy; draws differ from run to run
    pub fn from_entropy(catalog: SampleCatalog) -> Self {
        Self {
            catalog,
            rng: StdRng::from_entropy(),
        }
    }

    /// A deterministic source for reproducible request sequences
    pub fn seeded(catalog: SampleCatalog, seed: u64) -> Self {
        Self {
            catalog,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw the next payload
    pub fn next_message(&mut self) -> &str {
        // The catalog is never empty, see SampleCatalog::new.
        let index = self.rng.gen_range(0..self.catalog.messages.len());
        &self.catalog.messages[index]
    }
}
