//! Confirmation-threshold probing across a shuffled server list.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{debug, instrument, warn};

use super::server::DnsServerSpec;
use super::transport::{DnsTransport, RecordType, TransportFactory};
use crate::retry::{DnsRetryClassifier, RetryExecutor, RetryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Confirmed,
    NotConfirmed,
}

/// Runs one record-type query against several upstreams until enough of
/// them confirm it.
///
/// Attempts are strictly serial: attempt N starts only after attempt N-1
/// settles, including its retry budget. That bounds pressure on upstreams
/// at one in-flight query per probe run.
#[derive(Clone)]
pub struct DnsProbe {
    servers: Vec<DnsServerSpec>,
    confirmations: u32,
    max_attempts: usize,
    retry: RetryPolicy,
    factory: Arc<dyn TransportFactory>,
}

impl DnsProbe {
    /// Builds a probe from checker options, parsing every server spec up
    /// front so malformed configuration fails at construction.
    pub fn from_options(
        options: &crate::options::DnsOptions,
        factory: Arc<dyn TransportFactory>,
    ) -> crate::error::Result<Self> {
        options.validate()?;
        let servers = options
            .servers
            .iter()
            .map(|s| DnsServerSpec::parse(s))
            .collect::<crate::error::Result<Vec<_>>>()?;
        Ok(Self::new(
            servers,
            options.confirmations,
            options.max_attempts,
            options.retry.clone(),
            factory,
        ))
    }

    /// `max_attempts` is clamped to the server count; `None` means one
    /// attempt per server.
    pub fn new(
        servers: Vec<DnsServerSpec>,
        confirmations: u32,
        max_attempts: Option<usize>,
        retry: RetryPolicy,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        let max_attempts = max_attempts.unwrap_or(servers.len()).min(servers.len());
        Self {
            servers,
            confirmations,
            max_attempts,
            retry,
            factory,
        }
    }

    /// Probes `name` for `record_type`.
    ///
    /// Confirmed as soon as the threshold of non-empty answers is reached;
    /// a retry-exhausted attempt logs and counts as non-confirming rather
    /// than aborting the probe.
    #[instrument(skip(self), fields(name = %name, record_type = %record_type))]
    pub async fn run(&self, name: &str, record_type: RecordType) -> ProbeOutcome {
        // Shuffle a copy; the configured list is caller-owned and read-only.
        let mut order = self.servers.clone();
        order.shuffle(&mut rand::thread_rng());
        let transports: Vec<Arc<dyn DnsTransport>> =
            order.iter().map(|spec| self.factory.create(spec)).collect();

        let executor = RetryExecutor::new(self.retry.clone(), DnsRetryClassifier);
        let mut confirmations = 0u32;

        for attempt in 0..self.max_attempts {
            let server = &order[attempt % order.len()];
            let transport = &transports[attempt % transports.len()];

            match executor.execute(|| transport.query(name, record_type)).await {
                Ok(answers) if !answers.is_empty() => {
                    confirmations += 1;
                    debug!(
                        server = %server,
                        answers = answers.len(),
                        confirmations,
                        "attempt confirmed"
                    );
                    if confirmations >= self.confirmations {
                        return ProbeOutcome::Confirmed;
                    }
                }
                Ok(_) => {
                    debug!(server = %server, "attempt returned no answers");
                }
                Err(e) => {
                    warn!(server = %server, error = %e, "attempt failed after retries");
                }
            }
        }

        ProbeOutcome::NotConfirmed
    }
}
