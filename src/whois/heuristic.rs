//! Registration heuristics over WHOIS lookups.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use super::client::{IpFamily, WhoisClient, WhoisQueryOpts, DEFAULT_REFERRAL_DEPTH};
use super::record::WhoisRecord;
use super::servers::TldWhoisMap;
use crate::error::{Result, VigilError};
use crate::retry::{RetryExecutor, RetryPolicy, WhoisRetryClassifier};

/// What a lookup round actually told us. The two sentinels are
/// authoritative non-answers that must not be retried.
enum WhoisReply {
    Record(WhoisRecord),
    /// The client has no server for this TLD — no signal either way.
    TldUnsupported,
    /// The registry answered with nothing at all.
    NoData,
}

/// How a client error maps onto the retry machinery.
///
/// TODO: drop the message matching once the client grows typed errors; this
/// function is the only place that would change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorClass {
    TldUnsupported,
    TldNonexistent,
    NoData,
    Transient,
}

fn classify_error(message: &str) -> ErrorClass {
    if message.contains("TLD for \"") && message.contains("\" not supported") {
        ErrorClass::TldUnsupported
    } else if message.contains("Invalid TLD \"")
        || (message.contains("TLD \"") && message.contains("\" not found"))
    {
        ErrorClass::TldNonexistent
    } else if message.contains("No WHOIS data found") {
        ErrorClass::NoData
    } else {
        ErrorClass::Transient
    }
}

/// Decides whether an apex has been registered, from WHOIS evidence.
pub struct WhoisHeuristic {
    client: Arc<dyn WhoisClient>,
    servers: TldWhoisMap,
    timeout: Duration,
    retry: RetryPolicy,
    family: Option<IpFamily>,
    follow: u8,
    error_counts_as_alive: bool,
}

impl WhoisHeuristic {
    pub fn new(
        client: Arc<dyn WhoisClient>,
        servers: TldWhoisMap,
        timeout: Duration,
        retry: RetryPolicy,
        family: Option<IpFamily>,
        follow: Option<u8>,
        error_counts_as_alive: bool,
    ) -> Self {
        Self {
            client,
            servers,
            timeout,
            retry,
            family,
            follow: follow.unwrap_or(DEFAULT_REFERRAL_DEPTH),
            error_counts_as_alive,
        }
    }

    /// Returns whether `apex` looks registered.
    ///
    /// Fails only when the TLD cannot be determined or the client reports
    /// the TLD does not exist at all; both are converted to the configured
    /// default verdict by the apex checker. Transient trouble never
    /// escapes: retry exhaustion resolves to `error_counts_as_alive`.
    #[instrument(skip(self), fields(apex = %apex))]
    pub async fn has_been_registered(&self, apex: &str) -> Result<bool> {
        let tld = apex
            .rsplit('.')
            .next()
            .filter(|label| !label.is_empty())
            .ok_or_else(|| VigilError::TldExtraction(apex.to_string()))?;

        let opts = WhoisQueryOpts {
            server: self.servers.server_for(tld).map(String::from),
            timeout: self.timeout,
            family: self.family,
            follow: self.follow,
        };

        let executor = RetryExecutor::new(self.retry.clone(), WhoisRetryClassifier);
        let outcome = executor
            .execute(|| async {
                match self.client.lookup(apex, &opts).await {
                    Ok(record) => Ok(WhoisReply::Record(record)),
                    Err(e) => match classify_error(&e.to_string()) {
                        ErrorClass::TldUnsupported => Ok(WhoisReply::TldUnsupported),
                        ErrorClass::NoData => Ok(WhoisReply::NoData),
                        ErrorClass::TldNonexistent => Err(VigilError::WhoisQuery {
                            domain: apex.to_string(),
                            message: e.to_string(),
                        }),
                        ErrorClass::Transient => Err(e),
                    },
                }
            })
            .await;

        match outcome {
            Ok(WhoisReply::Record(record)) => {
                let registered = record.indicates_registration();
                debug!(registered, "classified WHOIS record");
                Ok(registered)
            }
            // No server knows this TLD: assume registered, we have no signal.
            Ok(WhoisReply::TldUnsupported) => Ok(true),
            // An authoritative "nothing here".
            Ok(WhoisReply::NoData) => Ok(false),
            Err(e @ VigilError::WhoisQuery { .. }) => Err(e),
            Err(e) => {
                warn!(error = %e, fallback = self.error_counts_as_alive, "WHOIS lookup kept failing");
                Ok(self.error_counts_as_alive)
            }
        }
    }
}
