//! Liveness of the registerable apex: NS probe first, WHOIS fallback.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::cache::{get_or_compute, MemoryCache, ResultCache};
use crate::coalesce::Coalescer;
use crate::dns::{DnsProbe, HickoryTransportFactory, ProbeOutcome, RecordType};
use crate::domain;
use crate::error::Result;
use crate::options::CheckerOptions;
use crate::whois::{TcpWhoisClient, TldWhoisMap, WhoisHeuristic};

/// Verdict for a registerable apex.
///
/// `registerable_domain` is `None` exactly when the input cannot be reduced
/// to a registerable name, and then `alive` is `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApexResult {
    pub registerable_domain: Option<String>,
    pub alive: bool,
}

impl ApexResult {
    pub(crate) fn null() -> Self {
        Self {
            registerable_domain: None,
            alive: false,
        }
    }
}

/// Decides whether an apex is a registered, delegated name.
///
/// Backed by a per-input coalescing lock and a result cache, both keyed by
/// the normalized *input*, not the derived apex: two inputs sharing an apex
/// deduplicate only when they normalize identically.
pub struct ApexChecker {
    inner: Arc<ApexInner>,
    coalescer: Coalescer<ApexResult>,
}

struct ApexInner {
    probe: DnsProbe,
    whois: WhoisHeuristic,
    cache: Arc<dyn ResultCache<ApexResult>>,
    error_counts_as_alive: bool,
}

impl ApexChecker {
    /// Configuration problems (bad server specs, zero thresholds) surface
    /// here; the checking operation itself never fails.
    pub fn new(options: CheckerOptions) -> Result<Self> {
        let factory = options
            .transport_factory
            .unwrap_or_else(|| Arc::new(HickoryTransportFactory));
        let probe = DnsProbe::from_options(&options.dns, factory)?;

        let whois_client = options
            .whois_client
            .unwrap_or_else(|| Arc::new(TcpWhoisClient::new()));
        let whois = WhoisHeuristic::new(
            whois_client,
            TldWhoisMap::with_overrides(&options.whois.custom_servers),
            options.whois.timeout,
            options.whois.retry.clone(),
            options.whois.family,
            options.whois.follow,
            options.whois.error_counts_as_alive,
        );

        let cache = options
            .apex_cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new()));

        Ok(Self {
            inner: Arc::new(ApexInner {
                probe,
                whois,
                cache,
                error_counts_as_alive: options.whois.error_counts_as_alive,
            }),
            coalescer: Coalescer::new(),
        })
    }

    /// Decides liveness of the apex of `domain`.
    ///
    /// Network trouble never escapes: every fragility collapses into the
    /// verdict, biased toward "alive" so list curation does not drop names
    /// on flaky infrastructure.
    #[instrument(skip(self), fields(domain = %domain))]
    pub async fn is_apex_alive(&self, domain: &str) -> ApexResult {
        let Some(key) = domain::to_ascii(domain) else {
            debug!("input does not normalize to a hostname");
            return ApexResult::null();
        };

        let inner = self.inner.clone();
        let work_key = key.clone();
        self.coalescer
            .run(&key, async move {
                get_or_compute(Some(&inner.cache), &work_key, || inner.check(&work_key)).await
            })
            .await
    }
}

impl ApexInner {
    async fn check(&self, name: &str) -> ApexResult {
        let Some(apex) = domain::registrable_apex(name) else {
            debug!(name, "no registerable apex");
            return ApexResult::null();
        };

        if self.probe.run(&apex, RecordType::NS).await == ProbeOutcome::Confirmed {
            debug!(apex = %apex, "NS probe confirmed delegation");
            return ApexResult {
                registerable_domain: Some(apex),
                alive: true,
            };
        }

        let alive = match self.whois.has_been_registered(&apex).await {
            Ok(registered) => registered,
            Err(e) => {
                debug!(apex = %apex, error = %e, "WHOIS gave no verdict, applying default");
                self.error_counts_as_alive
            }
        };

        ApexResult {
            registerable_domain: Some(apex),
            alive,
        }
    }
}
