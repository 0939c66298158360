//! Liveness of a specific FQDN, gated on its apex verdict.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::apex::ApexChecker;
use crate::cache::{get_or_compute, MemoryCache, ResultCache};
use crate::coalesce::Coalescer;
use crate::dns::{DnsProbe, HickoryTransportFactory, ProbeOutcome, RecordType};
use crate::domain;
use crate::error::Result;
use crate::options::CheckerOptions;

/// Verdict for a fully-qualified name.
///
/// Invariants: `alive` implies `registerable_domain_alive`; a `None` apex
/// implies both flags false; when the input *is* its apex the two flags are
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FqdnResult {
    pub registerable_domain: Option<String>,
    pub registerable_domain_alive: bool,
    pub alive: bool,
}

impl FqdnResult {
    pub(crate) fn null() -> Self {
        Self {
            registerable_domain: None,
            registerable_domain_alive: false,
            alive: false,
        }
    }
}

/// Decides whether an FQDN resolves, after its apex proves alive.
///
/// Owns its own cache and coalescing lock keyed by the FQDN; the wrapped
/// [`ApexChecker`] keeps its own, so concurrent lookups of different names
/// under one apex serialize only where they actually share work.
pub struct FqdnChecker {
    apex: Arc<ApexChecker>,
    inner: Arc<FqdnInner>,
    coalescer: Coalescer<FqdnResult>,
}

struct FqdnInner {
    probe: DnsProbe,
    cache: Arc<dyn ResultCache<FqdnResult>>,
}

impl FqdnChecker {
    pub fn new(options: CheckerOptions) -> Result<Self> {
        let factory = options
            .transport_factory
            .clone()
            .unwrap_or_else(|| Arc::new(HickoryTransportFactory));
        let probe = DnsProbe::from_options(&options.dns, factory)?;
        let cache = options
            .fqdn_cache
            .clone()
            .unwrap_or_else(|| Arc::new(MemoryCache::new()));
        let apex = Arc::new(ApexChecker::new(options)?);

        Ok(Self {
            apex,
            inner: Arc::new(FqdnInner { probe, cache }),
            coalescer: Coalescer::new(),
        })
    }

    /// Decides liveness of `domain`.
    ///
    /// A dead apex settles the question without address probing, and an
    /// input equal to its apex inherits the apex verdict outright.
    #[instrument(skip(self), fields(domain = %domain))]
    pub async fn is_fqdn_alive(&self, domain: &str) -> FqdnResult {
        let Some(fqdn) = domain::to_ascii(domain) else {
            debug!("input does not normalize to a hostname");
            return FqdnResult::null();
        };

        let apex_verdict = self.apex.is_apex_alive(&fqdn).await;
        let Some(apex) = apex_verdict.registerable_domain else {
            return FqdnResult::null();
        };
        if !apex_verdict.alive {
            return FqdnResult {
                registerable_domain: Some(apex),
                registerable_domain_alive: false,
                alive: false,
            };
        }
        if fqdn == apex {
            return FqdnResult {
                registerable_domain: Some(apex),
                registerable_domain_alive: true,
                alive: true,
            };
        }

        let inner = self.inner.clone();
        let key = fqdn.clone();
        self.coalescer
            .run(&fqdn, async move {
                get_or_compute(Some(&inner.cache), &key, || inner.resolve(&key, apex)).await
            })
            .await
    }
}

impl FqdnInner {
    async fn resolve(&self, fqdn: &str, apex: String) -> FqdnResult {
        // A first, AAAA only if needed; each probe run shuffles its own
        // server order.
        let mut alive = self.probe.run(fqdn, RecordType::A).await == ProbeOutcome::Confirmed;
        if !alive {
            alive = self.probe.run(fqdn, RecordType::AAAA).await == ProbeOutcome::Confirmed;
        }
        debug!(fqdn, alive, "address probing settled");

        FqdnResult {
            registerable_domain: Some(apex),
            registerable_domain_alive: true,
            alive,
        }
    }
}
