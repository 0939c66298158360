//! Checker configuration with the shipped defaults.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::apex::ApexResult;
use crate::cache::ResultCache;
use crate::dns::TransportFactory;
use crate::error::{Result, VigilError};
use crate::fqdn::FqdnResult;
use crate::retry::RetryPolicy;
use crate::whois::{IpFamily, WhoisClient};

/// Public resolvers queried when the caller supplies no server list.
pub const DEFAULT_DNS_SERVERS: [&str; 4] = [
    "https://1.1.1.1",
    "https://1.0.0.1",
    "https://8.8.8.8",
    "https://8.8.4.4",
];

#[derive(Debug, Clone)]
pub struct DnsOptions {
    /// Server specs in `[scheme://]host[:port]` form.
    pub servers: Vec<String>,
    /// Non-empty answers required before a name counts as present.
    pub confirmations: u32,
    /// Attempt budget per probe run; `None` means one per server, and any
    /// value is clamped to the server count.
    pub max_attempts: Option<usize>,
    pub retry: RetryPolicy,
}

impl Default for DnsOptions {
    fn default() -> Self {
        Self {
            servers: DEFAULT_DNS_SERVERS.iter().map(|s| s.to_string()).collect(),
            confirmations: 2,
            max_attempts: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl DnsOptions {
    pub fn with_servers<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.servers = servers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_confirmations(mut self, confirmations: u32) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(VigilError::Config("dns.servers must not be empty".into()));
        }
        if self.confirmations == 0 {
            return Err(VigilError::Config("dns.confirmations must be at least 1".into()));
        }
        if self.max_attempts == Some(0) {
            return Err(VigilError::Config("dns.max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct WhoisOptions {
    /// Per-attempt timeout for the WHOIS exchange.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Preferred IP family when dialing WHOIS servers.
    pub family: Option<IpFamily>,
    /// Referral follow depth; `None` takes the client default.
    pub follow: Option<u8>,
    /// Extra TLD → server entries; they win over the built-in table.
    pub custom_servers: HashMap<String, String>,
    /// Verdict to assume when WHOIS infrastructure keeps failing.
    pub error_counts_as_alive: bool,
}

impl Default for WhoisOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            retry: RetryPolicy::default(),
            family: None,
            follow: None,
            custom_servers: HashMap::new(),
            error_counts_as_alive: true,
        }
    }
}

impl WhoisOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_family(mut self, family: IpFamily) -> Self {
        self.family = Some(family);
        self
    }

    pub fn with_follow(mut self, follow: u8) -> Self {
        self.follow = Some(follow);
        self
    }

    pub fn with_custom_servers(mut self, custom_servers: HashMap<String, String>) -> Self {
        self.custom_servers = custom_servers;
        self
    }

    pub fn with_error_counts_as_alive(mut self, error_counts_as_alive: bool) -> Self {
        self.error_counts_as_alive = error_counts_as_alive;
        self
    }
}

/// Everything a checker factory needs. The collaborator slots default to
/// the in-memory caches, the hickory transport factory, and the TCP WHOIS
/// client; tests and embedders swap them for their own implementations.
#[derive(Clone, Default)]
pub struct CheckerOptions {
    pub dns: DnsOptions,
    pub whois: WhoisOptions,
    pub apex_cache: Option<Arc<dyn ResultCache<ApexResult>>>,
    pub fqdn_cache: Option<Arc<dyn ResultCache<FqdnResult>>>,
    pub transport_factory: Option<Arc<dyn TransportFactory>>,
    pub whois_client: Option<Arc<dyn WhoisClient>>,
}

impl CheckerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dns(mut self, dns: DnsOptions) -> Self {
        self.dns = dns;
        self
    }

    pub fn with_whois(mut self, whois: WhoisOptions) -> Self {
        self.whois = whois;
        self
    }

    pub fn with_apex_cache(mut self, cache: Arc<dyn ResultCache<ApexResult>>) -> Self {
        self.apex_cache = Some(cache);
        self
    }

    pub fn with_fqdn_cache(mut self, cache: Arc<dyn ResultCache<FqdnResult>>) -> Self {
        self.fqdn_cache = Some(cache);
        self
    }

    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.transport_factory = Some(factory);
        self
    }

    pub fn with_whois_client(mut self, client: Arc<dyn WhoisClient>) -> Self {
        self.whois_client = Some(client);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_documented_values() {
        let dns = DnsOptions::default();
        assert_eq!(
            dns.servers,
            DEFAULT_DNS_SERVERS.iter().map(|s| s.to_string()).collect::<Vec<_>>()
        );
        assert_eq!(dns.confirmations, 2);
        assert_eq!(dns.max_attempts, None);
        assert_eq!(dns.retry.retries, 3);
        assert_eq!(dns.retry.min_timeout, Duration::from_millis(1000));
        assert_eq!(dns.retry.max_timeout, Duration::from_millis(16000));

        let whois = WhoisOptions::default();
        assert_eq!(whois.timeout, Duration::from_millis(5000));
        assert!(whois.error_counts_as_alive);
        assert!(whois.custom_servers.is_empty());
    }

    #[test]
    fn test_validation_rejects_degenerate_configs() {
        assert!(DnsOptions::default().validate().is_ok());
        assert!(DnsOptions::default().with_confirmations(0).validate().is_err());
        assert!(DnsOptions::default().with_max_attempts(0).validate().is_err());
        assert!(DnsOptions::default()
            .with_servers(Vec::<String>::new())
            .validate()
            .is_err());
    }
}
