//! Typed resolver construction over UDP, TCP, DoT, and DoH upstreams.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::proto::rr::RecordType as HickoryRecordType;
use hickory_resolver::TokioAsyncResolver;
use serde::{Deserialize, Serialize};

use super::server::{DnsScheme, DnsServerSpec};
use crate::error::{Result, VigilError};

/// Per-query timeout inside a single transport invocation. Retries and
/// attempt accounting live in the probe, not here.
const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    AAAA,
    NS,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::AAAA => write!(f, "AAAA"),
            RecordType::NS => write!(f, "NS"),
        }
    }
}

/// A single upstream resolver.
///
/// `query` returns the rendered answer records. An empty Vec means the
/// upstream answered with nothing usable — NXDOMAIN, NODATA, and SOA-only
/// referrals all land here; only transport-level failures are errors.
#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<String>>;
}

/// Builds one transport per server spec. The probe constructs a fresh set
/// for every run, so implementations must be cheap to invoke.
pub trait TransportFactory: Send + Sync {
    fn create(&self, spec: &DnsServerSpec) -> Arc<dyn DnsTransport>;
}

/// The default factory: one hickory resolver per spec.
#[derive(Debug, Clone, Default)]
pub struct HickoryTransportFactory;

impl TransportFactory for HickoryTransportFactory {
    fn create(&self, spec: &DnsServerSpec) -> Arc<dyn DnsTransport> {
        Arc::new(HickoryTransport::new(spec))
    }
}

struct HickoryTransport {
    resolver: TokioAsyncResolver,
    server: String,
}

impl HickoryTransport {
    fn new(spec: &DnsServerSpec) -> Self {
        let socket_addr = SocketAddr::new(spec.host, spec.port);
        let protocol = match spec.scheme {
            DnsScheme::Udp => Protocol::Udp,
            DnsScheme::Tcp => Protocol::Tcp,
            DnsScheme::Tls => Protocol::Tls,
            DnsScheme::Https => Protocol::Https,
        };

        let mut ns = NameServerConfig::new(socket_addr, protocol);
        if matches!(spec.scheme, DnsScheme::Tls | DnsScheme::Https) {
            ns.tls_dns_name = Some(spec.host.to_string());
        }

        let mut config = ResolverConfig::new();
        config.add_name_server(ns);

        let mut opts = ResolverOpts::default();
        opts.timeout = QUERY_TIMEOUT;
        opts.attempts = 1;
        opts.use_hosts_file = false;
        opts.cache_size = 0;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            server: spec.raw.clone(),
        }
    }
}

#[async_trait]
impl DnsTransport for HickoryTransport {
    async fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<String>> {
        let rtype = match record_type {
            RecordType::A => HickoryRecordType::A,
            RecordType::AAAA => HickoryRecordType::AAAA,
            RecordType::NS => HickoryRecordType::NS,
        };

        match self.resolver.lookup(name, rtype).await {
            Ok(lookup) => Ok(lookup
                .record_iter()
                .filter_map(|record| record.data().map(|data| data.to_string()))
                .collect()),
            Err(e) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => Ok(Vec::new()),
                _ => Err(VigilError::DnsError(format!(
                    "{record_type} query for {name} via {} failed: {e}",
                    self.server
                ))),
            },
        }
    }
}
