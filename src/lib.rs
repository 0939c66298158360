//! Decides whether domain names are alive: a registerable apex must be a
//! registered, delegated name (NS probing with a WHOIS fallback) and the
//! specific FQDN must actually resolve (A, then AAAA). Built for list
//! curation and abuse pipelines that have to tolerate flaky DNS and WHOIS
//! infrastructure, so every network fragility collapses into a verdict
//! instead of an error.

pub mod apex;
pub mod cache;
pub mod coalesce;
pub mod dns;
pub mod domain;
pub mod error;
pub mod fqdn;
pub mod options;
pub mod retry;
pub mod whois;

pub use error::{Result, VigilError};

pub use apex::{ApexChecker, ApexResult};
pub use fqdn::{FqdnChecker, FqdnResult};
pub use options::{CheckerOptions, DnsOptions, WhoisOptions, DEFAULT_DNS_SERVERS};

pub use cache::{MemoryCache, ResultCache};
pub use coalesce::Coalescer;
pub use dns::{DnsProbe, DnsScheme, DnsServerSpec, DnsTransport, ProbeOutcome, RecordType, TransportFactory};
pub use retry::RetryPolicy;
pub use whois::{
    IpFamily, TcpWhoisClient, TldWhoisMap, WhoisClient, WhoisField, WhoisHeuristic,
    WhoisQueryOpts, WhoisRecord,
};
