//! Scripted collaborators shared by the liveness scenarios.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use vigil::whois::WhoisQueryOpts;
use vigil::{
    CheckerOptions, DnsOptions, DnsServerSpec, DnsTransport, RecordType, Result, RetryPolicy,
    TransportFactory, VigilError, WhoisClient, WhoisOptions, WhoisRecord,
};

/// Scripted DNS upstreams: every server answers a query from the same
/// table, and every query is logged so tests can count resolver traffic.
#[derive(Default)]
pub struct StubNet {
    answers: Mutex<HashMap<(RecordType, String), Vec<String>>>,
    log: Mutex<Vec<(RecordType, String)>>,
    delay: Mutex<Option<Duration>>,
}

impl StubNet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answer(&self, record_type: RecordType, name: &str, answers: &[&str]) {
        self.answers.lock().unwrap().insert(
            (record_type, name.to_string()),
            answers.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// Makes every query pause, widening the in-flight window for
    /// coalescing tests.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn queries(&self, record_type: RecordType) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(rt, _)| *rt == record_type)
            .count()
    }

    pub fn total_queries(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

pub struct StubFactory(pub Arc<StubNet>);

impl TransportFactory for StubFactory {
    fn create(&self, _spec: &DnsServerSpec) -> Arc<dyn DnsTransport> {
        Arc::new(StubTransport(self.0.clone()))
    }
}

struct StubTransport(Arc<StubNet>);

#[async_trait]
impl DnsTransport for StubTransport {
    async fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<String>> {
        let delay = *self.0.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.0
            .log
            .lock()
            .unwrap()
            .push((record_type, name.to_string()));
        Ok(self
            .0
            .answers
            .lock()
            .unwrap()
            .get(&(record_type, name.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// What the scripted WHOIS collaborator does for one domain.
pub enum WhoisScript {
    Raw(&'static str),
    Fail(&'static str),
}

/// Scripted WHOIS client keyed by queried domain. Unscripted domains get
/// the "TLD not supported" message, like a client with no server hint.
#[derive(Default)]
pub struct StubWhois {
    scripts: Mutex<HashMap<String, WhoisScript>>,
    pub calls: AtomicUsize,
}

impl StubWhois {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, domain: &str, script: WhoisScript) {
        self.scripts
            .lock()
            .unwrap()
            .insert(domain.to_string(), script);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WhoisClient for StubWhois {
    async fn lookup(&self, domain: &str, _opts: &WhoisQueryOpts) -> Result<WhoisRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scripts.lock().unwrap().get(domain) {
            Some(WhoisScript::Raw(raw)) => Ok(WhoisRecord {
                raw: Some(raw.to_string()),
                fields: Default::default(),
            }),
            Some(WhoisScript::Fail(message)) => Err(VigilError::WhoisError(message.to_string())),
            None => Err(VigilError::WhoisError(format!(
                "TLD for \"{domain}\" not supported"
            ))),
        }
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new()
        .with_min_timeout(Duration::from_millis(1))
        .with_max_timeout(Duration::from_millis(1))
}

/// Four stub servers, fast retries, scripted collaborators.
pub fn stub_options(net: &Arc<StubNet>, whois: &Arc<StubWhois>) -> CheckerOptions {
    CheckerOptions::new()
        .with_dns(
            DnsOptions::default()
                .with_servers(["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"])
                .with_retry(fast_retry()),
        )
        .with_whois(WhoisOptions::default().with_retry(fast_retry()))
        .with_transport_factory(Arc::new(StubFactory(net.clone())))
        .with_whois_client(whois.clone())
}
