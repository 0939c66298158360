//! End-to-end liveness scenarios against scripted collaborators.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{stub_options, StubNet, StubWhois, WhoisScript};
use futures::future::join_all;
use vigil::{ApexChecker, ApexResult, FqdnChecker, FqdnResult, MemoryCache, RecordType, ResultCache};

fn apex_result(domain: &str, alive: bool) -> ApexResult {
    ApexResult {
        registerable_domain: Some(domain.to_string()),
        alive,
    }
}

fn fqdn_result(domain: &str, apex_alive: bool, alive: bool) -> FqdnResult {
    FqdnResult {
        registerable_domain: Some(domain.to_string()),
        registerable_domain_alive: apex_alive,
        alive,
    }
}

#[tokio::test]
async fn test_delegated_apex_is_alive_without_whois() {
    let net = StubNet::new();
    net.answer(RecordType::NS, "example.com", &["ns1.example.com.", "ns2.example.com."]);
    let whois = StubWhois::new();
    let checker = ApexChecker::new(stub_options(&net, &whois)).unwrap();

    let verdict = checker.is_apex_alive("example.com").await;

    assert_eq!(verdict, apex_result("example.com", true));
    // The fast path settled it; WHOIS must not have been consulted.
    assert_eq!(whois.call_count(), 0);
    assert_eq!(net.queries(RecordType::NS), 2);
}

#[tokio::test]
async fn test_undelegated_apex_with_dead_whois_text_is_dead() {
    let net = StubNet::new();
    let whois = StubWhois::new();
    whois.script("example2.com", WhoisScript::Raw("No match for EXAMPLE2.COM\r\n"));
    let checker = ApexChecker::new(stub_options(&net, &whois)).unwrap();

    let verdict = checker.is_apex_alive("sub.example2.com").await;

    assert_eq!(verdict, apex_result("example2.com", false));
    assert_eq!(whois.call_count(), 1);
    // The probe walked all four servers before falling back.
    assert_eq!(net.queries(RecordType::NS), 4);
}

#[tokio::test]
async fn test_nonexistent_tld_applies_the_configured_default() {
    let net = StubNet::new();
    let whois = StubWhois::new();
    whois.script("foo.zzz", WhoisScript::Fail("TLD \"zzz\" not found"));
    let checker = ApexChecker::new(stub_options(&net, &whois)).unwrap();
    assert_eq!(checker.is_apex_alive("foo.zzz").await, apex_result("foo.zzz", true));

    let net = StubNet::new();
    let whois = StubWhois::new();
    whois.script("foo.zzz", WhoisScript::Fail("TLD \"zzz\" not found"));
    let mut options = stub_options(&net, &whois);
    options.whois.error_counts_as_alive = false;
    let checker = ApexChecker::new(options).unwrap();
    assert_eq!(checker.is_apex_alive("foo.zzz").await, apex_result("foo.zzz", false));
}

#[tokio::test]
async fn test_soa_only_delegation_falls_back_to_whois_evidence() {
    // NS answers stay empty (the transports model SOA-in-authority as "no
    // answers"), but the registry knows the name: alive via WHOIS.
    let net = StubNet::new();
    let whois = StubWhois::new();
    whois.script(
        "tencentcloud.com",
        WhoisScript::Raw(
            "Domain Name: tencentcloud.com\r\nRegistrar: DNSPod, Inc.\r\nName Server: ns1.tencentcloud.com\r\n",
        ),
    );
    let checker = ApexChecker::new(stub_options(&net, &whois)).unwrap();

    let verdict = checker.is_apex_alive("tencentcloud.com").await;

    assert_eq!(verdict, apex_result("tencentcloud.com", true));
    assert_eq!(whois.call_count(), 1);
}

#[tokio::test]
async fn test_fqdn_with_addresses_is_alive() {
    let net = StubNet::new();
    net.answer(RecordType::NS, "example.com", &["ns1.example.com."]);
    net.answer(RecordType::A, "a.example.com", &["192.0.2.10", "192.0.2.11"]);
    let whois = StubWhois::new();
    let checker = FqdnChecker::new(stub_options(&net, &whois)).unwrap();

    let verdict = checker.is_fqdn_alive("a.example.com").await;

    assert_eq!(verdict, fqdn_result("example.com", true, true));
    // A confirmed at the threshold; AAAA never ran.
    assert_eq!(net.queries(RecordType::A), 2);
    assert_eq!(net.queries(RecordType::AAAA), 0);
}

#[tokio::test]
async fn test_fqdn_without_addresses_is_dead_but_apex_alive() {
    let net = StubNet::new();
    net.answer(RecordType::NS, "example.com", &["ns1.example.com."]);
    let whois = StubWhois::new();
    let checker = FqdnChecker::new(stub_options(&net, &whois)).unwrap();

    let verdict = checker.is_fqdn_alive("ghost.example.com").await;

    assert_eq!(verdict, fqdn_result("example.com", true, false));
    // Both address families were exhausted across all four servers.
    assert_eq!(net.queries(RecordType::A), 4);
    assert_eq!(net.queries(RecordType::AAAA), 4);
}

#[tokio::test]
async fn test_dead_apex_short_circuits_address_probing() {
    let net = StubNet::new();
    let whois = StubWhois::new();
    whois.script("example2.com", WhoisScript::Raw("No match for EXAMPLE2.COM"));
    let checker = FqdnChecker::new(stub_options(&net, &whois)).unwrap();

    let verdict = checker.is_fqdn_alive("host.example2.com").await;

    assert_eq!(verdict, fqdn_result("example2.com", false, false));
    assert_eq!(net.queries(RecordType::A), 0);
    assert_eq!(net.queries(RecordType::AAAA), 0);
}

#[tokio::test]
async fn test_apex_identical_input_inherits_the_apex_verdict() {
    let net = StubNet::new();
    net.answer(RecordType::NS, "example.com", &["ns1.example.com."]);
    let whois = StubWhois::new();
    let checker = FqdnChecker::new(stub_options(&net, &whois)).unwrap();

    let verdict = checker.is_fqdn_alive("example.com").await;

    assert_eq!(verdict, fqdn_result("example.com", true, true));
    assert_eq!(net.queries(RecordType::A), 0);
    assert_eq!(net.queries(RecordType::AAAA), 0);
}

#[tokio::test]
async fn test_null_inputs_propagate_through_both_checkers() {
    let net = StubNet::new();
    let whois = StubWhois::new();
    let apex = ApexChecker::new(stub_options(&net, &whois)).unwrap();
    let fqdn = FqdnChecker::new(stub_options(&net, &whois)).unwrap();

    for input in ["localhost", "127.0.0.1", "com", ""] {
        assert_eq!(apex.is_apex_alive(input).await, ApexResult { registerable_domain: None, alive: false });
        assert_eq!(
            fqdn.is_fqdn_alive(input).await,
            FqdnResult {
                registerable_domain: None,
                registerable_domain_alive: false,
                alive: false
            }
        );
    }
    assert_eq!(net.total_queries(), 0);
    assert_eq!(whois.call_count(), 0);
}

#[tokio::test]
async fn test_concurrent_lookups_coalesce_to_one_computation() {
    let net = StubNet::new();
    net.answer(RecordType::NS, "example.com", &["ns1.example.com."]);
    net.set_delay(Duration::from_millis(20));
    let whois = StubWhois::new();
    let checker = Arc::new(ApexChecker::new(stub_options(&net, &whois)).unwrap());

    let lookups = (0..8).map(|_| {
        let checker = checker.clone();
        async move { checker.is_apex_alive("example.com").await }
    });
    let verdicts = join_all(lookups).await;

    for verdict in verdicts {
        assert_eq!(verdict, apex_result("example.com", true));
    }
    // One computation: two confirming NS queries, total.
    assert_eq!(net.queries(RecordType::NS), 2);
}

#[tokio::test]
async fn test_verdicts_persist_in_the_supplied_cache() {
    let net = StubNet::new();
    net.answer(RecordType::NS, "example.com", &["ns1.example.com."]);
    let whois = StubWhois::new();
    let cache: Arc<dyn ResultCache<ApexResult>> = Arc::new(MemoryCache::new());
    let options = stub_options(&net, &whois).with_apex_cache(cache.clone());
    let checker = ApexChecker::new(options).unwrap();

    let first = checker.is_apex_alive("example.com").await;
    assert_eq!(cache.get("example.com").await, Some(first.clone()));

    let queries_after_first = net.total_queries();
    let second = checker.is_apex_alive("example.com").await;
    assert_eq!(second, first);
    assert_eq!(net.total_queries(), queries_after_first);
    assert_eq!(whois.call_count(), 0);
}

#[tokio::test]
async fn test_distinct_inputs_under_one_apex_compute_separately() {
    // Both the cache and the coalescer key on the normalized input, so two
    // names sharing an apex probe twice.
    let net = StubNet::new();
    net.answer(RecordType::NS, "example.com", &["ns1.example.com."]);
    let whois = StubWhois::new();
    let checker = ApexChecker::new(stub_options(&net, &whois)).unwrap();

    assert_eq!(checker.is_apex_alive("a.example.com").await, apex_result("example.com", true));
    assert_eq!(checker.is_apex_alive("b.example.com").await, apex_result("example.com", true));
    assert_eq!(net.queries(RecordType::NS), 4);
}

#[tokio::test]
async fn test_unsupported_tld_counts_as_registered() {
    // No script for the domain: the stub answers with the client's
    // "not supported" message, which must read as assume-alive.
    let net = StubNet::new();
    let whois = StubWhois::new();
    let checker = ApexChecker::new(stub_options(&net, &whois)).unwrap();

    assert_eq!(
        checker.is_apex_alive("example.faketld").await,
        apex_result("example.faketld", true)
    );
    assert_eq!(whois.call_count(), 1);
}

#[tokio::test]
async fn test_idn_inputs_normalize_to_a_labels() {
    let net = StubNet::new();
    net.answer(RecordType::NS, "xn--mnchen-3ya.de", &["ns1.denic.de."]);
    let whois = StubWhois::new();
    let checker = ApexChecker::new(stub_options(&net, &whois)).unwrap();

    assert_eq!(
        checker.is_apex_alive("münchen.de").await,
        apex_result("xn--mnchen-3ya.de", true)
    );
}

#[test]
fn test_malformed_configuration_fails_fast() {
    let net = StubNet::new();
    let whois = StubWhois::new();

    let bad_scheme = stub_options(&net, &whois)
        .with_dns(vigil::DnsOptions::default().with_servers(["quic://1.1.1.1"]));
    assert!(ApexChecker::new(bad_scheme).is_err());

    let no_servers = stub_options(&net, &whois)
        .with_dns(vigil::DnsOptions::default().with_servers(Vec::<String>::new()));
    assert!(FqdnChecker::new(no_servers).is_err());
}
