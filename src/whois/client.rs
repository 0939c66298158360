//! WHOIS transport: the client seam and the default port-43 implementation.

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::record::{WhoisField, WhoisRecord};
use crate::error::{Result, VigilError};

const WHOIS_PORT: u16 = 43;
const MAX_RESPONSE_SIZE: usize = 1024 * 1024;

/// Referral hops followed when the caller does not say otherwise.
pub const DEFAULT_REFERRAL_DEPTH: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    V4,
    V6,
}

/// Per-lookup parameters handed to a [`WhoisClient`].
#[derive(Debug, Clone)]
pub struct WhoisQueryOpts {
    /// Registry server to ask first; `None` means the client has no hint
    /// for this TLD.
    pub server: Option<String>,
    pub timeout: Duration,
    pub family: Option<IpFamily>,
    pub follow: u8,
}

/// The WHOIS collaborator seam.
///
/// Implementations return the full referral tree with verbatim text on each
/// node. Error *messages* are part of the contract: the heuristic
/// classifies them by substring, so a client must phrase
/// "TLD for … not supported", "No WHOIS data found", and TLD-nonexistence
/// the way [`TcpWhoisClient`] does.
#[async_trait]
pub trait WhoisClient: Send + Sync {
    async fn lookup(&self, domain: &str, opts: &WhoisQueryOpts) -> Result<WhoisRecord>;
}

/// Plain TCP WHOIS client with referral following.
#[derive(Debug, Clone, Default)]
pub struct TcpWhoisClient;

impl TcpWhoisClient {
    pub fn new() -> Self {
        Self
    }

    fn lookup_with_referrals<'a>(
        &'a self,
        domain: &'a str,
        server: &'a str,
        opts: &'a WhoisQueryOpts,
        depth: u8,
        visited: &'a mut HashSet<String>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<WhoisRecord>> + Send + 'a>>
    {
        Box::pin(async move {
            visited.insert(server.to_lowercase());

            debug!(server = %server, depth, "querying WHOIS server");
            let raw = self.query_server(server, domain, opts).await?;
            if raw.trim().is_empty() {
                return Err(VigilError::WhoisError(format!(
                    "No WHOIS data found for \"{domain}\""
                )));
            }

            let mut record = parse_record(&raw);

            if depth < opts.follow {
                if let Some(referral) = extract_referral(&raw) {
                    if !visited.contains(&referral.to_lowercase()) {
                        debug!(referral = %referral, "following registrar referral");
                        match self
                            .lookup_with_referrals(domain, &referral, opts, depth + 1, visited)
                            .await
                        {
                            Ok(child) => {
                                record
                                    .fields
                                    .insert(referral, WhoisField::Referral(Box::new(child)));
                            }
                            Err(e) => {
                                // The registry answer is still usable
                                // evidence; a dead registrar is not.
                                warn!(referral = %referral, error = %e, "referral lookup failed");
                            }
                        }
                    }
                }
            }

            Ok(record)
        })
    }

    async fn query_server(
        &self,
        server: &str,
        query: &str,
        opts: &WhoisQueryOpts,
    ) -> Result<String> {
        let mut stream = self.connect(server, opts).await?;

        let query_bytes = format!("{query}\r\n");
        timeout(opts.timeout, stream.write_all(query_bytes.as_bytes()))
            .await
            .map_err(|_| VigilError::Timeout(format!("write to {server} timed out")))??;

        let mut response = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match timeout(opts.timeout, stream.read(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    response.extend_from_slice(&buf[..n]);
                    if response.len() > MAX_RESPONSE_SIZE {
                        return Err(VigilError::WhoisError(format!(
                            "response from {server} too large"
                        )));
                    }
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    // Some servers never close; keep what arrived.
                    if !response.is_empty() {
                        break;
                    }
                    return Err(VigilError::Timeout(format!("read from {server} timed out")));
                }
            }
        }

        // UTF-8 if possible, Latin-1 otherwise.
        Ok(String::from_utf8(response.clone())
            .unwrap_or_else(|_| response.iter().map(|&b| b as char).collect()))
    }

    async fn connect(&self, server: &str, opts: &WhoisQueryOpts) -> Result<TcpStream> {
        let addr = format!("{server}:{WHOIS_PORT}");

        match opts.family {
            None => timeout(opts.timeout, TcpStream::connect(&addr))
                .await
                .map_err(|_| VigilError::Timeout(format!("connection to {server} timed out")))?
                .map_err(Into::into),
            Some(family) => {
                let addrs = timeout(opts.timeout, tokio::net::lookup_host(&addr))
                    .await
                    .map_err(|_| VigilError::Timeout(format!("resolving {server} timed out")))??;
                let preferred: Vec<SocketAddr> = addrs
                    .filter(|a| match family {
                        IpFamily::V4 => a.is_ipv4(),
                        IpFamily::V6 => a.is_ipv6(),
                    })
                    .collect();
                if preferred.is_empty() {
                    return Err(VigilError::WhoisError(format!(
                        "no {} address for {server}",
                        match family {
                            IpFamily::V4 => "IPv4",
                            IpFamily::V6 => "IPv6",
                        }
                    )));
                }
                timeout(opts.timeout, TcpStream::connect(preferred.as_slice()))
                    .await
                    .map_err(|_| VigilError::Timeout(format!("connection to {server} timed out")))?
                    .map_err(Into::into)
            }
        }
    }
}

#[async_trait]
impl WhoisClient for TcpWhoisClient {
    async fn lookup(&self, domain: &str, opts: &WhoisQueryOpts) -> Result<WhoisRecord> {
        let Some(server) = opts.server.clone() else {
            return Err(VigilError::WhoisError(format!(
                "TLD for \"{domain}\" not supported"
            )));
        };

        let mut visited = HashSet::new();
        self.lookup_with_referrals(domain, &server, opts, 0, &mut visited)
            .await
    }
}

/// Shallow `Key: value` parse of a response. Repeated keys fold into lists;
/// comment and banner lines are skipped. The verbatim text is kept on the
/// record so nothing is lost to the parse.
fn parse_record(raw: &str) -> WhoisRecord {
    use std::collections::btree_map::Entry;

    let mut fields: BTreeMap<String, WhoisField> = BTreeMap::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty()
            || line.starts_with('%')
            || line.starts_with('#')
            || line.starts_with(">>>")
        {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }

        match fields.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(WhoisField::Text(value.to_string()));
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                WhoisField::Text(first) => {
                    let first = std::mem::take(first);
                    *slot.get_mut() = WhoisField::List(vec![first, value.to_string()]);
                }
                WhoisField::List(items) => items.push(value.to_string()),
                WhoisField::Referral(_) => {}
            },
        }
    }

    WhoisRecord {
        raw: Some(raw.to_string()),
        fields,
    }
}

static REFERRAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Registrar WHOIS Server:\s*(.+)",
        r"(?i)Whois Server:\s*(.+)",
        r"(?i)ReferralServer:\s*whois://(.+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("referral pattern compiles"))
    .collect()
});

fn extract_referral(response: &str) -> Option<String> {
    for pattern in REFERRAL_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(response) {
            if let Some(m) = caps.get(1) {
                let server = m.as_str().trim().to_lowercase();
                if !server.is_empty() && server.contains('.') {
                    return Some(server);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_folds_repeated_keys_into_lists() {
        let raw = "\
Domain Name: example.com\n\
Registrar: Example Registrar, Inc.\n\
Name Server: ns1.example.com\n\
Name Server: ns2.example.com\n\
% comment line\n\
>>> Last update of whois database: 2024-01-01 <<<\n";
        let record = parse_record(raw);

        assert_eq!(
            record.fields.get("Registrar"),
            Some(&WhoisField::Text("Example Registrar, Inc.".to_string()))
        );
        assert_eq!(
            record.fields.get("Name Server"),
            Some(&WhoisField::List(vec![
                "ns1.example.com".to_string(),
                "ns2.example.com".to_string()
            ]))
        );
        assert!(record.raw.as_deref().unwrap().contains("Domain Name"));
    }

    #[test]
    fn test_parse_keeps_urls_intact() {
        let record = parse_record("Referral URL: http://www.example-registrar.com\n");
        assert_eq!(
            record.fields.get("Referral URL"),
            Some(&WhoisField::Text("http://www.example-registrar.com".to_string()))
        );
    }

    #[test]
    fn test_referral_extraction_matches_common_spellings() {
        assert_eq!(
            extract_referral("Registrar WHOIS Server: whois.example-registrar.com\n"),
            Some("whois.example-registrar.com".to_string())
        );
        assert_eq!(
            extract_referral("ReferralServer: whois://rwhois.example.net\n"),
            Some("rwhois.example.net".to_string())
        );
        assert_eq!(extract_referral("Registrar WHOIS Server:\n"), None);
        assert_eq!(extract_referral("Domain Name: example.com\n"), None);
    }

    #[tokio::test]
    async fn test_missing_server_hint_is_the_unsupported_contract() {
        let client = TcpWhoisClient::new();
        let opts = WhoisQueryOpts {
            server: None,
            timeout: Duration::from_secs(1),
            family: None,
            follow: DEFAULT_REFERRAL_DEPTH,
        };
        let err = client.lookup("example.zzz", &opts).await.unwrap_err();
        assert!(err.to_string().contains("TLD for \"example.zzz\" not supported"));
    }
}
