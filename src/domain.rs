//! Hostname extraction, IDN normalization, and registrable-apex derivation.

use std::net::{IpAddr, Ipv6Addr};

/// Normalizes arbitrary input (bare hostnames, URLs, host:port pairs) to a
/// lowercase A-label hostname.
///
/// Returns `None` when no hostname can be extracted or the name fails IDN
/// mapping; callers treat that as the null verdict, never an error.
pub fn to_ascii(input: &str) -> Option<String> {
    let host = extract_hostname(input)?;
    let ascii = idna::domain_to_ascii(host).ok()?;
    let ascii = ascii.trim_matches('.');
    if ascii.is_empty() {
        None
    } else {
        Some(ascii.to_string())
    }
}

/// Pulls the hostname out of URL-like input: scheme, userinfo, path, query,
/// fragment, port, and trailing dots are all stripped.
fn extract_hostname(input: &str) -> Option<&str> {
    let s = input.trim();
    let s = match s.find("://") {
        Some(idx) => &s[idx + 3..],
        None => s,
    };
    let s = s.split(['/', '?', '#']).next().unwrap_or(s);
    let s = s.rsplit('@').next().unwrap_or(s);

    let s = if s.starts_with('[') {
        // Bracketed IPv6 literal; drop any port suffix after the bracket.
        s.split_once(']').map(|(host, _)| &s[..host.len() + 1]).unwrap_or(s)
    } else if let Some(idx) = s.rfind(':') {
        let (host, port) = (&s[..idx], &s[idx + 1..]);
        // A lone colon group is a port only when the head has none (bare
        // IPv6 addresses contain several and keep theirs).
        if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) && !host.contains(':') {
            host
        } else {
            s
        }
    } else {
        s
    };

    let s = s.trim_matches('.');
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Derives the registerable apex of `host` under ICANN suffix rules only.
///
/// Private suffix entries (e.g. `github.io`) are walked up to the ICANN
/// suffix beneath them, so `foo.github.io` reduces to `github.io` rather
/// than `foo.github.io`. IP literals and bare public suffixes have no apex.
pub fn registrable_apex(host: &str) -> Option<String> {
    if is_ip_literal(host) {
        return None;
    }

    let suffix = psl::suffix(host.as_bytes())?;
    let mut suffix_str = std::str::from_utf8(suffix.as_bytes()).ok()?;
    let mut is_private = suffix.typ() == Some(psl::Type::Private);

    while is_private {
        // Drop the leftmost label of the private suffix and re-match until
        // an ICANN (or unknown) suffix remains.
        let rest = suffix_str.split_once('.')?.1;
        let below = psl::suffix(rest.as_bytes())?;
        suffix_str = std::str::from_utf8(below.as_bytes()).ok()?;
        is_private = below.typ() == Some(psl::Type::Private);
    }

    if host == suffix_str {
        return None;
    }
    let prefix = host.strip_suffix(suffix_str)?.strip_suffix('.')?;
    let label = prefix.rsplit('.').next()?;
    if label.is_empty() {
        return None;
    }
    Some(format!("{label}.{suffix_str}"))
}

fn is_ip_literal(host: &str) -> bool {
    if host.parse::<IpAddr>().is_ok() {
        return true;
    }
    host.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .is_some_and(|inner| inner.parse::<Ipv6Addr>().is_ok())
}
