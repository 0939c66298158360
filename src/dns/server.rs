//! DNS server spec grammar: `[scheme "://"] host [":" port]`.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VigilError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsScheme {
    Udp,
    Tcp,
    Tls,
    Https,
}

impl DnsScheme {
    pub fn default_port(self) -> u16 {
        match self {
            DnsScheme::Udp | DnsScheme::Tcp => 53,
            DnsScheme::Tls => 853,
            DnsScheme::Https => 443,
        }
    }
}

impl fmt::Display for DnsScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsScheme::Udp => write!(f, "udp"),
            DnsScheme::Tcp => write!(f, "tcp"),
            DnsScheme::Tls => write!(f, "tls"),
            DnsScheme::Https => write!(f, "https"),
        }
    }
}

/// One upstream server the probe may query.
///
/// The host must be an IP literal: transports dial it directly, there is no
/// bootstrap resolver to look a hostname up with. For `https` specs the
/// original string is kept so the transport sees the URL as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsServerSpec {
    pub scheme: DnsScheme,
    pub host: IpAddr,
    pub port: u16,
    pub raw: String,
}

impl DnsServerSpec {
    /// Parses a spec string. An unknown scheme, a missing or non-IP host,
    /// or a malformed port is a configuration error.
    pub fn parse(spec: &str) -> Result<Self> {
        let trimmed = spec.trim();
        let (scheme, rest) = match trimmed.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => ("", trimmed),
        };

        let scheme = match scheme {
            "" | "udp" => DnsScheme::Udp,
            "tcp" => DnsScheme::Tcp,
            "tls" => DnsScheme::Tls,
            "https" => DnsScheme::Https,
            other => {
                return Err(VigilError::InvalidServerSpec(format!(
                    "unknown scheme \"{other}\" in \"{spec}\""
                )))
            }
        };

        let (host, port) = split_host_port(rest, spec)?;
        let host = parse_host(host, spec)?;
        let port = match port {
            Some(p) => p,
            None => scheme.default_port(),
        };

        Ok(Self {
            scheme,
            host,
            port,
            raw: trimmed.to_string(),
        })
    }
}

impl FromStr for DnsServerSpec {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DnsServerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn split_host_port<'a>(rest: &'a str, spec: &str) -> Result<(&'a str, Option<u16>)> {
    if rest.is_empty() {
        return Err(VigilError::InvalidServerSpec(format!(
            "missing host in \"{spec}\""
        )));
    }

    if let Some(inner) = rest.strip_prefix('[') {
        // Bracketed IPv6: [addr] or [addr]:port.
        let (host, tail) = inner.split_once(']').ok_or_else(|| {
            VigilError::InvalidServerSpec(format!("unterminated bracket in \"{spec}\""))
        })?;
        return match tail.strip_prefix(':') {
            Some(port) => Ok((host, Some(parse_port(port, spec)?))),
            None if tail.is_empty() => Ok((host, None)),
            None => Err(VigilError::InvalidServerSpec(format!(
                "trailing garbage after bracket in \"{spec}\""
            ))),
        };
    }

    // A bare IPv6 address keeps all its colon groups; anything else with a
    // single colon is host:port.
    if rest.parse::<Ipv6Addr>().is_ok() {
        return Ok((rest, None));
    }
    match rest.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => Ok((host, Some(parse_port(port, spec)?))),
        _ => Ok((rest, None)),
    }
}

fn parse_port(port: &str, spec: &str) -> Result<u16> {
    port.parse::<u16>()
        .map_err(|_| VigilError::InvalidServerSpec(format!("invalid port \"{port}\" in \"{spec}\"")))
}

fn parse_host(host: &str, spec: &str) -> Result<IpAddr> {
    host.parse::<IpAddr>().map_err(|_| {
        VigilError::InvalidServerSpec(format!(
            "host \"{host}\" in \"{spec}\" is not an IP literal"
        ))
    })
}
