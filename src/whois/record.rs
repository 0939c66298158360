//! The WHOIS response tree and the raw-text registration scan.

use std::collections::BTreeMap;

/// One WHOIS response node.
///
/// A lookup that followed registrar referrals yields a tree: the registry
/// answer at the root, each referred server's answer nested beneath it. The
/// verbatim response text rides along in `raw`; `fields` holds the shallow
/// `Key: value` parse of the same text, so structured values never carry
/// evidence the raw text lacks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhoisRecord {
    pub raw: Option<String>,
    pub fields: BTreeMap<String, WhoisField>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WhoisField {
    Text(String),
    List(Vec<String>),
    Referral(Box<WhoisRecord>),
}

/// Phrases whose presence on any response line marks the domain
/// unregistered. The leading/trailing spaces in `" is free"` and
/// `" has been blocked by "` are significant: they keep the match from
/// firing inside longer words.
const DEAD_PHRASES: [&str; 18] = [
    "no match for",
    "does not exist",
    "not found",
    "no found",
    "no entries",
    "no data found",
    "is available for registration",
    "currently available for application",
    "no matching record",
    "no information available about domain name",
    "not been registered",
    "no match!!",
    "status: available",
    " is free",
    "no object found",
    "nothing found",
    "status: free",
    " has been blocked by ",
];

impl WhoisRecord {
    pub fn is_empty(&self) -> bool {
        self.raw.is_none() && self.fields.is_empty()
    }

    /// Classifies the tree as registered or not.
    ///
    /// Negative raw-text evidence anywhere wins: registries and registrars
    /// disagree often enough that a referred node's stale "registered"
    /// fields must not outvote a dead phrase elsewhere. With no dead phrase,
    /// any node with content counts as positive evidence; a completely
    /// empty tree is no evidence at all.
    pub fn indicates_registration(&self) -> bool {
        matches!(self.scan(), Evidence::Registered)
    }

    fn scan(&self) -> Evidence {
        if let Some(raw) = &self.raw {
            if has_dead_phrase(raw) {
                return Evidence::Dead;
            }
        }

        let mut registered = false;
        for field in self.fields.values() {
            if let WhoisField::Referral(child) = field {
                match child.scan() {
                    Evidence::Dead => return Evidence::Dead,
                    Evidence::Registered => registered = true,
                    Evidence::None => {}
                }
            }
            // Text and List values are opaque here; whatever they say is
            // already present in the node's raw text.
        }

        if registered || !self.is_empty() {
            Evidence::Registered
        } else {
            Evidence::None
        }
    }
}

enum Evidence {
    Dead,
    Registered,
    None,
}

/// Case- and whitespace-insensitive dead-phrase test over response text.
///
/// Each line is lowercased and has runs of tabs/spaces collapsed to a
/// single space before matching, so `"NO  MATCH   FOR"` still hits.
pub fn has_dead_phrase(raw: &str) -> bool {
    let lowered = raw.to_lowercase();
    lowered.lines().any(|line| {
        let normalized = collapse_whitespace(line);
        DEAD_PHRASES.iter().any(|phrase| normalized.contains(phrase))
    })
}

fn collapse_whitespace(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_run = false;
    for c in line.chars() {
        if c == ' ' || c == '\t' {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}
