mod client;
mod heuristic;
mod record;
mod servers;

pub use client::{IpFamily, TcpWhoisClient, WhoisClient, WhoisQueryOpts, DEFAULT_REFERRAL_DEPTH};
pub use heuristic::WhoisHeuristic;
pub use record::{has_dead_phrase, WhoisField, WhoisRecord};
pub use servers::TldWhoisMap;
