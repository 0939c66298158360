mod probe;
mod server;
mod transport;

pub use probe::{DnsProbe, ProbeOutcome};
pub use server::{DnsScheme, DnsServerSpec};
pub use transport::{DnsTransport, HickoryTransportFactory, RecordType, TransportFactory};
