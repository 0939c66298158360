use thiserror::Error;

#[derive(Error, Debug)]
pub enum VigilError {
    #[error("invalid DNS server spec: {0}")]
    InvalidServerSpec(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid domain name: {0}")]
    InvalidDomain(String),

    #[error("DNS query failed: {0}")]
    DnsError(String),

    #[error("{0}")]
    WhoisError(String),

    #[error("WHOIS connection failed: {0}")]
    WhoisConnectionFailed(#[from] std::io::Error),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("cannot determine TLD for {0}")]
    TldExtraction(String),

    #[error("WHOIS query for {domain} rejected: {message}")]
    WhoisQuery { domain: String, message: String },

    #[error("operation failed after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: usize, last_error: String },
}

pub type Result<T> = std::result::Result<T, VigilError>;
