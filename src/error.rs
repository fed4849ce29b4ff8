use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the ntpman library.
#[derive(Error, Debug)]
pub enum NtpmanError {
    /// Target list cannot be opened or yields nothing to poll.
    #[error("config: {0}")]
    ConfigUnreadable(String),
    /// A configured target does not resolve to an endpoint.
    #[error("dns: {0}")]
    AddressResolutionFailed(String),
    /// Local UDP socket could not be bound.
    #[error("bind: {0}")]
    SocketBindFailed(String),
    /// No matching response arrived before the deadline.
    #[error("timeout after {0:?}")]
    QueryTimeout(Duration),
    /// Response too short to hold an NTP header.
    #[error("malformed packet: {0} bytes, expected at least 48")]
    MalformedPacket(usize),
    /// Protocol level violation.
    #[error("protocol: {0}")]
    Protocol(String),
    /// Network related error.
    #[error("network: {0}")]
    Network(String),
    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Other error cases.
    #[error("other: {0}")]
    Other(String),
}

impl NtpmanError {
    /// Short machine readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            NtpmanError::ConfigUnreadable(_) => "config_unreadable",
            NtpmanError::AddressResolutionFailed(_) => "address_resolution_failed",
            NtpmanError::SocketBindFailed(_) => "socket_bind_failed",
            NtpmanError::QueryTimeout(_) => "query_timeout",
            NtpmanError::MalformedPacket(_) => "malformed_packet",
            NtpmanError::Protocol(_) => "protocol",
            NtpmanError::Network(_) => "network",
            NtpmanError::Io(_) => "io",
            NtpmanError::Other(_) => "other",
        }
    }
}
