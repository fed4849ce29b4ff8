use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::NtpmanError;

/// Resolve `host` to a single endpoint on `port`.
///
/// IPv4 addresses are preferred unless `ipv6_only` is set, in which case only
/// IPv6 addresses are considered.
pub fn resolve_addr(host: &str, port: u16, ipv6_only: bool) -> Result<SocketAddr, NtpmanError> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| NtpmanError::AddressResolutionFailed(format!("'{}': {}", host, e)))?
        .collect();

    let filtered: Vec<SocketAddr> = if ipv6_only {
        addrs.into_iter().filter(|a| a.is_ipv6()).collect()
    } else {
        let (v4, v6): (Vec<_>, Vec<_>) = addrs.into_iter().partition(|a| a.is_ipv4());
        v4.into_iter().chain(v6).collect()
    };

    filtered.into_iter().next().ok_or_else(|| {
        if ipv6_only {
            NtpmanError::AddressResolutionFailed(format!("No IPv6 address found for '{}'", host))
        } else {
            NtpmanError::AddressResolutionFailed(format!("No IP address found for '{}'", host))
        }
    })
}
