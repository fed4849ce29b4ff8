use std::str::FromStr;
use std::time::Duration;

use tracing::instrument;

use crate::adapters::{ntp_client::QueryEngine, resolver};
use crate::domain::ntp::{QueryResult, Target};
use crate::error::NtpmanError;

/// Well-known NTP port.
pub const NTP_PORT: u16 = 123;

/// Parsed view of a target string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTarget<'a> {
    pub host: &'a str,
    pub port: Option<u16>,
    pub is_ipv6_literal: bool,
}

/// Strict port parsing with range check (1..=65535).
fn parse_port_strict(s: &str) -> Result<u16, NtpmanError> {
    let raw = u32::from_str(s)
        .map_err(|_| NtpmanError::AddressResolutionFailed(format!("invalid port: '{s}'")))?;
    if raw == 0 || raw > u16::MAX as u32 {
        return Err(NtpmanError::AddressResolutionFailed(format!(
            "port out of range [1..65535]: {raw}"
        )));
    }
    Ok(raw as u16)
}

/// Parse a target string.
///
/// Supported forms:
/// - "hostname"
/// - "hostname:123"
/// - "1.2.3.4"
/// - "1.2.3.4:123"
/// - "[2001:db8::1]"
/// - "[2001:db8::1]:123"
/// - "2001:db8::1"              (bare IPv6, **no** port allowed)
///
/// More than one ':' outside brackets means a bare IPv6 address.
pub fn parse_target(input: &str) -> Result<ParsedTarget<'_>, NtpmanError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(NtpmanError::AddressResolutionFailed("empty target".into()));
    }

    if let Some(rest) = s.strip_prefix('[') {
        let Some((host, tail)) = rest.split_once(']') else {
            return Err(NtpmanError::AddressResolutionFailed(format!(
                "missing closing ']' in '{s}'"
            )));
        };

        let port = if let Some(p) = tail.strip_prefix(':') {
            Some(parse_port_strict(p)?)
        } else if tail.is_empty() {
            None
        } else {
            return Err(NtpmanError::AddressResolutionFailed(format!(
                "unexpected trailing characters in '{s}'"
            )));
        };

        return Ok(ParsedTarget {
            host,
            port,
            is_ipv6_literal: true,
        });
    }

    match s.split_once(':') {
        None => Ok(ParsedTarget {
            host: s,
            port: None,
            is_ipv6_literal: false,
        }),
        Some((host, port_str)) if !port_str.contains(':') => {
            if host.is_empty() {
                return Err(NtpmanError::AddressResolutionFailed(format!(
                    "missing host before port in '{s}'"
                )));
            }
            Ok(ParsedTarget {
                host,
                port: Some(parse_port_strict(port_str)?),
                is_ipv6_literal: false,
            })
        }
        Some(_) => Ok(ParsedTarget {
            host: s,
            port: None,
            is_ipv6_literal: true,
        }),
    }
}

/// Parse and resolve a target string into a [`Target`].
pub fn resolve_target(input: &str, ipv6_only: bool) -> Result<Target, NtpmanError> {
    let parsed = parse_target(input)?;
    let addr = resolver::resolve_addr(
        parsed.host,
        parsed.port.unwrap_or(NTP_PORT),
        ipv6_only || parsed.is_ipv6_literal,
    )?;
    Ok(Target::new(input.trim(), addr))
}

/// Query a single target once from a fresh ephemeral socket.
#[instrument(skip(timeout))]
pub async fn query_one(
    target: &str,
    ipv6: bool,
    timeout: Duration,
) -> Result<QueryResult, NtpmanError> {
    let target = resolve_target(target, ipv6)?;
    let mut engine = QueryEngine::bind(None, target.addr.is_ipv6()).await?;
    engine.query(&target, timeout).await
}
