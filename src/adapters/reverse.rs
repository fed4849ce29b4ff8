use std::net::IpAddr;
use std::time::Duration;

use hickory_resolver::TokioResolver;
use tracing::{debug, instrument};

use crate::error::NtpmanError;

/// Best-effort PTR lookups for responder addresses.
pub struct ReverseResolver {
    resolver: TokioResolver,
}

impl ReverseResolver {
    /// Build a resolver from the system configuration (`/etc/resolv.conf`).
    pub fn from_system() -> Result<Self, NtpmanError> {
        let builder = TokioResolver::builder_tokio()
            .map_err(|e| NtpmanError::Other(format!("resolver configuration: {e}")))?;
        Ok(Self {
            resolver: builder.build(),
        })
    }

    /// Names for `ip`, without the trailing root dot. Failures and timeouts
    /// yield an empty list.
    #[instrument(skip(self, timeout))]
    pub async fn lookup(&self, ip: IpAddr, timeout: Duration) -> Vec<String> {
        match tokio::time::timeout(timeout, self.resolver.reverse_lookup(ip)).await {
            Ok(Ok(lookup)) => lookup
                .iter()
                .map(|name| name.to_string().trim_end_matches('.').to_string())
                .collect(),
            Ok(Err(e)) => {
                debug!(error = %e, "reverse lookup failed");
                Vec::new()
            }
            Err(_) => {
                debug!("reverse lookup timed out");
                Vec::new()
            }
        }
    }
}
