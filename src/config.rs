use std::time::Duration;

/// What to do with a target line that cannot be parsed or resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadPolicy {
    /// The first bad line fails the whole load.
    #[default]
    Strict,
    /// Bad lines are logged and skipped.
    SkipInvalid,
}

/// Settings for one probe run, built once at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeConfig {
    /// Local port to bind, `None` for an ephemeral one.
    pub bind_port: Option<u16>,
    /// Bind `[::]` and resolve IPv6 addresses only.
    pub ipv6: bool,
    /// Deadline of a single exchange.
    pub timeout: Duration,
    /// Pause between two targets.
    pub delay: Duration,
    /// Number of passes over the target list, `None` for no limit.
    pub passes: Option<u32>,
    pub policy: LoadPolicy,
    /// Look up names of responders.
    pub reverse_dns: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            bind_port: None,
            ipv6: false,
            timeout: Duration::from_secs(1),
            delay: Duration::from_secs(1),
            passes: None,
            policy: LoadPolicy::Strict,
            reverse_dns: true,
        }
    }
}

impl ProbeConfig {
    pub fn poll_settings(&self) -> crate::services::poll::PollSettings {
        crate::services::poll::PollSettings {
            timeout: self.timeout,
            delay: self.delay,
            passes: self.passes,
        }
    }
}
