use std::fs;
use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::config::LoadPolicy;
use crate::domain::ntp::Target;
use crate::error::NtpmanError;

use super::query::resolve_target;

/// Read and resolve the target list at `path`.
#[instrument(skip(policy))]
pub fn load_targets(
    path: &Path,
    ipv6_only: bool,
    policy: LoadPolicy,
) -> Result<Vec<Target>, NtpmanError> {
    let content = fs::read_to_string(path)
        .map_err(|e| NtpmanError::ConfigUnreadable(format!("{}: {}", path.display(), e)))?;
    let targets = parse_targets(&content, ipv6_only, policy)?;
    if targets.is_empty() {
        return Err(NtpmanError::ConfigUnreadable(format!(
            "{}: no targets",
            path.display()
        )));
    }
    Ok(targets)
}

/// Resolve one target per line, keeping configuration order.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_targets(
    content: &str,
    ipv6_only: bool,
    policy: LoadPolicy,
) -> Result<Vec<Target>, NtpmanError> {
    let mut targets = Vec::new();
    for (n, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match resolve_target(line, ipv6_only) {
            Ok(target) => {
                debug!(line = n + 1, target = %target.name, addr = %target.addr, "target loaded");
                targets.push(target);
            }
            Err(e) => match policy {
                LoadPolicy::Strict => {
                    let reason = match e {
                        NtpmanError::AddressResolutionFailed(msg) => msg,
                        other => other.to_string(),
                    };
                    return Err(NtpmanError::AddressResolutionFailed(format!(
                        "line {}: {}",
                        n + 1,
                        reason
                    )));
                }
                LoadPolicy::SkipInvalid => {
                    warn!(line = n + 1, target = line, error = %e, "skipping target");
                }
            },
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "\
# lab servers
127.0.0.1

127.0.0.2:1123
   [::1]:4123
#127.0.0.9
";

    #[test]
    fn keeps_order_and_skips_comments() {
        let targets = parse_targets(LIST, false, LoadPolicy::Strict).unwrap();
        let names: Vec<_> = targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["127.0.0.1", "127.0.0.2:1123", "[::1]:4123"]);
        assert_eq!(targets[0].addr, "127.0.0.1:123".parse().unwrap());
        assert_eq!(targets[1].addr, "127.0.0.2:1123".parse().unwrap());
        assert_eq!(targets[2].addr, "[::1]:4123".parse().unwrap());
    }

    #[test]
    fn strict_policy_fails_on_first_bad_line() {
        let err = parse_targets("127.0.0.1\nhost:0\n127.0.0.2\n", false, LoadPolicy::Strict)
            .unwrap_err();
        match err {
            NtpmanError::AddressResolutionFailed(msg) => assert!(msg.starts_with("line 2:"), "{msg}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn skip_policy_keeps_good_lines() {
        let targets =
            parse_targets("127.0.0.1\nhost:0\n127.0.0.2\n", false, LoadPolicy::SkipInvalid)
                .unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].name, "127.0.0.2");
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = load_targets(
            Path::new("/nonexistent/ntpman/targets.conf"),
            false,
            LoadPolicy::Strict,
        )
        .unwrap_err();
        assert!(matches!(err, NtpmanError::ConfigUnreadable(_)));
    }

    #[test]
    fn empty_list_is_unreadable() {
        let path = std::env::temp_dir().join(format!("ntpman-empty-{}.conf", std::process::id()));
        fs::write(&path, "# nothing here\n\n").unwrap();
        let err = load_targets(&path, false, LoadPolicy::Strict).unwrap_err();
        let _ = fs::remove_file(&path);
        assert!(matches!(err, NtpmanError::ConfigUnreadable(_)));
    }
}
