//! NTP 32.32 fixed-point timestamps.
//!
//! The high word counts seconds since 1900-01-01 00:00 UTC, the low word
//! counts 2^-32 second units. Only NTP era 0 is handled: instants before
//! 1900 or from 2036-02-07 06:28:16 UTC onwards do not fit the seconds word
//! and are rejected rather than wrapped.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::NtpmanError;

/// Seconds between 1900-01-01 (NTP epoch) and 1970-01-01 (Unix epoch).
pub const UNIX_EPOCH_OFFSET: i64 = 2_208_988_800;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Encode an instant as a 64-bit NTP timestamp.
pub fn to_ntp_timestamp(instant: DateTime<Utc>) -> Result<u64, NtpmanError> {
    let seconds = instant.timestamp() + UNIX_EPOCH_OFFSET;
    let seconds = u32::try_from(seconds).map_err(|_| {
        NtpmanError::Protocol(format!("{instant} is outside NTP era 0 (1900-2036)"))
    })?;
    let nanos = u64::from(instant.timestamp_subsec_nanos()).min(NANOS_PER_SEC - 1);
    // truncating division: the fraction never rounds up into the next second
    let fraction = (nanos << 32) / NANOS_PER_SEC;
    Ok((u64::from(seconds) << 32) | fraction)
}

/// Decode a 64-bit NTP timestamp back into an instant.
pub fn from_ntp_timestamp(timestamp: u64) -> DateTime<Utc> {
    let seconds = i64::from(ntp_seconds(timestamp)) - UNIX_EPOCH_OFFSET;
    let fraction = u64::from(ntp_fraction(timestamp));
    let nanos = ((fraction * NANOS_PER_SEC + (1 << 31)) >> 32).min(NANOS_PER_SEC - 1);
    // every u32 second count lies well inside chrono's range
    Utc.timestamp_opt(seconds, nanos as u32)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Whole seconds since the NTP epoch.
pub fn ntp_seconds(timestamp: u64) -> u32 {
    (timestamp >> 32) as u32
}

/// Fractional second in 2^-32 units.
pub fn ntp_fraction(timestamp: u64) -> u32 {
    timestamp as u32
}

/// Convert a 16.16 fixed-point duration (root delay, root dispersion) to seconds.
pub fn short_to_secs(value: u32) -> f64 {
    f64::from(value) / 65536.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, nanos).single().unwrap()
    }

    #[test]
    fn unix_epoch_maps_to_offset() {
        let ts = to_ntp_timestamp(at(0, 0)).unwrap();
        assert_eq!(ntp_seconds(ts), 2_208_988_800);
        assert_eq!(ntp_fraction(ts), 0);
    }

    #[test]
    fn half_second_is_high_bit() {
        let ts = to_ntp_timestamp(at(1_700_000_000, 500_000_000)).unwrap();
        assert_eq!(ntp_seconds(ts), (1_700_000_000u64 + 2_208_988_800) as u32);
        assert_eq!(ntp_fraction(ts), 0x8000_0000);
    }

    #[test]
    fn fraction_is_truncated() {
        // 1ns is 4.29 fraction units
        let ts = to_ntp_timestamp(at(0, 1)).unwrap();
        assert_eq!(ntp_fraction(ts), 4);
        let ts = to_ntp_timestamp(at(0, 999_999_999)).unwrap();
        assert_eq!(ntp_fraction(ts), 0xFFFF_FFFB);
    }

    #[test]
    fn nanosecond_instants_survive_encoding() {
        for (secs, nanos) in [
            (0, 0),
            (1_700_000_000, 500_000_000),
            (1_234_567_890, 123_456_789),
            (2_000_000_000, 1),
            (1_999_999_999, 999_999_999),
        ] {
            let t = at(secs, nanos);
            let back = from_ntp_timestamp(to_ntp_timestamp(t).unwrap());
            assert_eq!(back, t, "{secs}.{nanos:09}");
        }
    }

    #[test]
    fn decode_of_raw_fraction() {
        let ts = ((2_208_988_800u64 + 10) << 32) | 0x4000_0000;
        assert_eq!(from_ntp_timestamp(ts), at(10, 250_000_000));
    }

    #[test]
    fn era_boundaries() {
        assert!(to_ntp_timestamp(at(-UNIX_EPOCH_OFFSET, 0)).is_ok());
        assert!(to_ntp_timestamp(at(-UNIX_EPOCH_OFFSET - 1, 0)).is_err());
        let last = i64::from(u32::MAX) - UNIX_EPOCH_OFFSET;
        assert!(to_ntp_timestamp(at(last, 999_999_999)).is_ok());
        assert!(matches!(
            to_ntp_timestamp(at(last + 1, 0)),
            Err(NtpmanError::Protocol(_))
        ));
    }

    #[test]
    fn short_format() {
        assert_eq!(short_to_secs(0x0001_8000), 1.5);
        assert_eq!(short_to_secs(0), 0.0);
    }
}
