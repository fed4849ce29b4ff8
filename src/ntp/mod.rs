//! NTP wire format: the 48-byte header and 32.32 timestamps.

pub mod header;
pub mod timestamp;

pub use header::{HEADER_LEN, LeapIndicator, Mode, NTP_VERSION, NtpHeader};
pub use timestamp::{from_ntp_timestamp, to_ntp_timestamp};
