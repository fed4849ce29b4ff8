use std::fmt;
use std::net::Ipv4Addr;

use crate::error::NtpmanError;
use crate::ntp::timestamp::short_to_secs;

/// Size of the fixed NTP header on the wire.
pub const HEADER_LEN: usize = 48;

/// Protocol version this probe speaks.
pub const NTP_VERSION: u8 = 4;

/// 2-bit leap indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LeapIndicator {
    #[default]
    NoWarning,
    LastMinute61s,
    LastMinute59s,
    Unsynchronized,
}

impl LeapIndicator {
    /// Map the low two bits of `bits` onto the indicator.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => LeapIndicator::NoWarning,
            1 => LeapIndicator::LastMinute61s,
            2 => LeapIndicator::LastMinute59s,
            _ => LeapIndicator::Unsynchronized,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for LeapIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LeapIndicator::NoWarning => "none",
            LeapIndicator::LastMinute61s => "+1s",
            LeapIndicator::LastMinute59s => "-1s",
            LeapIndicator::Unsynchronized => "unsync",
        };
        f.write_str(s)
    }
}

/// 3-bit association mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Reserved,
    SymmetricActive,
    SymmetricPassive,
    Client,
    Server,
    Broadcast,
    Control,
    Private,
}

impl Mode {
    /// Map the low three bits of `bits` onto the mode.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Mode::Reserved,
            1 => Mode::SymmetricActive,
            2 => Mode::SymmetricPassive,
            3 => Mode::Client,
            4 => Mode::Server,
            5 => Mode::Broadcast,
            6 => Mode::Control,
            _ => Mode::Private,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Reserved => "reserved",
            Mode::SymmetricActive => "symmetric-active",
            Mode::SymmetricPassive => "symmetric-passive",
            Mode::Client => "client",
            Mode::Server => "server",
            Mode::Broadcast => "broadcast",
            Mode::Control => "control",
            Mode::Private => "private",
        };
        f.write_str(s)
    }
}

/// One NTP v3/v4 header.
///
/// Field layout follows RFC 5905 figure 8. Timestamps are kept in their raw
/// 32.32 form; see [`crate::ntp::timestamp`] for conversions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct NtpHeader {
    pub leap: LeapIndicator,
    /// 3-bit version, values above 7 are truncated on encode.
    pub version: u8,
    pub mode: Mode,
    pub stratum: u8,
    /// log2 seconds.
    pub poll: i8,
    /// log2 seconds, sign-extended from the wire byte.
    pub precision: i32,
    /// 16.16 seconds.
    pub root_delay: u32,
    /// 16.16 seconds.
    pub root_dispersion: u32,
    pub reference_id: u32,
    pub reference_timestamp: u64,
    pub originate_timestamp: u64,
    pub receive_timestamp: u64,
    pub transmit_timestamp: u64,
}

impl NtpHeader {
    /// Client request carrying `transmit` as its transmit timestamp.
    pub fn request(transmit: u64) -> Self {
        NtpHeader {
            leap: LeapIndicator::Unsynchronized,
            version: NTP_VERSION,
            mode: Mode::Client,
            transmit_timestamp: transmit,
            ..NtpHeader::default()
        }
    }

    /// Serialize into the 48-byte wire layout.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut b = [0u8; HEADER_LEN];

        b[0] = (self.leap.bits() << 6) & 0xc0
            | (self.version << 3) & 0x38
            | self.mode.bits() & 0x07;
        b[1] = self.stratum;
        b[2] = self.poll as u8;
        b[3] = self.precision as i8 as u8;

        b[4..8].copy_from_slice(&self.root_delay.to_be_bytes());
        b[8..12].copy_from_slice(&self.root_dispersion.to_be_bytes());
        b[12..16].copy_from_slice(&self.reference_id.to_be_bytes());

        b[16..24].copy_from_slice(&self.reference_timestamp.to_be_bytes());
        b[24..32].copy_from_slice(&self.originate_timestamp.to_be_bytes());
        b[32..40].copy_from_slice(&self.receive_timestamp.to_be_bytes());
        b[40..48].copy_from_slice(&self.transmit_timestamp.to_be_bytes());

        b
    }

    /// Parse the first 48 bytes of `bytes`. Anything after them (extension
    /// fields, MAC) is ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, NtpmanError> {
        let Some(b) = bytes.first_chunk::<HEADER_LEN>() else {
            return Err(NtpmanError::MalformedPacket(bytes.len()));
        };

        Ok(NtpHeader {
            leap: LeapIndicator::from_bits(b[0] >> 6),
            version: (b[0] >> 3) & 0x07,
            mode: Mode::from_bits(b[0]),
            stratum: b[1],
            poll: b[2] as i8,
            precision: i32::from(b[3] as i8),
            root_delay: be_u32(&b[4..8]),
            root_dispersion: be_u32(&b[8..12]),
            reference_id: be_u32(&b[12..16]),
            reference_timestamp: be_u64(&b[16..24]),
            originate_timestamp: be_u64(&b[24..32]),
            receive_timestamp: be_u64(&b[32..40]),
            transmit_timestamp: be_u64(&b[40..48]),
        })
    }

    /// Human readable reference id: an ASCII code for stratum 0 and 1, the
    /// upstream IPv4 address (or hash) otherwise.
    pub fn reference_id_string(&self) -> String {
        let bytes = self.reference_id.to_be_bytes();
        if self.stratum <= 1 {
            bytes
                .iter()
                .take_while(|&&c| c != 0)
                .map(|&c| {
                    if c.is_ascii_graphic() || c == b' ' {
                        c as char
                    } else {
                        '.'
                    }
                })
                .collect::<String>()
                .trim_end()
                .to_string()
        } else {
            Ipv4Addr::from(bytes).to_string()
        }
    }

    /// Kiss-o'-Death code (`RATE`, `DENY`, ...) when the server sent one.
    pub fn kiss_code(&self) -> Option<String> {
        if self.stratum != 0 || self.reference_id == 0 {
            return None;
        }
        let bytes = self.reference_id.to_be_bytes();
        if bytes.iter().all(|c| c.is_ascii_alphanumeric() || *c == 0) {
            Some(self.reference_id_string())
        } else {
            None
        }
    }

    pub fn root_delay_secs(&self) -> f64 {
        short_to_secs(self.root_delay)
    }

    pub fn root_dispersion_secs(&self) -> f64 {
        short_to_secs(self.root_dispersion)
    }
}

fn be_u32(b: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(b);
    u32::from_be_bytes(raw)
}

fn be_u64(b: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(b);
    u64::from_be_bytes(raw)
}
