//! The 48-byte time-exchange packet
//!
//! Layout (all multi-byte fields big-endian):
//! - Byte 0: leap indicator (2 bits) + version (3 bits) + mode (3 bits)
//! - Byte 1: stratum
//! - Byte 2: poll exponent (2^n seconds)
//! - Byte 3: precision exponent (signed, 2^n seconds)
//! - Bytes 4-7: root delay
//! - Bytes 8-11: root dispersion
//! - Bytes 12-15: reference identifier
//! - Bytes 16-23: reference timestamp
//! - Bytes 24-31: originate timestamp (T0)
//! - Bytes 32-39: receive timestamp (T1)
//! - Bytes 40-47: transmit timestamp (T2)

use std::fmt;

use bytes::{BufMut, BytesMut};

use sundial_core::{NtpInstant, SundialError, SundialResult};

use crate::timestamp::{decode_timestamp, encode_timestamp, TIMESTAMP_SIZE};

/// Total packet size in bytes.
pub const PACKET_SIZE: usize = 48;

/// Protocol version spoken by the client.
pub const PROTOCOL_VERSION: u8 = 3;

/// Precision exponent advertised in client requests: 2^-10 ~ 0.98 ms.
pub const CLIENT_PRECISION: i8 = -10;

/// Association mode (low 3 bits of the flags byte).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    Reserved = 0,
    SymmetricActive = 1,
    SymmetricPassive = 2,
    Client = 3,
    Server = 4,
    Broadcast = 5,
    Control = 6,
    Private = 7,
}

impl Mode {
    /// Every 3-bit value is a defined mode.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            1 => Mode::SymmetricActive,
            2 => Mode::SymmetricPassive,
            3 => Mode::Client,
            4 => Mode::Server,
            5 => Mode::Broadcast,
            6 => Mode::Control,
            7 => Mode::Private,
            _ => Mode::Reserved,
        }
    }

    #[inline]
    pub fn to_bits(self) -> u8 {
        self as u8
    }
}

/// Decoded time-exchange record.
///
/// The receive-at-client timestamp (T3) is never part of the wire record; the
/// controller stamps it at local reception time and carries it alongside.
#[derive(Clone, Debug)]
pub struct Packet {
    /// Leap indicator (2 bits).
    pub leap: u8,
    /// Protocol version (3 bits).
    pub version: u8,
    /// Association mode (3 bits).
    pub mode: Mode,
    /// Distance from a primary time source.
    pub stratum: u8,
    /// Poll exponent: the server asks for at most one request per 2^poll s.
    pub poll: u8,
    /// Precision exponent: the server clock reads to 2^precision s.
    pub precision: i8,
    pub root_delay: u32,
    pub root_dispersion: u32,
    /// Reference clock identifier.
    pub reference_id: [u8; 4],
    pub reference: NtpInstant,
    /// T0 - client send time, echoed back by the server.
    pub originate: NtpInstant,
    /// T1 - server receive time.
    pub receive: NtpInstant,
    /// T2 - server send time.
    pub transmit: NtpInstant,
}

impl Packet {
    /// Build a client request: LI 0, version 3, mode client, precision 2^-10,
    /// every other field zero. The caller stamps T0 into `transmit` at send
    /// time; the server echoes it back as `originate`.
    pub fn client_request() -> Self {
        Packet {
            leap: 0,
            version: PROTOCOL_VERSION,
            mode: Mode::Client,
            stratum: 0,
            poll: 0,
            precision: CLIENT_PRECISION,
            root_delay: 0,
            root_dispersion: 0,
            reference_id: [0; 4],
            reference: NtpInstant::ZERO,
            originate: NtpInstant::ZERO,
            receive: NtpInstant::ZERO,
            transmit: NtpInstant::ZERO,
        }
    }

    /// Parse a packet from bytes.
    pub fn parse(buf: &[u8]) -> SundialResult<Self> {
        if buf.len() < PACKET_SIZE {
            return Err(SundialError::BufferTooShort {
                expected: PACKET_SIZE,
                actual: buf.len(),
            });
        }

        let flags = buf[0];

        Ok(Packet {
            leap: flags >> 6,
            version: (flags >> 3) & 0b111,
            mode: Mode::from_bits(flags),
            stratum: buf[1],
            poll: buf[2],
            precision: buf[3] as i8,
            root_delay: u32::from_be_bytes(buf[4..8].try_into().unwrap()),
            root_dispersion: u32::from_be_bytes(buf[8..12].try_into().unwrap()),
            reference_id: buf[12..16].try_into().unwrap(),
            reference: decode_timestamp(buf[16..24].try_into().unwrap()),
            originate: decode_timestamp(buf[24..32].try_into().unwrap()),
            receive: decode_timestamp(buf[32..40].try_into().unwrap()),
            transmit: decode_timestamp(buf[40..48].try_into().unwrap()),
        })
    }

    /// Serialize the packet to its 48-byte wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(PACKET_SIZE);

        buf.put_u8((self.leap << 6) | ((self.version & 0b111) << 3) | self.mode.to_bits());
        buf.put_u8(self.stratum);
        buf.put_u8(self.poll);
        buf.put_i8(self.precision);
        buf.put_u32(self.root_delay);
        buf.put_u32(self.root_dispersion);
        buf.put_slice(&self.reference_id);
        buf.put_slice(&encode_timestamp(self.reference));
        buf.put_slice(&encode_timestamp(self.originate));
        buf.put_slice(&encode_timestamp(self.receive));
        buf.put_slice(&encode_timestamp(self.transmit));

        debug_assert_eq!(buf.len(), PACKET_SIZE);
        buf.to_vec()
    }

    /// Server-requested poll interval in seconds (2^poll, so always >= 1).
    pub fn poll_interval_secs(&self) -> u64 {
        1u64 << self.poll.min(62)
    }

    /// Server clock precision in seconds (2^precision).
    pub fn precision_secs(&self) -> f64 {
        2f64.powi(self.precision as i32)
    }

    /// Reference identifier rendered as a dotted quad. Meaningful for
    /// stratum >= 2, where the field carries the upstream server's IPv4
    /// address.
    pub fn reference_ip(&self) -> String {
        let [a, b, c, d] = self.reference_id;
        format!("{a}.{b}.{c}.{d}")
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mode {} ; vers. {} ; li {} ; stratum {}",
            self.mode.to_bits(),
            self.version,
            self.leap,
            self.stratum
        )
    }
}
