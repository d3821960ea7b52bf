//! Telemetry frame encoding, verification and decoding.
//!
//! Every transmission is a single fixed-length frame. The layout is shared
//! with the ground station, so the encoder must be byte-exact:
//!
//! | Offset | Size | Field                              |
//! |--------|------|------------------------------------|
//! | 0      | 1    | frame length (always 50)           |
//! | 1      | 2    | device type                        |
//! | 3      | 8    | device address                     |
//! | 11     | 1    | firmware version                   |
//! | 12     | 4    | message sequence counter           |
//! | 16     | 2    | battery reading                    |
//! | 18     | 2    | temperature reading                |
//! | 20     | 4    | two reserved voltage channels (0)  |
//! | 24     | 4    | tip counter                        |
//! | 28     | 20   | reserved (0)                       |
//! | 48     | 2    | checksum, low byte then high byte  |
//!
//! Multi-byte fields are big-endian; only the checksum trailer is sent
//! low byte first. The checksum covers bytes `0..48`.
//!
//! The node itself only ever calls [`encode`]. [`verify`] and [`decode`]
//! exist for receivers and tests.

use crate::consts::{
    CHECKSUMMED_LEN, DEVICE_ADDRESS, DEVICE_TYPE, FIRMWARE_VERSION, FRAME_LEN, OFFSET_ADDRESS,
    OFFSET_BATTERY, OFFSET_CHECKSUM, OFFSET_DEVICE_TYPE, OFFSET_FIRMWARE, OFFSET_SEQUENCE,
    OFFSET_TEMPERATURE, OFFSET_TIPS,
};
use crate::crc::{Checksum, Crc16};
use thiserror::Error;

/// The constant identity of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct DeviceIdentity {
    /// Device type identifier pair.
    pub device_type: [u8; 2],
    /// Unique 8-byte address.
    pub address: [u8; 8],
    /// Firmware version.
    pub firmware: u8,
}

impl DeviceIdentity {
    /// The identity this build was made for.
    pub const DEPLOYED: Self = Self {
        device_type: DEVICE_TYPE,
        address: DEVICE_ADDRESS,
        firmware: FIRMWARE_VERSION,
    };
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self::DEPLOYED
    }
}

/// Readings and counters captured once per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct MeasurementSnapshot {
    /// Raw battery conversion.
    pub battery: u16,
    /// Raw temperature conversion.
    pub temperature: u16,
    /// Tip count at capture time.
    pub tips: u32,
    /// Message sequence number at capture time.
    pub sequence: u32,
}

/// A complete, checksummed telemetry frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryFrame([u8; FRAME_LEN]);

impl TelemetryFrame {
    /// The frame bytes, in transmission order.
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// The checksum carried in the trailer.
    pub fn checksum(&self) -> u16 {
        u16::from_le_bytes([self.0[OFFSET_CHECKSUM], self.0[OFFSET_CHECKSUM + 1]])
    }
}

impl AsRef<[u8]> for TelemetryFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<TelemetryFrame> for [u8; FRAME_LEN] {
    fn from(frame: TelemetryFrame) -> Self {
        frame.0
    }
}

/// Wraps received bytes as-is. Nothing is checked until [`verify`] or
/// [`decode`].
impl From<[u8; FRAME_LEN]> for TelemetryFrame {
    fn from(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }
}

/// Fields recovered from a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Telemetry {
    /// Identity of the sending node.
    pub identity: DeviceIdentity,
    /// Readings and counters of the sending node.
    pub snapshot: MeasurementSnapshot,
}

/// Reasons a received buffer is not a valid frame.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum FrameError {
    /// The buffer is not exactly one frame long.
    #[error("expected a 50 byte frame, got {found} bytes")]
    Length {
        /// Length of the rejected buffer.
        found: usize,
    },
    /// The length byte does not announce a full frame.
    #[error("frame length field is {found}, expected 50")]
    LengthField {
        /// Value of byte 0.
        found: u8,
    },
    /// The trailer does not match the computed checksum.
    #[error("checksum mismatch: computed {expected:#06x}, trailer {found:#06x}")]
    Checksum {
        /// Checksum computed over bytes `0..48`.
        expected: u16,
        /// Checksum carried in the trailer.
        found: u16,
    },
}

/// Builds the frame for `snapshot` using the default [`Crc16`] checksum.
pub fn encode(identity: &DeviceIdentity, snapshot: &MeasurementSnapshot) -> TelemetryFrame {
    encode_with(&Crc16, identity, snapshot)
}

/// Builds the frame for `snapshot`, sealing it with `checksum`.
pub fn encode_with<C: Checksum>(
    checksum: &C,
    identity: &DeviceIdentity,
    snapshot: &MeasurementSnapshot,
) -> TelemetryFrame {
    let mut buf = [0u8; FRAME_LEN];
    buf[0] = FRAME_LEN as u8;
    put(&mut buf, OFFSET_DEVICE_TYPE, &identity.device_type);
    put(&mut buf, OFFSET_ADDRESS, &identity.address);
    buf[OFFSET_FIRMWARE] = identity.firmware;
    put(&mut buf, OFFSET_SEQUENCE, &snapshot.sequence.to_be_bytes());
    put(&mut buf, OFFSET_BATTERY, &snapshot.battery.to_be_bytes());
    put(&mut buf, OFFSET_TEMPERATURE, &snapshot.temperature.to_be_bytes());
    // Reserved voltage channels and the tail of the data area stay zero.
    put(&mut buf, OFFSET_TIPS, &snapshot.tips.to_be_bytes());

    let crc = checksum.checksum(&buf[..CHECKSUMMED_LEN]);
    put(&mut buf, OFFSET_CHECKSUM, &crc.to_le_bytes());
    TelemetryFrame(buf)
}

/// Checks the trailer of `frame` against the default [`Crc16`] checksum.
pub fn verify(frame: &TelemetryFrame) -> bool {
    verify_with(&Crc16, frame)
}

/// Checks the trailer of `frame` against `checksum`.
pub fn verify_with<C: Checksum>(checksum: &C, frame: &TelemetryFrame) -> bool {
    checksum.checksum(&frame.0[..CHECKSUMMED_LEN]) == frame.checksum()
}

/// Parses and validates a received frame using the default [`Crc16`] checksum.
pub fn decode(bytes: &[u8]) -> Result<Telemetry, FrameError> {
    decode_with(&Crc16, bytes)
}

/// Parses and validates a received frame against `checksum`.
pub fn decode_with<C: Checksum>(checksum: &C, bytes: &[u8]) -> Result<Telemetry, FrameError> {
    let buf: [u8; FRAME_LEN] = bytes
        .try_into()
        .map_err(|_| FrameError::Length { found: bytes.len() })?;
    if buf[0] as usize != FRAME_LEN {
        return Err(FrameError::LengthField { found: buf[0] });
    }
    let frame = TelemetryFrame::from(buf);
    let expected = checksum.checksum(&buf[..CHECKSUMMED_LEN]);
    if expected != frame.checksum() {
        return Err(FrameError::Checksum {
            expected,
            found: frame.checksum(),
        });
    }

    Ok(Telemetry {
        identity: DeviceIdentity {
            device_type: take(&buf, OFFSET_DEVICE_TYPE),
            address: take(&buf, OFFSET_ADDRESS),
            firmware: buf[OFFSET_FIRMWARE],
        },
        snapshot: MeasurementSnapshot {
            battery: u16::from_be_bytes(take(&buf, OFFSET_BATTERY)),
            temperature: u16::from_be_bytes(take(&buf, OFFSET_TEMPERATURE)),
            tips: u32::from_be_bytes(take(&buf, OFFSET_TIPS)),
            sequence: u32::from_be_bytes(take(&buf, OFFSET_SEQUENCE)),
        },
    })
}

fn put(buf: &mut [u8; FRAME_LEN], offset: usize, bytes: &[u8]) {
    buf[offset..offset + bytes.len()].copy_from_slice(bytes);
}

fn take<const N: usize>(buf: &[u8; FRAME_LEN], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}
