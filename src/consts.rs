//! Constants used across the rain gauge firmware.
//!
//! This module defines the deployment-wide constants: the device identity,
//! radio parameters, the telemetry frame layout, the under-voltage lockout
//! threshold and the fixed delays of the power cycle.
//!
//! None of these are configurable at runtime. A different deployment is a
//! different build.
//!
//! ## Key Concepts
//!
//! - **Frame layout**: fixed 50-byte frame, offsets listed below, multi-byte
//!   fields big-endian, checksum trailer low byte first.
//! - **UVLO**: raw ADC threshold below which the radio is not keyed.
//! - **Poll budget**: the bound on waiting for the transceiver to finish.

/// Total length (in bytes) of a telemetry frame, including the checksum trailer.
pub const FRAME_LEN: usize = 50;

/// Number of leading frame bytes covered by the checksum.
pub const CHECKSUMMED_LEN: usize = FRAME_LEN - 2;

/// Offset of the two-byte device type identifier.
pub const OFFSET_DEVICE_TYPE: usize = 1;
/// Offset of the eight-byte device address.
pub const OFFSET_ADDRESS: usize = 3;
/// Offset of the firmware version byte.
pub const OFFSET_FIRMWARE: usize = 11;
/// Offset of the 32-bit message sequence counter.
pub const OFFSET_SEQUENCE: usize = 12;
/// Offset of the 16-bit battery reading.
pub const OFFSET_BATTERY: usize = 16;
/// Offset of the 16-bit temperature reading.
pub const OFFSET_TEMPERATURE: usize = 18;
/// Offset of the first reserved voltage channel (always zero on this node).
pub const OFFSET_V1: usize = 20;
/// Offset of the second reserved voltage channel (always zero on this node).
pub const OFFSET_V2: usize = 22;
/// Offset of the 32-bit tip counter.
pub const OFFSET_TIPS: usize = 24;
/// Offset of the zero-filled reserved area, which runs up to the checksum.
pub const OFFSET_RESERVED: usize = 28;
/// Offset of the checksum low byte. The high byte follows it.
pub const OFFSET_CHECKSUM: usize = CHECKSUMMED_LEN;

/// Device type identifier shared by every rain gauge.
pub const DEVICE_TYPE: [u8; 2] = [0x00, 0x01];

/// Unique address of this node. Must differ on every unit in a deployment.
pub const DEVICE_ADDRESS: [u8; 8] = [0xE6, 0xBA, 0x08, 0xFB, 0x3A, 0x4F, 0x5E, 0xCE];

/// Firmware version carried in every frame.
pub const FIRMWARE_VERSION: u8 = 0x08;

/// Carrier frequency in hertz (866.5 MHz).
pub const TX_FREQUENCY_HZ: u32 = 866_500_000;

/// LoRa synchronization word shared with the receiver.
pub const SYNC_WORD: u8 = 0x55;

/// Supply voltage (millivolts) below which the radio is not keyed.
pub const BATTERY_UVLO_MV: u16 = 2_000;

/// Millivolts per battery ADC count.
///
/// The battery is read through a 30k/10k divider against the 1.024 V fixed
/// reference: one count of a 10-bit conversion is ~1 mV at the pin, ~4 mV
/// at the battery.
pub const BATTERY_MV_PER_COUNT: u16 = 4;

/// Raw battery reading equivalent to [`BATTERY_UVLO_MV`].
pub const BATTERY_UVLO_COUNTS: u16 = BATTERY_UVLO_MV / BATTERY_MV_PER_COUNT;

/// Full-scale value of a 10-bit conversion.
pub const ADC_FULL_SCALE: u16 = 1023;

/// Beta coefficient of the 10k NTC thermistor on the temperature channel.
pub const NTC_BETA: f32 = 3950.0;

/// Maximum number of status reads while waiting for the transceiver.
pub const TX_POLL_ATTEMPTS: u8 = 50;

/// Delay (milliseconds) after each status read that showed no flags.
pub const TX_POLL_INTERVAL_MS: u32 = 10;

/// Delay (milliseconds) after commanding the transceiver to sleep.
pub const RADIO_SLEEP_SETTLE_MS: u32 = 10;

/// Delay (milliseconds) after bring-up, before the first conversion.
pub const BRINGUP_SETTLE_MS: u32 = 5;

/// Number of fault indicator flashes on under-voltage.
pub const FAULT_BLINKS: u8 = 3;

/// On and off time (milliseconds) of each fault indicator flash.
pub const FAULT_BLINK_MS: u32 = 300;
