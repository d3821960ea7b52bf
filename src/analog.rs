//! Battery and temperature sampling.
//!
//! Two channels are read once per cycle:
//!
//! - **Battery** (AN0) through a 30k/10k divider, against the internal
//!   1.024 V fixed reference so the reading does not track the supply it
//!   is measuring.
//! - **Temperature** (AN1) through a 10k NTC / 10k divider from the supply,
//!   against the supply reference, which makes the reading ratiometric.
//!
//! Conversions are blocking. The converter finishes in a few tens of
//! microseconds and there is no timeout: a converter that never signals
//! completion hangs the cycle.

use crate::consts::{ADC_FULL_SCALE, BATTERY_MV_PER_COUNT, NTC_BETA};
use core::convert::Infallible;
use nb::block;

/// Positive voltage reference of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Reference {
    /// The supply rail.
    Supply,
    /// The internal 1.024 V fixed voltage reference.
    Fixed1V024,
}

/// Analog input channel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Channel(pub u8);

/// Channel wired to the battery divider.
pub const BATTERY_CHANNEL: Channel = Channel(0);

/// Channel wired to the NTC divider.
pub const TEMPERATURE_CHANNEL: Channel = Channel(1);

/// The analog subsystem as seen by the firmware core.
pub trait AnalogFrontEnd {
    /// Powers the converter and the fixed reference, and configures
    /// acquisition time, conversion clock and result format.
    fn power_on(&mut self);
    /// Powers the converter and the fixed reference down.
    fn power_off(&mut self);
    /// Routes `channel` to the converter and selects `reference`.
    fn select(&mut self, reference: Reference, channel: Channel);
    /// Starts a conversion.
    fn start_conversion(&mut self);
    /// Whether the last conversion has finished.
    fn conversion_done(&mut self) -> bool;
    /// The result register pair, high byte first.
    fn result(&mut self) -> [u8; 2];
}

/// Reads the two sensor channels through an [`AnalogFrontEnd`].
#[derive(Debug)]
pub struct AnalogSampler<A> {
    adc: A,
}

impl<A: AnalogFrontEnd> AnalogSampler<A> {
    /// Wraps `adc`. The converter stays off until [`enable`](Self::enable).
    pub fn new(adc: A) -> Self {
        Self { adc }
    }

    /// Powers the converter for a round of conversions.
    pub fn enable(&mut self) {
        self.adc.power_on();
    }

    /// Powers the converter down for sleep.
    pub fn disable(&mut self) {
        self.adc.power_off();
    }

    /// Raw battery reading.
    pub fn read_battery(&mut self) -> u16 {
        self.convert(Reference::Fixed1V024, BATTERY_CHANNEL)
    }

    /// Raw temperature reading.
    pub fn read_temperature(&mut self) -> u16 {
        self.convert(Reference::Supply, TEMPERATURE_CHANNEL)
    }

    /// The wrapped front end.
    pub fn front_end(&self) -> &A {
        &self.adc
    }

    /// Releases the front end.
    pub fn release(self) -> A {
        self.adc
    }

    fn convert(&mut self, reference: Reference, channel: Channel) -> u16 {
        self.adc.select(reference, channel);
        self.adc.start_conversion();
        match block!(self.poll_conversion()) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    fn poll_conversion(&mut self) -> nb::Result<u16, Infallible> {
        if !self.adc.conversion_done() {
            return Err(nb::Error::WouldBlock);
        }
        Ok(u16::from_be_bytes(self.adc.result()))
    }
}

/// Battery voltage in millivolts for a raw battery reading.
pub fn battery_millivolts(raw: u16) -> u32 {
    raw as u32 * BATTERY_MV_PER_COUNT as u32
}

/// Temperature in degrees Celsius for a raw temperature reading.
///
/// Beta equation for a 10k (at 25 °C) NTC between the supply and the pin
/// with 10k to ground. Readings at either rail have no finite answer and
/// yield `None`.
pub fn ntc_celsius(raw: u16) -> Option<f32> {
    if raw == 0 || raw >= ADC_FULL_SCALE {
        return None;
    }
    const T25_KELVIN: f32 = 298.15;
    let ratio = ADC_FULL_SCALE as f32 / raw as f32 - 1.0;
    let inv_t = 1.0 / T25_KELVIN + libm::logf(ratio) / NTC_BETA;
    Some(1.0 / inv_t - 273.15)
}
