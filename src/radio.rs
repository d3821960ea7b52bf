//! LoRa transmit hand-off.
//!
//! This module provides the [`TxSequencer`], which owns the transceiver and
//! the activity indicator and drives a single fire-and-forget transmission:
//!
//! 1. configure frequency and sync word,
//! 2. clear stale IRQ flags,
//! 3. indicator on, hand the frame to the transceiver,
//! 4. poll the IRQ flags under a [`PollBudget`],
//! 5. put the transceiver to sleep, whatever happened before,
//! 6. bump the message counter, indicator off.
//!
//! A timeout is reported, never retried. Bus errors from the transceiver
//! skip the rest of the hand-off but still reach steps 5 and 6, so the radio
//! is never left awake when the node goes to sleep.
//!
//! The transceiver driver itself (register map, SPI framing) lives behind
//! the [`Transceiver`] trait.

use crate::consts::{
    RADIO_SLEEP_SETTLE_MS, SYNC_WORD, TX_FREQUENCY_HZ, TX_POLL_ATTEMPTS, TX_POLL_INTERVAL_MS,
};
use crate::frame::TelemetryFrame;
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use thiserror::Error;

/// The LoRa transceiver as seen by the firmware core.
pub trait Transceiver {
    /// Bus or driver error.
    type Error: Debug;

    /// Wakes the transceiver into LoRa standby and programs the carrier
    /// frequency and sync word.
    fn configure(&mut self, frequency_hz: u32, sync_word: u8) -> Result<(), Self::Error>;
    /// Clears every IRQ flag.
    fn clear_status_flags(&mut self) -> Result<(), Self::Error>;
    /// Loads `payload` into the FIFO and starts transmitting. Returns once
    /// the bytes are handed off, not when they are on air.
    fn transmit(&mut self, payload: &[u8]) -> Result<(), Self::Error>;
    /// Reads the IRQ flag register. Nonzero once the transmission has
    /// finished (or failed).
    fn read_status_flags(&mut self) -> Result<u8, Self::Error>;
    /// Puts the transceiver in its lowest-power sleep mode.
    fn enter_sleep(&mut self) -> Result<(), Self::Error>;
}

/// A bounded wait: a number of attempts with a fixed pause after each
/// unsuccessful one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct PollBudget {
    /// Maximum number of probes.
    pub attempts: u8,
    /// Pause after each probe that was not ready, in milliseconds.
    pub interval_ms: u32,
}

/// Budget for the transceiver to report the end of a transmission.
pub const TX_COMPLETE_POLL: PollBudget = PollBudget::new(TX_POLL_ATTEMPTS, TX_POLL_INTERVAL_MS);

/// Outcome of [`PollBudget::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Polled<T> {
    /// The probe produced a value.
    Ready {
        /// The value.
        value: T,
        /// Probes spent, including the successful one.
        attempts: u8,
    },
    /// Every probe came back empty.
    Expired,
}

impl PollBudget {
    /// A budget of `attempts` probes, `interval_ms` apart.
    pub const fn new(attempts: u8, interval_ms: u32) -> Self {
        Self {
            attempts,
            interval_ms,
        }
    }

    /// Longest time the budget can block, in milliseconds.
    pub const fn timeout_ms(&self) -> u32 {
        self.attempts as u32 * self.interval_ms
    }

    /// Runs `probe` until it yields a value or the budget is spent.
    ///
    /// The first probe error is returned immediately.
    pub fn poll<T, E, D, F>(&self, delay: &mut D, mut probe: F) -> Result<Polled<T>, E>
    where
        D: DelayNs,
        F: FnMut() -> Result<Option<T>, E>,
    {
        for attempt in 1..=self.attempts {
            if let Some(value) = probe()? {
                return Ok(Polled::Ready {
                    value,
                    attempts: attempt,
                });
            }
            delay.delay_ms(self.interval_ms);
        }
        Ok(Polled::Expired)
    }
}

/// The step of the hand-off a transceiver error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum RadioStep {
    /// Frequency and sync word setup.
    Configure,
    /// IRQ flag clear.
    ClearFlags,
    /// FIFO load and transmit start.
    Transmit,
    /// IRQ flag read while waiting for completion.
    ReadFlags,
    /// Sleep command.
    Sleep,
}

/// A transceiver error, tagged with where it happened.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[error("transceiver error during {step:?}")]
pub struct RadioError {
    /// The failing step.
    pub step: RadioStep,
}

/// How a transmission attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum TxOutcome {
    /// The transceiver raised an IRQ flag within the budget.
    Completed {
        /// The nonzero flag register value.
        flags: u8,
        /// Status reads it took.
        polls: u8,
    },
    /// No IRQ flag within the budget.
    TimedOut,
    /// A transceiver call failed and the hand-off was cut short.
    Fault(RadioError),
}

/// Result of [`TxSequencer::transmit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct TxReport {
    /// Message counter value this attempt consumed.
    pub sequence: u32,
    /// How the attempt ended.
    pub outcome: TxOutcome,
    /// Whether the sleep command was accepted.
    pub radio_asleep: bool,
}

/// Drives the transceiver through one transmission per call.
#[derive(Debug)]
pub struct TxSequencer<R, S> {
    radio: R,
    activity: S,
    budget: PollBudget,
    message_count: u32,
}

impl<R, S> TxSequencer<R, S>
where
    R: Transceiver,
    S: OutputPin,
{
    /// Takes ownership of the transceiver and the activity indicator, which
    /// is driven low.
    pub fn new(radio: R, activity: S) -> Self {
        Self::with_budget(radio, activity, TX_COMPLETE_POLL)
    }

    /// Like [`new`](Self::new), with a custom completion budget.
    pub fn with_budget(radio: R, mut activity: S, budget: PollBudget) -> Self {
        let _ = activity.set_low();
        Self {
            radio,
            activity,
            budget,
            message_count: 0,
        }
    }

    /// Number of transmissions attempted since power-on. This is the
    /// sequence number the next frame must carry.
    pub fn message_count(&self) -> u32 {
        self.message_count
    }

    /// Sends `frame` once and leaves the transceiver asleep.
    pub fn transmit<D: DelayNs>(&mut self, frame: &TelemetryFrame, delay: &mut D) -> TxReport {
        let sequence = self.message_count;
        let outcome = match self.hand_off(frame, delay) {
            Ok(Polled::Ready { value, attempts }) => {
                info!("tx done after {} polls, flags {}", attempts, value);
                TxOutcome::Completed {
                    flags: value,
                    polls: attempts,
                }
            }
            Ok(Polled::Expired) => {
                warn!("tx timed out after {} ms", self.budget.timeout_ms());
                TxOutcome::TimedOut
            }
            Err(err) => {
                error!("tx aborted at {:?}", err.step);
                TxOutcome::Fault(err)
            }
        };

        let radio_asleep = self.radio.enter_sleep().is_ok();
        if !radio_asleep {
            error!("transceiver refused sleep");
        }
        delay.delay_ms(RADIO_SLEEP_SETTLE_MS);
        self.message_count = self.message_count.wrapping_add(1);
        let _ = self.activity.set_low();

        TxReport {
            sequence,
            outcome,
            radio_asleep,
        }
    }

    fn hand_off<D: DelayNs>(
        &mut self,
        frame: &TelemetryFrame,
        delay: &mut D,
    ) -> Result<Polled<u8>, RadioError> {
        let radio = &mut self.radio;
        radio
            .configure(TX_FREQUENCY_HZ, SYNC_WORD)
            .map_err(|_| RadioError {
                step: RadioStep::Configure,
            })?;
        radio.clear_status_flags().map_err(|_| RadioError {
            step: RadioStep::ClearFlags,
        })?;

        let _ = self.activity.set_high();
        radio.transmit(frame.as_ref()).map_err(|_| RadioError {
            step: RadioStep::Transmit,
        })?;
        debug!("waiting for end of transmission");

        self.budget.poll(delay, || match radio.read_status_flags() {
            Ok(0) => Ok(None),
            Ok(flags) => Ok(Some(flags)),
            Err(_) => Err(RadioError {
                step: RadioStep::ReadFlags,
            }),
        })
    }

    /// Releases the transceiver and the indicator.
    pub fn release(self) -> (R, S) {
        (self.radio, self.activity)
    }
}
