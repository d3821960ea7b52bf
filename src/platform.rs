//! Board bring-up, bring-down and sleep.
//!
//! The register-level work of powering peripherals up and down is board
//! specific and lives behind [`Platform`]. What the core does pin down is the
//! state every pin must be left in before sleep, as [`sleep_level`]:
//!
//! | Role                 | Level in sleep | Constraint                      |
//! |----------------------|----------------|---------------------------------|
//! | [`PinRole::General`] | output low     |                                 |
//! | tip input            | input          | the edge must still wake us     |
//! | radio chip select    | output high    | active low: keep it deselected  |
//! | radio data in        | input          | driven by the transceiver       |
//! | peripheral power     | output high    | active low switch: keep it off  |
//!
//! A [`Platform::bring_down`] implementation walks its whole pin map
//! through [`sleep_level`], not only the pins the cycle used.

use core::fmt::Debug;

/// What a pin is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum PinRole {
    /// Unused, an indicator, or any line with no sleep requirement.
    General,
    /// The tipping bucket switch (external interrupt input).
    TipInput,
    /// Transceiver chip select, active low.
    RadioChipSelect,
    /// SPI data from the transceiver.
    RadioDataIn,
    /// Power switch of the external circuitry, active low.
    PeripheralPower,
}

/// Electrical state of a pin while the node sleeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum SleepLevel {
    /// Driven low.
    OutputLow,
    /// Driven high.
    OutputHigh,
    /// High impedance, digital input buffer enabled.
    Input,
}

/// The state `role` must be left in before sleep.
pub const fn sleep_level(role: PinRole) -> SleepLevel {
    match role {
        PinRole::General => SleepLevel::OutputLow,
        PinRole::TipInput | PinRole::RadioDataIn => SleepLevel::Input,
        PinRole::RadioChipSelect | PinRole::PeripheralPower => SleepLevel::OutputHigh,
    }
}

/// Why the node left sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum WakeReason {
    /// The tip interrupt fired.
    TipEdge,
    /// A timed wake source expired. Boards without one never report it.
    Timer,
    /// Any other wake (reset, debugger, unidentified source).
    Other,
}

/// The board as seen by the power cycle.
pub trait Platform {
    /// Bring-up or bring-down failure.
    type Error: Debug;

    /// Powers what an active cycle needs: serial diagnostics, the SPI link
    /// to the transceiver, the analog subsystem and its pins, indicator
    /// outputs, the tip input, and the external circuitry.
    fn bring_up(&mut self) -> Result<(), Self::Error>;

    /// Leaves every pin at its [`sleep_level`] and gates off every
    /// peripheral clock that sleep does not need.
    fn bring_down(&mut self) -> Result<(), Self::Error>;

    /// Enters the deepest sleep mode and returns once woken.
    fn sleep(&mut self) -> WakeReason;
}
