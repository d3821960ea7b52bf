//! The wake, measure, transmit, sleep cycle.
//!
//! [`PowerCycle`] owns every collaborator and moves through [`CycleState`]s
//! one [`step`](PowerCycle::step) at a time:
//!
//! ```text
//! BringUp -> Sample -> Decide -+-> Transmit -+-> Quiesce -> Sleep -> BringUp
//!                              +-> Skip -----+
//! ```
//!
//! There is no terminal state. [`run`](PowerCycle::run) loops forever; the
//! node stops when its battery is removed. Every path, including the
//! under-voltage skip and a failed transmission, goes through `Quiesce`
//! before `Sleep`.
//!
//! ## Example
//!
//! The activity and fault indicators are two distinct pins, each owned once:
//! here the green LED shows transmissions and the red LED the under-voltage
//! lockout.
//!
//! ```rust,ignore
//! static TIPS: TipCounter = TipCounter::new();
//!
//! #[entry]
//! fn main() -> ! {
//!     let board = board::take();
//!     let mut cycle = PowerCycle::new(
//!         board.power,
//!         AnalogSampler::new(board.adc),
//!         TxSequencer::new(board.lora, board.green_led),
//!         board.exti,
//!         board.red_led,
//!         board.delay,
//!         &TIPS,
//!     );
//!     cycle.run()
//! }
//! ```

use crate::analog::{AnalogFrontEnd, AnalogSampler, battery_millivolts, ntc_celsius};
use crate::consts::{BATTERY_UVLO_COUNTS, BRINGUP_SETTLE_MS, FAULT_BLINK_MS, FAULT_BLINKS};
use crate::frame::{DeviceIdentity, MeasurementSnapshot, encode};
use crate::platform::{Platform, WakeReason};
use crate::radio::{Transceiver, TxReport, TxSequencer};
use crate::tips::{Edge, InterruptController, TipCounter};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// States of the power cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum CycleState {
    /// Power peripherals up and unmask the tip interrupt.
    BringUp,
    /// Read both channels and snapshot the counters.
    Sample,
    /// Compare the battery reading with the lockout threshold.
    Decide(MeasurementSnapshot),
    /// Encode and send the frame.
    Transmit(MeasurementSnapshot),
    /// Battery too low: flash the fault indicator instead of transmitting.
    Skip(MeasurementSnapshot),
    /// Power peripherals down and park every pin.
    Quiesce,
    /// Wait for a wake source.
    Sleep,
}

/// Timing and threshold parameters of the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct CycleConfig {
    /// Lowest raw battery reading that may key the radio.
    pub uvlo_threshold: u16,
    /// Delay after bring-up, in milliseconds.
    pub settle_ms: u32,
    /// Number of fault indicator flashes on under-voltage.
    pub fault_blinks: u8,
    /// On and off time of each flash, in milliseconds.
    pub fault_blink_ms: u32,
}

impl CycleConfig {
    /// The values this firmware ships with.
    pub const DEFAULT: Self = Self {
        uvlo_threshold: BATTERY_UVLO_COUNTS,
        settle_ms: BRINGUP_SETTLE_MS,
        fault_blinks: FAULT_BLINKS,
        fault_blink_ms: FAULT_BLINK_MS,
    };
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What happened during one pass of [`PowerCycle::run_cycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct CycleReport {
    /// The snapshot the cycle decided on.
    pub snapshot: Option<MeasurementSnapshot>,
    /// The transmission, if the battery allowed one.
    pub transmission: Option<TxReport>,
    /// What ended the sleep.
    pub wake: Option<WakeReason>,
}

/// Picks the branch for `snapshot`: transmit at or above `threshold`,
/// skip below it.
pub fn decide(snapshot: &MeasurementSnapshot, threshold: u16) -> CycleState {
    if snapshot.battery >= threshold {
        CycleState::Transmit(*snapshot)
    } else {
        CycleState::Skip(*snapshot)
    }
}

/// The top-level state machine of the node.
///
/// ## Type Parameters
///
/// - `P`: the board, see [`Platform`]
/// - `A`: the analog subsystem, see [`AnalogFrontEnd`]
/// - `R`: the LoRa transceiver, see [`Transceiver`]
/// - `S`: the transmit activity indicator
/// - `I`: the interrupt controller, see [`InterruptController`]
/// - `F`: the fault indicator
/// - `D`: the blocking delay shared by every wait in the cycle
#[derive(Debug)]
pub struct PowerCycle<'a, P, A, R, S, I, F, D> {
    platform: P,
    sampler: AnalogSampler<A>,
    radio: TxSequencer<R, S>,
    irq: I,
    fault: F,
    delay: D,
    tips: &'a TipCounter,
    identity: DeviceIdentity,
    config: CycleConfig,
    report: CycleReport,
}

impl<'a, P, A, R, S, I, F, D> PowerCycle<'a, P, A, R, S, I, F, D>
where
    P: Platform,
    A: AnalogFrontEnd,
    R: Transceiver,
    S: OutputPin,
    I: InterruptController,
    F: OutputPin,
    D: DelayNs,
{
    /// Assembles the cycle with the deployed identity and default
    /// configuration. The tip line is set to trigger on the falling edge
    /// and the fault indicator is driven low.
    pub fn new(
        platform: P,
        sampler: AnalogSampler<A>,
        radio: TxSequencer<R, S>,
        mut irq: I,
        mut fault: F,
        delay: D,
        tips: &'a TipCounter,
    ) -> Self {
        irq.set_tip_edge(Edge::Falling);
        let _ = fault.set_low();
        Self {
            platform,
            sampler,
            radio,
            irq,
            fault,
            delay,
            tips,
            identity: DeviceIdentity::DEPLOYED,
            config: CycleConfig::DEFAULT,
            report: CycleReport::default(),
        }
    }

    /// Replaces the identity written into every frame.
    pub fn with_identity(mut self, identity: DeviceIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Replaces the timing and threshold parameters.
    pub fn with_config(mut self, config: CycleConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the cycle forever, starting from bring-up.
    pub fn run(&mut self) -> ! {
        let mut state = CycleState::BringUp;
        loop {
            state = self.step(state);
        }
    }

    /// Runs one pass, bring-up through sleep, and reports what happened.
    /// Returns after the node has been woken.
    pub fn run_cycle(&mut self) -> CycleReport {
        self.report = CycleReport::default();
        let mut state = CycleState::BringUp;
        loop {
            let waking = state == CycleState::Sleep;
            state = self.step(state);
            if waking {
                return self.report;
            }
        }
    }

    /// Performs `state` and returns the state that follows it.
    pub fn step(&mut self, state: CycleState) -> CycleState {
        match state {
            CycleState::BringUp => {
                self.bring_up();
                CycleState::Sample
            }
            CycleState::Sample => CycleState::Decide(self.sample()),
            CycleState::Decide(snapshot) => {
                self.report.snapshot = Some(snapshot);
                decide(&snapshot, self.config.uvlo_threshold)
            }
            CycleState::Transmit(snapshot) => {
                let frame = encode(&self.identity, &snapshot);
                self.report.transmission = Some(self.radio.transmit(&frame, &mut self.delay));
                CycleState::Quiesce
            }
            CycleState::Skip(snapshot) => {
                warn!(
                    "battery {} mV below lockout, not transmitting",
                    battery_millivolts(snapshot.battery)
                );
                self.flash_fault();
                CycleState::Quiesce
            }
            CycleState::Quiesce => {
                self.quiesce();
                CycleState::Sleep
            }
            CycleState::Sleep => {
                debug!("sleeping");
                let wake = self.platform.sleep();
                debug!("woken by {:?}", wake);
                self.report.wake = Some(wake);
                CycleState::BringUp
            }
        }
    }

    /// Transmissions attempted since power-on.
    pub fn message_count(&self) -> u32 {
        self.radio.message_count()
    }

    fn bring_up(&mut self) {
        if self.platform.bring_up().is_err() {
            error!("platform bring-up failed");
        }
        self.sampler.enable();
        self.irq.enable_tip();
        self.irq.clear_tip_pending();
        self.irq.enable_global();
        self.delay.delay_ms(self.config.settle_ms);
        info!("rain gauge awake");
    }

    fn sample(&mut self) -> MeasurementSnapshot {
        let battery = self.sampler.read_battery();
        let temperature = self.sampler.read_temperature();
        let snapshot = MeasurementSnapshot {
            battery,
            temperature,
            tips: self.tips.snapshot(),
            sequence: self.radio.message_count(),
        };
        debug!(
            "battery {} ({} mV), temperature {} ({:?} C)",
            battery,
            battery_millivolts(battery),
            temperature,
            ntc_celsius(temperature)
        );
        info!("message {}, tips {}", snapshot.sequence, snapshot.tips);
        snapshot
    }

    fn flash_fault(&mut self) {
        for _ in 0..self.config.fault_blinks {
            let _ = self.fault.set_high();
            self.delay.delay_ms(self.config.fault_blink_ms);
            let _ = self.fault.set_low();
            self.delay.delay_ms(self.config.fault_blink_ms);
        }
    }

    fn quiesce(&mut self) {
        self.sampler.disable();
        if self.platform.bring_down().is_err() {
            error!("platform bring-down failed");
        }
    }
}
