//! # raingauge
//!
//! A portable, no_std firmware core for a battery-powered LoRa rain gauge.
//!
//! The node counts tipping-bucket events from an edge interrupt, wakes,
//! samples its battery and local temperature, sends one fixed 50-byte frame
//! and goes back to its deepest sleep. Everything board specific sits
//! behind small traits, so the cycle runs the same on the target and on a
//! host test bench:
//!
//! - [`tips::InterruptController`] for the tip line
//! - [`analog::AnalogFrontEnd`] for the converter
//! - [`radio::Transceiver`] for the LoRa module
//! - [`platform::Platform`] for bring-up, bring-down and sleep
//! - `embedded-hal` [`OutputPin`](embedded_hal::digital::OutputPin)s for the
//!   indicators and [`DelayNs`](embedded_hal::delay::DelayNs) for every wait
//!
//! ## Crate features
//! | Feature     | Description |
//! |-------------|-------------|
//! | `std`       | Builds against `std` (host tests and tools) |
//! | `log`       | Diagnostic output through `log` |
//! | `defmt-0-3` | Diagnostic output through `defmt` |
//!
//! Without a logging feature the firmware is silent, which is the
//! production configuration.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use raingauge::{cycle::PowerCycle, tips::{on_tip_interrupt, TipCounter}};
//!
//! static TIPS: TipCounter = TipCounter::new();
//!
//! #[interrupt]
//! fn INT1() {
//!     on_tip_interrupt(&TIPS, &mut board::Int1::steal());
//! }
//!
//! let mut cycle = PowerCycle::new(platform, sampler, sequencer, irq, fault_led, delay, &TIPS);
//! cycle.run()
//! ```
//!
//! ## Frame
//!
//! See [`frame`] for the byte layout. Receivers use [`frame::decode`].

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub use critical_section;

#[macro_use]
mod fmt;

pub mod analog;
pub mod consts;
pub mod crc;
pub mod cycle;
pub mod frame;
pub mod platform;
pub mod radio;
pub mod tips;
