//! Rain tip counting.
//!
//! The tipping bucket closes a switch on the tip input once per unit of
//! rainfall. A falling edge on that line raises the external interrupt, and
//! the interrupt handler is the only code that ever writes the counter. The
//! power cycle only takes [`snapshot`](TipCounter::snapshot)s.
//!
//! The counter lives in a `static` so the handler can reach it:
//!
//! ```rust,ignore
//! use raingauge::tips::{on_tip_interrupt, TipCounter};
//!
//! static TIPS: TipCounter = TipCounter::new();
//!
//! #[interrupt]
//! fn EXTI1() {
//!     on_tip_interrupt(&TIPS, &mut board::Exti::steal());
//! }
//! ```
//!
//! On targets with native 32-bit atomics the increment is a single
//! `fetch_add`. Elsewhere it is a read-modify-write inside
//! `critical_section::with`, which masks interrupts for exactly that
//! increment and nothing more.

#[cfg(not(target_has_atomic = "32"))]
use core::cell::Cell;
#[cfg(not(target_has_atomic = "32"))]
use critical_section::Mutex;

#[cfg(target_has_atomic = "32")]
use core::sync::atomic::{AtomicU32, Ordering};

/// Edge polarity of an external interrupt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Edge {
    /// Low to high transition.
    Rising,
    /// High to low transition. The tip switch pulls the line low.
    Falling,
}

/// The interrupt controller as seen by the firmware core.
///
/// Implementations are thin register wrappers. The ISR and the power cycle
/// each hold one, so implementations must not keep state of their own.
pub trait InterruptController {
    /// Selects which edge of the tip input raises the interrupt.
    fn set_tip_edge(&mut self, edge: Edge);
    /// Unmasks the tip interrupt line.
    fn enable_tip(&mut self);
    /// Masks the tip interrupt line.
    fn disable_tip(&mut self);
    /// Whether the tip interrupt flag is set.
    fn tip_pending(&self) -> bool;
    /// Clears the tip interrupt flag.
    fn clear_tip_pending(&mut self);
    /// Enables interrupt delivery to the core.
    fn enable_global(&mut self);
    /// Disables interrupt delivery to the core.
    fn disable_global(&mut self);
}

/// Number of bucket tips since power-on.
///
/// Only ever incremented, by one per edge. Wraps at `u32::MAX`, which at
/// one tip per 0.2 mm of rain is not reachable in the life of a battery.
pub struct TipCounter {
    #[cfg(target_has_atomic = "32")]
    count: AtomicU32,
    #[cfg(not(target_has_atomic = "32"))]
    count: Mutex<Cell<u32>>,
}

impl TipCounter {
    /// A counter at zero, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            #[cfg(target_has_atomic = "32")]
            count: AtomicU32::new(0),
            #[cfg(not(target_has_atomic = "32"))]
            count: Mutex::new(Cell::new(0)),
        }
    }

    /// Records one tip. Interrupt context only.
    #[cfg(target_has_atomic = "32")]
    pub fn increment(&self) {
        let _ = self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one tip. Interrupt context only.
    #[cfg(not(target_has_atomic = "32"))]
    pub fn increment(&self) {
        critical_section::with(|cs| {
            let count = self.count.borrow(cs);
            count.set(count.get().wrapping_add(1));
        });
    }

    /// The current count. May be one behind by the time the caller uses it.
    #[cfg(target_has_atomic = "32")]
    pub fn snapshot(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// The current count. May be one behind by the time the caller uses it.
    #[cfg(not(target_has_atomic = "32"))]
    pub fn snapshot(&self) -> u32 {
        critical_section::with(|cs| self.count.borrow(cs).get())
    }
}

impl core::fmt::Debug for TipCounter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TipCounter")
            .field("count", &self.snapshot())
            .finish()
    }
}

impl Default for TipCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of the tip interrupt handler.
///
/// Counts the tip and acknowledges the line. Entries without the tip flag
/// set (a shared vector, or a spurious wake) are ignored.
///
/// # Returns
/// `true` if a tip was counted.
pub fn on_tip_interrupt<I: InterruptController>(counter: &TipCounter, irq: &mut I) -> bool {
    if !irq.tip_pending() {
        return false;
    }
    counter.increment();
    irq.clear_tip_pending();
    true
}
