//! 4x quadrature decoding shared by the GPIO encoder driver.
//!
//! Each edge on either encoder line updates a 2-bit `AB` state; the
//! transition from the previous state selects +1, -1 or 0 from a lookup
//! table. Transitions that skip a state (both lines changed at once) carry
//! no direction information and count as 0.

use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};

/// Indexed by `(prev << 2) | curr`, where a state is `(a << 1) | b`.
const TRANSITIONS: [i8; 16] = [0, 1, -1, 0, -1, 0, 0, 1, 1, 0, 0, -1, 0, -1, 1, 0];

/// Encoder line selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    A,
    B,
}

#[inline]
fn step(prev: u8, curr: u8) -> i8 {
    TRANSITIONS[usize::from(((prev & 0b11) << 2) | (curr & 0b11))]
}

/// Lock-free tick counter fed from edge callbacks.
///
/// Callbacks for line A and line B may run on different threads; the state
/// update is a single compare-and-swap so both lines see a consistent `AB`.
#[derive(Debug, Default)]
pub struct QuadratureCounter {
    state: AtomicU8,
    count: AtomicI64,
}

impl QuadratureCounter {
    pub fn new(a_high: bool, b_high: bool) -> Self {
        Self {
            state: AtomicU8::new((u8::from(a_high) << 1) | u8::from(b_high)),
            count: AtomicI64::new(0),
        }
    }

    /// Record a new level on one line and accumulate the resulting step.
    pub fn on_edge(&self, line: Line, high: bool) {
        let mask = match line {
            Line::A => 0b10,
            Line::B => 0b01,
        };
        let prev = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                Some(if high { s | mask } else { s & !mask })
            })
            .unwrap_or_else(|s| s);
        let curr = if high { prev | mask } else { prev & !mask };
        let delta = step(prev, curr);
        if delta != 0 {
            self.count.fetch_add(i64::from(delta), Ordering::AcqRel);
        }
    }

    /// Cumulative ticks since construction.
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Acquire)
    }
}
