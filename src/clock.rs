//! Clock valuation (C3)
//!
//! A concrete tuple of non-negative rationals, one per clock including the
//! always-zero reference clock at index 0. Grounded on the valuation
//! arithmetic in `strong-timed-bisim/certificate/contradiction/cont_node.cc`
//! (`set_valuation`, `reset_value`, the delay additions performed around
//! `max_delay`).

#![forbid(unsafe_code)]

use num_rational::Ratio;
use std::cmp::Ordering;

/// Exact rational clock value. The source restricts delays introduced by
/// the contradiction builder to denominator 1 or 2; valuations themselves
/// may carry arbitrary rationals inherited from guards.
pub type ClockValue = Ratio<i64>;

/// An ordered tuple of clock values, index 0 always `0` (the reference
/// clock).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Valuation {
    values: Vec<ClockValue>,
}

impl Valuation {
    /// Build a valuation of the given dimension, all clocks at zero.
    pub fn zero(dim: usize) -> Valuation {
        Valuation { values: vec![ClockValue::from_integer(0); dim] }
    }

    /// Build a valuation from explicit values; index 0 must be zero.
    pub fn from_values(values: Vec<ClockValue>) -> Valuation {
        debug_assert_eq!(values[0], ClockValue::from_integer(0), "reference clock must be 0");
        Valuation { values }
    }

    /// Number of clocks, including the reference clock.
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Value of clock `i`.
    pub fn get(&self, i: usize) -> ClockValue {
        self.values[i]
    }

    /// Reset clock `i` to zero.
    pub fn reset(&mut self, i: usize) {
        if i != 0 {
            self.values[i] = ClockValue::from_integer(0);
        }
    }

    /// `add_delay(src, delta)`: returns a new valuation with `delta` added to
    /// every non-reference clock.
    pub fn add_delay(&self, delta: ClockValue) -> Valuation {
        let mut values = self.values.clone();
        for (i, v) in values.iter_mut().enumerate() {
            if i != 0 {
                *v += delta;
            }
        }
        Valuation { values }
    }

    /// Component-wise lexical comparison.
    pub fn lexical_cmp(&self, other: &Valuation) -> Ordering {
        for (a, b) in self.values.iter().zip(other.values.iter()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.values.len().cmp(&other.values.len())
    }

    /// Approximate an integer floor view of this valuation, used when the
    /// caller needs DBM-style integer difference checks against a zone whose
    /// bounds are all integers (the contradiction builder never produces
    /// valuations with finer than half-integer deltas on integer guards, so
    /// this is exact for the scenarios this crate targets; general rational
    /// guards should compare via [`ClockValue`] directly instead).
    pub fn values(&self) -> &[ClockValue] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_delay_leaves_reference_untouched() {
        let v = Valuation::zero(3);
        let d = v.add_delay(ClockValue::new(3, 2));
        assert_eq!(d.get(0), ClockValue::from_integer(0));
        assert_eq!(d.get(1), ClockValue::new(3, 2));
        assert_eq!(d.get(2), ClockValue::new(3, 2));
    }

    #[test]
    fn lexical_cmp_orders_componentwise() {
        let a = Valuation::from_values(vec![
            ClockValue::from_integer(0),
            ClockValue::from_integer(1),
        ]);
        let b = Valuation::from_values(vec![
            ClockValue::from_integer(0),
            ClockValue::from_integer(2),
        ]);
        assert_eq!(a.lexical_cmp(&b), Ordering::Less);
    }

    #[test]
    fn reset_ignores_reference_clock() {
        let mut v = Valuation::from_values(vec![
            ClockValue::from_integer(0),
            ClockValue::from_integer(5),
        ]);
        v.reset(0);
        assert_eq!(v.get(0), ClockValue::from_integer(0));
        v.reset(1);
        assert_eq!(v.get(1), ClockValue::from_integer(0));
    }
}
