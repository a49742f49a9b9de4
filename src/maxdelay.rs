//! Maximum-delay search (§4.8)
//!
//! Given a zone `Z`, a base valuation `v` and an integer delay range
//! `[min_delay, max_delay]`, find the largest delay in that range such that
//! `v + delay` still belongs to `Z`. Direct port of
//! `operational-semantics/max_delay.cc`'s recursive binary search, including
//! the half-integer midpoint check at the unit-interval base case.

#![forbid(unsafe_code)]

use crate::clock::{ClockValue, Valuation};
use crate::zone::{valuation_belongs, Zone};

/// `max_delay(zone, valuation, max_delay_value, min_delay_value, resolution)`.
///
/// Preconditions: `min_delay_value <= max_delay_value`, and `resolution`
/// matches the scale `zone`'s own finite bounds were built at (see
/// [`crate::zone::valuation_belongs`]). The half-integer candidate checked at
/// the base case is compared exactly, in rational arithmetic, regardless of
/// `resolution`.
pub fn max_delay(
    zone: &Zone,
    valuation: &Valuation,
    max_delay_value: u64,
    min_delay_value: u64,
    resolution: i64,
) -> ClockValue {
    debug_assert!(max_delay_value >= min_delay_value);

    let at_max = valuation.add_delay(ClockValue::from_integer(max_delay_value as i64));
    if valuation_belongs(zone, &at_max, resolution) {
        return ClockValue::from_integer(max_delay_value as i64);
    }

    let at_min = valuation.add_delay(ClockValue::from_integer(min_delay_value as i64));
    if !valuation_belongs(zone, &at_min, resolution) {
        return ClockValue::from_integer(0);
    }

    if min_delay_value + 1 == max_delay_value {
        let half = ClockValue::new(2 * min_delay_value as i64 + 1, 2);
        let at_half = valuation.add_delay(half);
        if valuation_belongs(zone, &at_half, resolution) {
            return half;
        }
        return ClockValue::from_integer(min_delay_value as i64);
    }

    let center = (max_delay_value + min_delay_value) / 2;
    let upper = max_delay(zone, valuation, max_delay_value, center, resolution);
    let lower = max_delay(zone, valuation, center, min_delay_value, resolution);
    upper.max(lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbm::{Bound, Dbm};

    fn zone_bounded_by(bound: i64) -> Zone {
        let mut d = Dbm::universal(2);
        d.constrain(1, 0, Bound::le(bound)).unwrap();
        Zone::new(d)
    }

    #[test]
    fn returns_max_when_fully_inside() {
        let z = zone_bounded_by(10);
        let v = Valuation::zero(2);
        assert_eq!(max_delay(&z, &v, 3, 0, 1), ClockValue::from_integer(3));
    }

    #[test]
    fn returns_zero_when_even_min_outside() {
        let z = zone_bounded_by(0);
        let v = Valuation::from_values(vec![ClockValue::from_integer(0), ClockValue::from_integer(0)]);
        assert_eq!(max_delay(&z, &v, 5, 1, 1), ClockValue::from_integer(0));
    }

    #[test]
    fn finds_half_integer_boundary() {
        let mut d = Dbm::universal(2);
        d.constrain(1, 0, Bound::lt(2)).unwrap();
        let z = Zone::new(d);
        let v = Valuation::zero(2);
        let delay = max_delay(&z, &v, 2, 0, 1);
        assert!(delay < ClockValue::from_integer(2));
        assert!(delay >= ClockValue::new(3, 2));
    }
}
