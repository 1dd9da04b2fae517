//! Decimal-lattice helpers for numeric parameter validation (§4.1:
//! "increments must divide the span evenly", "lie on the `increment`
//! lattice starting at `min`"). Uses `rust_decimal` rather than `f64` so
//! lattice membership checks are exact, the way the teacher's data layer
//! favors exact/bounded types (`rust_decimal` is also used by
//! `azure-kusto-data` in the retrieval pack for exactly this reason:
//! numeric query parameters must not suffer float drift).

use rust_decimal::Decimal;

/// Whether `increment` divides the span `[min, max]` evenly, i.e.
/// `(max - min) % increment == 0`.
pub fn increment_divides_span_evenly(min: Decimal, max: Decimal, increment: Decimal) -> bool {
    if increment.is_zero() {
        return false;
    }
    ((max - min) % increment).is_zero()
}

/// Whether `value` lies on the lattice `min, min + increment, min + 2*increment, ...`
pub fn on_increment_lattice(min: Decimal, increment: Decimal, value: Decimal) -> bool {
    if increment.is_zero() {
        return value == min;
    }
    ((value - min) % increment).is_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn even_division() {
        assert!(increment_divides_span_evenly(dec!(0), dec!(10), dec!(2)));
        assert!(!increment_divides_span_evenly(dec!(0), dec!(10), dec!(3)));
    }

    #[test]
    fn lattice_membership() {
        assert!(on_increment_lattice(dec!(0), dec!(2.5), dec!(5)));
        assert!(!on_increment_lattice(dec!(0), dec!(2.5), dec!(4)));
    }
}
