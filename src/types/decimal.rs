//! DECIMAL type descriptor and helpers over `bigdecimal`.
//!
//! Runtime decimals are arbitrary precision so that every DECIMAL(65, 30)
//! value and every intermediate product fits. The helpers here work on the
//! `(mantissa, exponent)` pair directly so rounding and formatting follow
//! MySQL rather than the library defaults.

use crate::types::error::{TypeError, TypeResult};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use std::fmt;
use std::str::FromStr;

/// Runtime decimal value.
pub type Decimal = BigDecimal;

/// Largest precision a DECIMAL column may declare.
pub const DECIMAL_MAX_PRECISION: u8 = 65;
/// Largest scale a DECIMAL column may declare.
pub const DECIMAL_MAX_SCALE: u8 = 30;

/// DECIMAL(precision, scale).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecimalType {
    precision: u8,
    scale: u8,
}

impl DecimalType {
    /// Create a decimal type, validating the MySQL limits.
    pub fn new(precision: u8, scale: u8) -> TypeResult<Self> {
        let precision = if precision == 0 { 10 } else { precision };
        if precision > DECIMAL_MAX_PRECISION {
            return Err(TypeError::out_of_range(precision, "decimal precision"));
        }
        if scale > DECIMAL_MAX_SCALE || scale > precision {
            return Err(TypeError::out_of_range(scale, "decimal scale"));
        }
        Ok(Self { precision, scale })
    }

    /// Create a decimal type, clamping to the MySQL limits instead of failing.
    pub fn clamped(precision: u32, scale: u32) -> Self {
        let scale = scale.min(DECIMAL_MAX_SCALE as u32) as u8;
        let precision = precision
            .max(scale as u32)
            .clamp(1, DECIMAL_MAX_PRECISION as u32) as u8;
        Self { precision, scale }
    }

    /// DECIMAL(65, 30).
    pub fn max() -> Self {
        Self {
            precision: DECIMAL_MAX_PRECISION,
            scale: DECIMAL_MAX_SCALE,
        }
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Round `d` down to this type's scale when it carries more digits and
    /// check the integral part fits. Values with fewer fractional digits keep
    /// their own scale.
    pub fn bound(&self, d: Decimal) -> TypeResult<Decimal> {
        let target_scale = self.scale as u32;
        let d = if decimal_scale(&d) > target_scale {
            round_to_scale(&d, target_scale)
        } else {
            d
        };
        if whole_digits(&d) > (self.precision - self.scale) as u32 {
            return Err(TypeError::out_of_range(format_decimal(&d), self));
        }
        Ok(d)
    }
}

impl fmt::Display for DecimalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decimal({},{})", self.precision, self.scale)
    }
}

fn ten_pow(n: i64) -> BigInt {
    BigInt::from(10u8).pow(n as u32)
}

fn digit_count(mantissa: &BigInt) -> u32 {
    if mantissa.is_zero() {
        1
    } else {
        mantissa.magnitude().to_string().len() as u32
    }
}

/// Number of fractional digits a value carries.
pub fn decimal_scale(d: &Decimal) -> u32 {
    let (_, exponent) = d.as_bigint_and_exponent();
    exponent.max(0) as u32
}

/// Precision and scale of a decimal value as MySQL would type a literal of it.
pub fn precision_and_scale(d: &Decimal) -> (u32, u32) {
    let (mantissa, exponent) = d.as_bigint_and_exponent();
    let digits = digit_count(&mantissa);
    if exponent < 0 {
        return (digits + exponent.unsigned_abs() as u32, 0);
    }
    let scale = exponent as u32;
    let whole = digits.saturating_sub(scale);
    ((whole + scale).max(1), scale)
}

/// Whole (integral) digit count of a decimal value.
pub fn whole_digits(d: &Decimal) -> u32 {
    let (p, s) = precision_and_scale(d);
    p - s
}

/// `true` when the integral part fits in DECIMAL's widest precision.
pub fn fits_decimal_range(d: &Decimal) -> bool {
    whole_digits(d) <= DECIMAL_MAX_PRECISION as u32
}

/// Parse a decimal literal, accepting scientific notation.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() || s.contains('_') {
        return None;
    }
    let d = Decimal::from_str(s).ok()?;
    let (_, exponent) = d.as_bigint_and_exponent();
    // 1e3 parses with a negative exponent; widen it to a plain integer
    // while the digits stay within DECIMAL range.
    if exponent < 0 && exponent >= -(DECIMAL_MAX_PRECISION as i64) {
        return Some(rescale(&d, 0, false));
    }
    Some(d)
}

fn rescale(d: &Decimal, scale: u32, half_up: bool) -> Decimal {
    let (mantissa, exponent) = d.as_bigint_and_exponent();
    let target = scale as i64;
    if exponent <= target {
        return Decimal::new(mantissa * ten_pow(target - exponent), target);
    }
    if exponent - target > digit_count(&mantissa) as i64 + 1 {
        return Decimal::new(BigInt::zero(), target);
    }
    let divisor = ten_pow(exponent - target);
    let mut quotient = &mantissa / &divisor;
    if half_up {
        let remainder = &mantissa % &divisor;
        if remainder.abs() * 2 >= divisor {
            if mantissa.is_negative() {
                quotient -= 1;
            } else {
                quotient += 1;
            }
        }
    }
    Decimal::new(quotient, target)
}

/// Round half away from zero to exactly `scale` fractional digits, padding
/// with zeros when the value has fewer.
pub fn round_to_scale(d: &Decimal, scale: u32) -> Decimal {
    rescale(d, scale, true)
}

/// Truncate toward zero to at most `scale` fractional digits.
pub fn truncate_to_scale(d: &Decimal, scale: u32) -> Decimal {
    if decimal_scale(d) <= scale {
        d.clone()
    } else {
        rescale(d, scale, false)
    }
}

/// `a / b` truncated toward zero at `scale` fractional digits. `None` when
/// `b` is zero.
pub fn div_to_scale(a: &Decimal, b: &Decimal, scale: u32) -> Option<Decimal> {
    if b.is_zero() {
        return None;
    }
    let (a_mantissa, a_exponent) = a.as_bigint_and_exponent();
    let (b_mantissa, b_exponent) = b.as_bigint_and_exponent();
    let shift = scale as i64 + b_exponent - a_exponent;
    let (numerator, denominator) = if shift >= 0 {
        (a_mantissa * ten_pow(shift), b_mantissa)
    } else {
        (a_mantissa, b_mantissa * ten_pow(-shift))
    };
    Some(Decimal::new(numerator / denominator, scale as i64))
}

/// Remainder of `a / b` carrying the dividend's sign. `None` when `b` is
/// zero.
pub fn decimal_rem(a: &Decimal, b: &Decimal) -> Option<Decimal> {
    if b.is_zero() {
        return None;
    }
    let (a_mantissa, a_exponent) = a.as_bigint_and_exponent();
    let (b_mantissa, b_exponent) = b.as_bigint_and_exponent();
    let exponent = a_exponent.max(b_exponent);
    let a_aligned = a_mantissa * ten_pow(exponent - a_exponent);
    let b_aligned = b_mantissa * ten_pow(exponent - b_exponent);
    Some(Decimal::new(a_aligned % b_aligned, exponent))
}

/// Decimal built from a float's shortest round-trip representation.
pub fn decimal_from_f64(f: f64) -> Option<Decimal> {
    if !f.is_finite() {
        return None;
    }
    parse_decimal(&f.to_string())
}

/// `true` when the value is integral, whatever its scale.
pub fn is_integral(d: &Decimal) -> bool {
    let (mantissa, exponent) = d.as_bigint_and_exponent();
    exponent <= 0 || (mantissa % ten_pow(exponent)).is_zero()
}

/// Plain positional rendering, keeping trailing zeros of the scale.
pub fn format_decimal(d: &Decimal) -> String {
    let (mantissa, exponent) = d.as_bigint_and_exponent();
    let sign = if mantissa.is_negative() { "-" } else { "" };
    let mut digits = mantissa.magnitude().to_string();
    if exponent <= 0 {
        digits.push_str(&"0".repeat(exponent.unsigned_abs() as usize));
        return format!("{}{}", sign, digits);
    }
    let scale = exponent as usize;
    if digits.len() <= scale {
        digits = format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits);
    }
    let (whole, fraction) = digits.split_at(digits.len() - scale);
    format!("{}{}.{}", sign, whole, fraction)
}

/// Rendering with trailing fractional zeros dropped, so equal values
/// render the same whatever their scale.
pub fn normalized_string(d: &Decimal) -> String {
    let s = format_decimal(d);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn fmt(d: Decimal) -> String {
        format_decimal(&d)
    }

    #[test]
    fn test_decimal_type_limits() {
        assert!(DecimalType::new(65, 30).is_ok());
        assert!(DecimalType::new(66, 0).is_err());
        assert!(DecimalType::new(10, 31).is_err());
        assert!(DecimalType::new(5, 6).is_err());
        assert_eq!(DecimalType::new(0, 0).unwrap().precision(), 10);

        let clamped = DecimalType::clamped(80, 40);
        assert_eq!(clamped, DecimalType::max());
    }

    #[test]
    fn test_precision_and_scale() {
        assert_eq!(precision_and_scale(&dec("123.45")), (5, 2));
        assert_eq!(precision_and_scale(&dec("0.05")), (2, 2));
        assert_eq!(precision_and_scale(&dec("-7")), (1, 0));
        assert_eq!(whole_digits(&dec("1000.1")), 4);
        assert_eq!(precision_and_scale(&parse_decimal("1e3").unwrap()), (4, 0));
    }

    #[test]
    fn test_bound_rounds_and_checks() {
        let t = DecimalType::new(5, 2).unwrap();
        assert_eq!(fmt(t.bound(dec("1.235")).unwrap()), "1.24");
        assert_eq!(fmt(t.bound(dec("1.2")).unwrap()), "1.2");
        assert!(t.bound(dec("1234.5")).is_err());

        let widest = DecimalType::max();
        let thirty = format!("0.{}", "3".repeat(31));
        assert_eq!(
            fmt(widest.bound(dec(&thirty)).unwrap()),
            format!("0.{}", "3".repeat(30))
        );
    }

    #[test]
    fn test_round_and_truncate() {
        assert_eq!(fmt(round_to_scale(&dec("1"), 4)), "1.0000");
        assert_eq!(fmt(round_to_scale(&dec("0.16666"), 4)), "0.1667");
        assert_eq!(fmt(round_to_scale(&dec("-0.5"), 0)), "-1");
        assert_eq!(fmt(round_to_scale(&dec("0.4"), 0)), "0");
        assert_eq!(fmt(round_to_scale(&dec("1e-400"), 2)), "0.00");
        assert_eq!(fmt(truncate_to_scale(&dec("0.16666"), 4)), "0.1666");
        assert_eq!(fmt(truncate_to_scale(&dec("-0.16666"), 2)), "-0.16");
        assert_eq!(fmt(truncate_to_scale(&dec("1.5"), 4)), "1.5");
    }

    #[test]
    fn test_division_and_remainder() {
        assert_eq!(fmt(div_to_scale(&dec("1"), &dec("3"), 9).unwrap()), "0.333333333");
        assert_eq!(fmt(div_to_scale(&dec("-2"), &dec("3"), 2).unwrap()), "-0.66");
        assert_eq!(fmt(div_to_scale(&dec("10.24"), &dec("0.6"), 0).unwrap()), "17");
        assert!(div_to_scale(&dec("1"), &dec("0.00"), 4).is_none());

        assert_eq!(fmt(decimal_rem(&dec("-7"), &dec("3")).unwrap()), "-1");
        assert_eq!(fmt(decimal_rem(&dec("5.5"), &dec("2")).unwrap()), "1.5");
        assert!(decimal_rem(&dec("5"), &dec("0")).is_none());
    }

    #[test]
    fn test_parse_and_format() {
        assert_eq!(fmt(parse_decimal(" 1.50 ").unwrap()), "1.50");
        assert_eq!(parse_decimal("1e3").unwrap(), dec("1000"));
        assert_eq!(fmt(parse_decimal("1e3").unwrap()), "1000");
        assert!(parse_decimal("abc").is_none());
        assert!(parse_decimal("1_000").is_none());
        assert_eq!(fmt(decimal_from_f64(0.1).unwrap()), "0.1");
        assert_eq!(fmt(dec("-0.05")), "-0.05");
        assert_eq!(normalized_string(&dec("3.000")), "3");
        assert_eq!(normalized_string(&dec("3.10")), "3.1");
        assert!(is_integral(&dec("4.000")));
        assert!(!is_integral(&dec("4.001")));
    }

    #[test]
    fn test_values_beyond_machine_width() {
        let wide = dec(&"9".repeat(65));
        assert!(fits_decimal_range(&wide));
        assert!(!fits_decimal_range(&(&wide + &dec("1"))));
        assert_eq!(fmt(&wide * &dec("1")), "9".repeat(65));
    }
}
