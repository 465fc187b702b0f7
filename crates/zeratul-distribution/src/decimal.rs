//! Fixed-point decimal with 18 fractional digits
//!
//! ## Design:
//!
//! - Backed by an arbitrary precision `BigInt` holding `value · 10^18`
//! - Addition and subtraction are exact
//! - `mul` / `quo` round half-to-even at the 18th digit
//! - `*_truncate` variants truncate toward zero and are what every reward
//!   computation uses, so a withdrawer can never be credited more than was
//!   allocated
//!
//! ## Example:
//!
//! ```text
//! 10 / 3            = 3.333333333333333333   (quo_truncate)
//! 0.5 · 0.000...001 = 0.000000000000000000   (mul, half rounds to even)
//! 1.5 · 0.000...001 = 0.000000000000000002   (mul, half rounds to even)
//! ```

use crate::error::{DistributionError, Result};
use num_bigint::{BigInt, Sign};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use std::sync::OnceLock;

/// Number of fractional digits
pub const PRECISION: u32 = 18;

fn precision_multiplier() -> &'static BigInt {
    static MULTIPLIER: OnceLock<BigInt> = OnceLock::new();
    MULTIPLIER.get_or_init(|| BigInt::from(10u64.pow(PRECISION)))
}

fn half_precision() -> &'static BigInt {
    static HALF: OnceLock<BigInt> = OnceLock::new();
    HALF.get_or_init(|| precision_multiplier() / 2)
}

/// Signed decimal, `value · 10^18` stored as an integer
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(BigInt);

impl Dec {
    pub fn zero() -> Self {
        Self(BigInt::from(0))
    }

    pub fn one() -> Self {
        Self(precision_multiplier().clone())
    }

    /// 10^-18, the smallest representable positive value
    pub fn smallest() -> Self {
        Self(BigInt::from(1))
    }

    /// Whole number
    pub fn new(i: i64) -> Self {
        Self(BigInt::from(i) * precision_multiplier())
    }

    /// Whole number from an integer coin amount
    pub fn from_u128(i: u128) -> Self {
        Self(BigInt::from(i) * precision_multiplier())
    }

    /// `i · 10^-prec`, e.g. `with_prec(5, 1) == 0.5`
    pub fn with_prec(i: i64, prec: u32) -> Self {
        assert!(prec <= PRECISION, "decimal precision {} exceeds {}", prec, PRECISION);
        Self(BigInt::from(i) * BigInt::from(10u64.pow(PRECISION - prec)))
    }

    /// Raw scaled integer
    pub fn raw(&self) -> &BigInt {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.sign() == Sign::NoSign
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    pub fn is_positive(&self) -> bool {
        self.0.sign() == Sign::Plus
    }

    pub fn abs(&self) -> Self {
        if self.is_negative() {
            -self
        } else {
            self.clone()
        }
    }

    /// Multiply, rounding half-to-even at the last digit
    pub fn mul(&self, other: &Dec) -> Dec {
        Dec(chop_precision_and_round(&self.0 * &other.0))
    }

    /// Multiply, truncating toward zero
    pub fn mul_truncate(&self, other: &Dec) -> Dec {
        Dec((&self.0 * &other.0) / precision_multiplier())
    }

    /// Exact multiplication by an integer
    pub fn mul_int(&self, i: u128) -> Dec {
        Dec(&self.0 * BigInt::from(i))
    }

    /// Divide, rounding half-to-even at the last digit
    pub fn quo(&self, other: &Dec) -> Dec {
        assert!(!other.is_zero(), "decimal division by zero");
        let scaled = &self.0 * precision_multiplier() * precision_multiplier();
        Dec(chop_precision_and_round(scaled / &other.0))
    }

    /// Divide, truncating toward zero
    pub fn quo_truncate(&self, other: &Dec) -> Dec {
        assert!(!other.is_zero(), "decimal division by zero");
        Dec((&self.0 * precision_multiplier()) / &other.0)
    }

    /// Divide by an integer, truncating toward zero
    pub fn quo_int_truncate(&self, i: u128) -> Dec {
        assert!(i != 0, "decimal division by zero");
        Dec(&self.0 / BigInt::from(i))
    }

    /// Divide by an integer, rounding away from zero for positive values
    pub fn quo_int_round_up(&self, i: u128) -> Dec {
        assert!(i != 0, "decimal division by zero");
        let divisor = BigInt::from(i);
        let quo = &self.0 / &divisor;
        if self.is_negative() || (&self.0 % &divisor).sign() == Sign::NoSign {
            Dec(quo)
        } else {
            Dec(quo + 1)
        }
    }

    /// Integer part, truncated toward zero
    pub fn truncate_int(&self) -> BigInt {
        &self.0 / precision_multiplier()
    }

    /// Integer part as a decimal
    pub fn truncate_dec(&self) -> Dec {
        Dec(self.truncate_int() * precision_multiplier())
    }

    /// Integer part as an unsigned coin amount, `None` when negative or too large
    pub fn truncate_u128(&self) -> Option<u128> {
        u128::try_from(&self.truncate_int()).ok()
    }
}

/// Drop the 18 extra digits left over by a product of two scaled values,
/// rounding the discarded part half-to-even.
fn chop_precision_and_round(d: BigInt) -> BigInt {
    if d.sign() == Sign::Minus {
        return -chop_precision_and_round(-d);
    }

    let quo = &d / precision_multiplier();
    let rem = &d % precision_multiplier();

    if rem.sign() == Sign::NoSign {
        return quo;
    }

    match rem.cmp(half_precision()) {
        std::cmp::Ordering::Less => quo,
        std::cmp::Ordering::Greater => quo + 1,
        std::cmp::Ordering::Equal => {
            if (&quo % BigInt::from(2)).sign() == Sign::NoSign {
                quo
            } else {
                quo + 1
            }
        }
    }
}

impl Add for Dec {
    type Output = Dec;
    fn add(self, rhs: Dec) -> Dec {
        Dec(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Dec> for &'a Dec {
    type Output = Dec;
    fn add(self, rhs: &'a Dec) -> Dec {
        Dec(&self.0 + &rhs.0)
    }
}

impl Sub for Dec {
    type Output = Dec;
    fn sub(self, rhs: Dec) -> Dec {
        Dec(self.0 - rhs.0)
    }
}

impl<'a> Sub<&'a Dec> for &'a Dec {
    type Output = Dec;
    fn sub(self, rhs: &'a Dec) -> Dec {
        Dec(&self.0 - &rhs.0)
    }
}

impl AddAssign<&Dec> for Dec {
    fn add_assign(&mut self, rhs: &Dec) {
        self.0 += &rhs.0;
    }
}

impl SubAssign<&Dec> for Dec {
    fn sub_assign(&mut self, rhs: &Dec) {
        self.0 -= &rhs.0;
    }
}

impl Neg for Dec {
    type Output = Dec;
    fn neg(self) -> Dec {
        Dec(-self.0)
    }
}

impl Neg for &Dec {
    type Output = Dec;
    fn neg(self) -> Dec {
        Dec(-&self.0)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.magnitude().to_string();
        let width = PRECISION as usize + 1;
        let padded = format!("{:0>width$}", digits, width = width);
        let (int_part, frac_part) = padded.split_at(padded.len() - PRECISION as usize);
        let sign = if self.is_negative() { "-" } else { "" };
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dec({})", self)
    }
}

impl FromStr for Dec {
    type Err = DistributionError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DistributionError::Codec(format!("invalid decimal string {:?}", s));

        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };

        if int_part.is_empty() || frac_part.len() > PRECISION as usize {
            return Err(invalid());
        }
        if body.contains('.') && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let combined = format!(
            "{}{}{}",
            int_part,
            frac_part,
            "0".repeat(PRECISION as usize - frac_part.len())
        );
        let value = BigInt::from_str(&combined).map_err(|_| invalid())?;

        Ok(Dec(if negative { -value } else { value }))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Dec::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(Dec::new(5).to_string(), "5.000000000000000000");
        assert_eq!(Dec::with_prec(5, 1).to_string(), "0.500000000000000000");
        assert_eq!(Dec::with_prec(-25, 3).to_string(), "-0.025000000000000000");
        assert_eq!(Dec::smallest().to_string(), "0.000000000000000001");

        assert_eq!(d("12.5"), Dec::with_prec(125, 1));
        assert_eq!(d("-0.2"), Dec::with_prec(-2, 1));
        assert_eq!(d("7"), Dec::new(7));

        assert!("1.".parse::<Dec>().is_err());
        assert!(".5".parse::<Dec>().is_err());
        assert!("1.0000000000000000001".parse::<Dec>().is_err());
        assert!("abc".parse::<Dec>().is_err());
    }

    #[test]
    fn test_truncating_division() {
        let third = Dec::new(10).quo_truncate(&Dec::new(3));
        assert_eq!(third, d("3.333333333333333333"));

        let two_thirds = Dec::new(2).quo(&Dec::new(3));
        assert_eq!(two_thirds, d("0.666666666666666667"));

        let two_thirds_trunc = Dec::new(2).quo_truncate(&Dec::new(3));
        assert_eq!(two_thirds_trunc, d("0.666666666666666666"));
    }

    #[test]
    fn test_round_up_division() {
        assert_eq!(Dec::new(2).quo_int_round_up(3), d("0.666666666666666667"));
        assert_eq!(Dec::new(20).quo_int_round_up(201), d("0.099502487562189055"));
        assert_eq!(Dec::new(9).quo_int_round_up(3), Dec::new(3));
        assert_eq!(Dec::new(-2).quo_int_round_up(3), d("-0.666666666666666666"));
    }

    #[test]
    fn test_bankers_rounding() {
        // 0.5e-18 rounds to even (0), 1.5e-18 rounds to even (2)
        let half = Dec::with_prec(5, 1);
        assert_eq!(half.mul(&Dec::smallest()), Dec::zero());
        assert_eq!(Dec::with_prec(15, 1).mul(&Dec::smallest()), d("0.000000000000000002"));

        // truncation drops it either way
        assert_eq!(Dec::with_prec(15, 1).mul_truncate(&Dec::smallest()), Dec::smallest());
        assert_eq!((-Dec::with_prec(15, 1)).mul(&Dec::smallest()), d("-0.000000000000000002"));
    }

    #[test]
    fn test_truncate_int() {
        assert_eq!(d("5.999").truncate_u128(), Some(5));
        assert_eq!(d("0.2").truncate_u128(), Some(0));
        assert_eq!(d("-1.5").truncate_u128(), None);
        assert_eq!(d("-1.5").truncate_dec(), Dec::new(-1));
    }

    #[test]
    fn test_serde_as_string() {
        let value = d("49.5");
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"49.500000000000000000\"");
        let back: Dec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    fn arb_dec() -> impl Strategy<Value = Dec> {
        (-1_000_000_000i64..1_000_000_000i64, 0u32..=18).prop_map(|(i, p)| Dec::with_prec(i, p))
    }

    proptest! {
        #[test]
        fn prop_truncate_never_exceeds_rounded(a in arb_dec(), b in arb_dec()) {
            let truncated = a.mul_truncate(&b);
            let rounded = a.mul(&b);
            prop_assert!((&rounded - &truncated).abs() <= Dec::smallest());
        }

        #[test]
        fn prop_quo_truncate_times_divisor_bounded(a in 0i64..1_000_000_000, b in 1i64..1_000_000) {
            let a = Dec::new(a);
            let b = Dec::new(b);
            let q = a.quo_truncate(&b);
            // q · b never overshoots a
            prop_assert!(q.mul_truncate(&b) <= a);
        }

        #[test]
        fn prop_add_sub_roundtrip(a in arb_dec(), b in arb_dec()) {
            prop_assert_eq!(&(&a + &b) - &b, a);
        }

        #[test]
        fn prop_display_parse(a in arb_dec()) {
            prop_assert_eq!(a.to_string().parse::<Dec>().unwrap(), a);
        }
    }
}
