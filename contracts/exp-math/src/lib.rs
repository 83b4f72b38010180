//! Scaled-integer fixed-point arithmetic shared by every market contract.
//!
//! All ratios and rates in the protocol are `Exp` values: a `u128` mantissa
//! representing a real number scaled by 1e18. Every operation truncates
//! toward zero after rescaling and fails on overflow instead of wrapping;
//! the downstream accounting invariants depend on both properties.

#![no_std]

/// One whole unit in mantissa terms.
pub const EXP_SCALE: u128 = 1_000_000_000_000_000_000;

/// A fixed-point number with 18 decimals of precision.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct Exp {
    pub mantissa: u128,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MathError {
    DivisionByZero,
    Overflow,
    Underflow,
}

pub type MathResult<T> = Result<T, MathError>;

impl Exp {
    pub const fn new(mantissa: u128) -> Self {
        Exp { mantissa }
    }

    pub const fn zero() -> Self {
        Exp { mantissa: 0 }
    }

    /// The mantissa representation of 1.0.
    pub const fn one() -> Self {
        Exp { mantissa: EXP_SCALE }
    }

    pub const fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    /// Builds `num / den` as an `Exp`, truncating toward zero.
    pub fn from_fraction(num: u128, den: u128) -> MathResult<Exp> {
        if den == 0 {
            return Err(MathError::DivisionByZero);
        }
        let scaled = num.checked_mul(EXP_SCALE).ok_or(MathError::Overflow)?;
        Ok(Exp::new(scaled / den))
    }

    pub fn add(self, other: Exp) -> MathResult<Exp> {
        self.mantissa
            .checked_add(other.mantissa)
            .map(Exp::new)
            .ok_or(MathError::Overflow)
    }

    pub fn sub(self, other: Exp) -> MathResult<Exp> {
        self.mantissa
            .checked_sub(other.mantissa)
            .map(Exp::new)
            .ok_or(MathError::Underflow)
    }

    /// `self * other`, rescaled back to 1e18 with truncation.
    pub fn mul(self, other: Exp) -> MathResult<Exp> {
        let product = self
            .mantissa
            .checked_mul(other.mantissa)
            .ok_or(MathError::Overflow)?;
        Ok(Exp::new(product / EXP_SCALE))
    }

    /// `self * b * c`, truncating once per pairwise product.
    pub fn mul3(self, b: Exp, c: Exp) -> MathResult<Exp> {
        self.mul(b)?.mul(c)
    }

    /// `self / other` as an `Exp`, truncating toward zero.
    pub fn div(self, other: Exp) -> MathResult<Exp> {
        if other.mantissa == 0 {
            return Err(MathError::DivisionByZero);
        }
        let scaled = self
            .mantissa
            .checked_mul(EXP_SCALE)
            .ok_or(MathError::Overflow)?;
        Ok(Exp::new(scaled / other.mantissa))
    }

    /// Scales by a plain integer, keeping the result in mantissa terms.
    pub fn mul_scalar(self, scalar: u128) -> MathResult<Exp> {
        self.mantissa
            .checked_mul(scalar)
            .map(Exp::new)
            .ok_or(MathError::Overflow)
    }

    /// `truncate(self * scalar)`: the single place a rate gets applied to a
    /// principal amount. Truncation happens exactly once, here.
    pub fn mul_scalar_truncate(self, scalar: u128) -> MathResult<u128> {
        let product = self
            .mantissa
            .checked_mul(scalar)
            .ok_or(MathError::Overflow)?;
        Ok(product / EXP_SCALE)
    }

    /// `truncate(self * scalar) + addend`.
    pub fn mul_scalar_truncate_add(self, scalar: u128, addend: u128) -> MathResult<u128> {
        let truncated = self.mul_scalar_truncate(scalar)?;
        truncated.checked_add(addend).ok_or(MathError::Overflow)
    }

    pub fn div_scalar(self, scalar: u128) -> MathResult<Exp> {
        if scalar == 0 {
            return Err(MathError::DivisionByZero);
        }
        Ok(Exp::new(self.mantissa / scalar))
    }

    /// Integer part of the value, discarding the fractional remainder.
    pub fn truncate(self) -> u128 {
        self.mantissa / EXP_SCALE
    }
}

/// `truncate(scalar / divisor)`: converts an integer amount through a rate,
/// e.g. underlying into claim tokens at the exchange rate. Only the
/// truncated form is provided; the untruncated intermediate would need
/// 1e36 headroom that a u128 cannot give for realistic amounts.
pub fn div_scalar_by_exp_truncate(scalar: u128, divisor: Exp) -> MathResult<u128> {
    if divisor.mantissa == 0 {
        return Err(MathError::DivisionByZero);
    }
    let scaled = scalar.checked_mul(EXP_SCALE).ok_or(MathError::Overflow)?;
    Ok(scaled / divisor.mantissa)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_fraction_scales() {
        let res = Exp::from_fraction(2_000_000_000_000_000_000, 1_000_000_000_000_000_000);
        assert_eq!(res, Ok(Exp::new(2 * EXP_SCALE)));
    }

    #[test]
    fn from_fraction_rejects_zero_denominator() {
        assert_eq!(
            Exp::from_fraction(1, 0),
            Err(MathError::DivisionByZero)
        );
    }

    #[test]
    fn add_and_sub() {
        let two = Exp::new(2 * EXP_SCALE);
        let one = Exp::new(EXP_SCALE);
        assert_eq!(two.add(one), Ok(Exp::new(3 * EXP_SCALE)));
        assert_eq!(
            Exp::new(3 * EXP_SCALE).sub(Exp::new(1_500_000_000_000_000_000)),
            Ok(Exp::new(1_500_000_000_000_000_000))
        );
        assert_eq!(one.sub(two), Err(MathError::Underflow));
    }

    #[test]
    fn mul_truncates_toward_zero() {
        // 10 wei-scale mantissa times a rate barely above 1.0 truncates back
        // down to 10: the product never rounds up.
        let res = Exp::new(10).mul(Exp::new(1_000_007_762_969_811_699));
        assert_eq!(res, Ok(Exp::new(10)));
    }

    #[test]
    fn mul_overflow_fails() {
        let big = Exp::new(u128::MAX / 2);
        assert_eq!(big.mul(big), Err(MathError::Overflow));
    }

    #[test]
    fn mul_scalar_truncate_exact() {
        // 3.0 * 1.23 == 3.69 exactly, no rounding up.
        let res = Exp::new(3 * EXP_SCALE).mul_scalar_truncate(1_230_000_000_000_000_000);
        assert_eq!(res, Ok(3_690_000_000_000_000_000));
    }

    #[test]
    fn mul_scalar_truncate_add() {
        let res = Exp::new(EXP_SCALE / 2).mul_scalar_truncate_add(1_000, 7);
        assert_eq!(res, Ok(507));
    }

    #[test]
    fn mul3_truncates_once_per_product() {
        let cf = Exp::new(800_000_000_000_000_000); // 0.8
        let rate = Exp::new(1_050_000_000_000_000_000); // 1.05
        let price = Exp::new(2 * EXP_SCALE); // 2.0
        let res = cf.mul3(rate, price);
        assert_eq!(res, Ok(Exp::new(1_680_000_000_000_000_000)));
    }

    #[test]
    fn div_and_div_scalar() {
        let res = Exp::new(3 * EXP_SCALE).div(Exp::new(2 * EXP_SCALE));
        assert_eq!(res, Ok(Exp::new(1_500_000_000_000_000_000)));
        assert_eq!(
            Exp::new(3 * EXP_SCALE).div(Exp::zero()),
            Err(MathError::DivisionByZero)
        );
        assert_eq!(
            Exp::new(3 * EXP_SCALE).div_scalar(2),
            Ok(Exp::new(1_500_000_000_000_000_000))
        );
    }

    #[test]
    fn div_scalar_by_exp_converts_amounts() {
        // 2.0 underlying at an exchange rate of 2.0 is one claim token.
        let res = div_scalar_by_exp_truncate(2_000_000_000_000_000_000, Exp::new(2 * EXP_SCALE));
        assert_eq!(res, Ok(EXP_SCALE));
        // 111111 at rate 1.0 mints 111111.
        let res = div_scalar_by_exp_truncate(111_111, Exp::one());
        assert_eq!(res, Ok(111_111));
    }

    #[test]
    fn truncate_discards_fraction() {
        assert_eq!(Exp::new(1_230_000_000_000_000_000).truncate(), 1);
        assert_eq!(Exp::new(EXP_SCALE - 1).truncate(), 0);
    }
}
