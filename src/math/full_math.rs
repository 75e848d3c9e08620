use crate::error::MathError;
use alloy_primitives::{I256, U256, U512};

const U512_1: U512 = U512::from_limbs([1, 0, 0, 0, 0, 0, 0, 0]);
const U512_2: U512 = U512::from_limbs([2, 0, 0, 0, 0, 0, 0, 0]);

#[cfg(not(feature = "relaxed-width-check"))]
const I256_MAX_MAGNITUDE: U512 =
    U512::from_limbs([u64::MAX, u64::MAX, u64::MAX, u64::MAX >> 1, 0, 0, 0, 0]);
#[cfg(not(feature = "relaxed-width-check"))]
const I256_MIN_MAGNITUDE: U512 = U512::from_limbs([0, 0, 0, 1 << 63, 0, 0, 0, 0]);

/// Newton's method converges in well under 256 iterations for any 512-bit
/// input; the cap only guards against a cycle that never settles.
const SQRT_ITERATION_CAP: usize = 255;

#[inline]
fn low_256(value: U512) -> U256 {
    let limbs = value.as_limbs();
    U256::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3]])
}

/// Reassembles a sign/magnitude pair into an `I256`.
///
/// By default a magnitude outside the 256-bit signed range is an overflow.
/// The `relaxed-width-check` feature instead reinterprets the low 256 bits,
/// reproducing an unchecked `int256` cast.
fn narrow(negative: bool, magnitude: U512) -> Result<I256, MathError> {
    #[cfg(not(feature = "relaxed-width-check"))]
    {
        let bound = if negative {
            I256_MIN_MAGNITUDE
        } else {
            I256_MAX_MAGNITUDE
        };
        if magnitude > bound {
            return Err(MathError::Overflow);
        }
    }
    let raw = I256::from_raw(low_256(magnitude));
    Ok(if negative { raw.wrapping_neg() } else { raw })
}

/// A signed value held as sign + 512-bit magnitude. Intermediate products of
/// two 256-bit signed values always fit.
#[derive(Debug, Clone, Copy)]
struct Signed512 {
    negative: bool,
    magnitude: U512,
}

impl Signed512 {
    fn from_i256(value: I256) -> Self {
        Signed512 {
            negative: value.is_negative(),
            magnitude: U512::from(value.unsigned_abs()),
        }
    }

    fn product(a: I256, b: I256) -> Self {
        // |a|, |b| <= 2^255, so the product fits 512 bits exactly.
        let magnitude = U512::from(a.unsigned_abs()) * U512::from(b.unsigned_abs());
        Signed512 {
            negative: a.is_negative() != b.is_negative() && !magnitude.is_zero(),
            magnitude,
        }
    }

    fn neg(self) -> Self {
        Signed512 {
            negative: !self.negative && !self.magnitude.is_zero(),
            magnitude: self.magnitude,
        }
    }

    fn add(self, other: Self) -> Result<Self, MathError> {
        if self.negative == other.negative {
            let magnitude = self
                .magnitude
                .checked_add(other.magnitude)
                .ok_or(MathError::Overflow)?;
            return Ok(Signed512 {
                negative: self.negative && !magnitude.is_zero(),
                magnitude,
            });
        }
        if self.magnitude >= other.magnitude {
            let magnitude = self.magnitude - other.magnitude;
            Ok(Signed512 {
                negative: self.negative && !magnitude.is_zero(),
                magnitude,
            })
        } else {
            Ok(Signed512 {
                negative: other.negative,
                magnitude: other.magnitude - self.magnitude,
            })
        }
    }

    /// Truncating division, matching big-integer `/` semantics.
    fn div_trunc(self, denominator: Self) -> Result<Self, MathError> {
        if denominator.magnitude.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        let magnitude = self.magnitude / denominator.magnitude;
        Ok(Signed512 {
            negative: (self.negative != denominator.negative) && !magnitude.is_zero(),
            magnitude,
        })
    }

    fn into_i256(self) -> Result<I256, MathError> {
        narrow(self.negative, self.magnitude)
    }
}

/// Computes `a * b / denominator` at full precision, truncating toward zero.
///
/// Signed counterpart of the usual `FullMath.mulDiv`: the swap-step algebra
/// routes negative exact-output amounts through it, so the quotient follows
/// big-integer division rather than flooring.
pub fn mul_div(a: I256, b: I256, denominator: I256) -> Result<I256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    Signed512::product(a, b)
        .div_trunc(Signed512::from_i256(denominator))?
        .into_i256()
}

/// Computes `(a * b + denominator - 1) / denominator`, truncating toward
/// zero. For the non-negative operands used by the swap step this is exact
/// ceiling division and never returns less than [`mul_div`].
pub fn mul_div_rounding_up(a: I256, b: I256, denominator: I256) -> Result<I256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let d = Signed512::from_i256(denominator);
    Signed512::product(a, b)
        .add(d)?
        .add(Signed512 {
            negative: true,
            magnitude: U512_1,
        })?
        .div_trunc(d)?
        .into_i256()
}

/// Integer square root via Newton's method, converging when two successive
/// iterates differ by at most one and returning the earlier iterate.
pub(crate) fn sqrt_u512(value: U512) -> U512 {
    if value < U512_2 {
        return value;
    }
    let mut x0 = U512_1;
    for _ in 0..SQRT_ITERATION_CAP {
        let x1 = (value / x0 + x0) >> 1;
        if x0 == x1 || x0 == x1 - U512_1 {
            break;
        }
        x0 = x1;
    }
    x0
}

/// Integer square root of a non-negative value; errors on negative input.
pub fn sqrt(value: I256) -> Result<I256, MathError> {
    if value.is_negative() {
        return Err(MathError::NegativeSqrt);
    }
    let magnitude = U512::from(value.unsigned_abs());
    if magnitude < U512_2 {
        return Ok(value);
    }
    narrow(false, sqrt_u512(magnitude))
}

/// Returns the smaller root of `a*x^2 - 2*b*x + c = 0` as
/// `(b - sqrt(b^2 - a*c)) / a`, with the discriminant evaluated at 512-bit
/// width. A negative discriminant clamps to zero instead of failing.
pub fn get_smaller_root_of_quad_eqn(a: I256, b: I256, c: I256) -> Result<I256, MathError> {
    if a.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let discriminant = Signed512::product(b, b).add(Signed512::product(a, c).neg())?;
    if discriminant.negative {
        return Ok(I256::ZERO);
    }
    let root = Signed512 {
        negative: true,
        magnitude: sqrt_u512(discriminant.magnitude),
    };
    Signed512::from_i256(b)
        .add(root)?
        .div_trunc(Signed512::from_i256(a))?
        .into_i256()
}

/// `x * y / denominator` over 512-bit magnitudes for the one spot where a
/// three-factor product precedes the division.
pub(crate) fn mul_div_u512(x: U512, y: U512, denominator: U512) -> Result<U512, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = x.checked_mul(y).ok_or(MathError::Overflow)?;
    Ok(product / denominator)
}

pub(crate) fn narrow_u512(value: U512) -> Result<I256, MathError> {
    narrow(false, value)
}
