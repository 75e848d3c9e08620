use crate::error::MathError;

/// Applies a signed liquidity delta to an unsigned liquidity amount.
///
/// Removing more liquidity than the position holds fails with
/// `InsufficientLiquidity`; adding past `u128::MAX` fails with `Overflow`.
pub fn add_delta(x: u128, y: i128) -> Result<u128, MathError> {
    if y < 0 {
        let (z, underflow) = x.overflowing_sub(y.unsigned_abs());
        if underflow {
            return Err(MathError::InsufficientLiquidity);
        }
        Ok(z)
    } else {
        let (z, overflow) = x.overflowing_add(y as u128);
        if overflow {
            return Err(MathError::Overflow);
        }
        Ok(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn add_delta_adds_positive_delta() {
        assert_eq!(add_delta(100, 20).unwrap(), 120);
    }

    #[test]
    fn add_delta_subtracts_negative_delta() {
        assert_eq!(add_delta(100, -20).unwrap(), 80);
    }

    #[test]
    fn add_delta_zero_delta_returns_same() {
        assert_eq!(add_delta(123456789, 0).unwrap(), 123456789);
    }

    #[test]
    fn add_delta_positive_overflow() {
        let res = add_delta(u128::MAX, 1);
        assert!(matches!(res, Err(MathError::Overflow)));
    }

    #[test]
    fn add_delta_handles_i128_min() {
        let res = add_delta(u128::MAX, i128::MIN).unwrap();
        assert_eq!(res, u128::MAX - (1u128 << 127));
    }

    #[test]
    fn add_delta_insufficient_liquidity() {
        let res = add_delta(100, -200);
        assert!(matches!(res, Err(MathError::InsufficientLiquidity)));
    }

    proptest! {
        #[test]
        fn add_delta_round_trips(x: u128, y: i128) {
            if let Ok(z) = add_delta(x, y) {
                // applying the opposite delta restores the original amount
                if let Some(neg) = y.checked_neg() {
                    prop_assert_eq!(add_delta(z, neg).unwrap(), x);
                }
            }
        }
    }
}
