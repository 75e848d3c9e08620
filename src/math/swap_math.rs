//! Single swap step with reinvestment liquidity.
//!
//! A step moves the price from the current sqrt ratio toward a target,
//! accruing the fee as extra liquidity (`delta_l`) instead of paying it out.
//! The step is either price-limited (the target is reached and the caller
//! crosses a tick) or amount-limited (the remaining specified amount runs out
//! first and the final price has to be solved for, quadratically in the
//! exact-output case).

use crate::error::{Error, MathError, StateError};
use crate::math::full_math::{
    get_smaller_root_of_quad_eqn, mul_div, mul_div_rounding_up, mul_div_u512, narrow_u512,
};
use crate::Q96;
use alloy_primitives::{I256, U256, U512};

/// Signed renditions of [`crate::FEE_UNITS`] for the step algebra.
const FEE_UNITS: I256 = I256::from_raw(U256::from_limbs([crate::FEE_UNITS as u64, 0, 0, 0]));
const TWO_FEE_UNITS: I256 =
    I256::from_raw(U256::from_limbs([2 * crate::FEE_UNITS as u64, 0, 0, 0]));
const Q96_SIGNED: I256 = I256::from_raw(Q96);

/// Outcome of a single swap step.
///
/// `amount_used` is the portion of the specified amount consumed (negative
/// for exact-output), `amount_out` the resulting amount of the other token
/// (negative when it leaves the pool), and `delta_l` the reinvestment
/// liquidity minted from the fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapStep {
    pub sqrt_ratio_next_x96: U256,
    pub amount_used: I256,
    pub amount_out: I256,
    pub delta_l: I256,
}

/// Advances the price from `sqrt_ratio_current_x96` toward
/// `sqrt_ratio_target_x96`, consuming at most `amount_remaining` of the
/// specified token.
///
/// `liquidity` is the effective step liquidity (base plus reinvestment).
/// `amount_remaining` is positive for exact-input and negative for
/// exact-output swaps.
pub fn compute_swap_step(
    sqrt_ratio_current_x96: U256,
    sqrt_ratio_target_x96: U256,
    liquidity: U256,
    amount_remaining: I256,
    fee_units: u32,
    exact_in: bool,
    zero_for_one: bool,
) -> Result<SwapStep, Error> {
    if sqrt_ratio_current_x96.is_zero() || sqrt_ratio_target_x96.is_zero() {
        return Err(StateError::SqrtRatioIsZero.into());
    }
    if sqrt_ratio_current_x96 == sqrt_ratio_target_x96 {
        return Ok(SwapStep {
            sqrt_ratio_next_x96: sqrt_ratio_current_x96,
            amount_used: I256::ZERO,
            amount_out: I256::ZERO,
            delta_l: I256::ZERO,
        });
    }

    let current = I256::from_raw(sqrt_ratio_current_x96);
    let target = I256::from_raw(sqrt_ratio_target_x96);
    let liquidity = I256::from_raw(liquidity);
    let fee = I256::from_raw(U256::from(fee_units));

    // Whether the specified amount is denominated in token0: the input token
    // for exact-in swaps, the output token for exact-out swaps.
    let is_token0 = exact_in == zero_for_one;

    let mut amount_used = calc_reach_amount(current, target, liquidity, fee, exact_in, is_token0)?;

    let mut sqrt_ratio_next_x96 = U256::ZERO;
    if (exact_in && amount_used >= amount_remaining)
        || (!exact_in && amount_used <= amount_remaining)
    {
        amount_used = amount_remaining;
    } else {
        sqrt_ratio_next_x96 = sqrt_ratio_target_x96;
    }

    let abs_amount = amount_used.checked_abs().ok_or(MathError::Overflow)?;

    let delta_l;
    if sqrt_ratio_next_x96.is_zero() {
        // Amount-limited: the step ends inside the current tick range and
        // the final price has to be recomputed from the consumed amount.
        delta_l =
            estimate_incremental_liquidity(abs_amount, liquidity, current, fee, exact_in, is_token0)?;
        let next = calc_final_price(abs_amount, liquidity, delta_l, current, exact_in, is_token0)?;
        if !next.is_positive() {
            return Err(StateError::SqrtPriceOutOfBounds.into());
        }
        sqrt_ratio_next_x96 = next.into_raw();
    } else {
        delta_l =
            calc_incremental_liquidity(current, target, liquidity, abs_amount, exact_in, is_token0)?;
    }

    let amount_out = calc_returned_amount(
        current,
        I256::from_raw(sqrt_ratio_next_x96),
        liquidity,
        delta_l,
        exact_in,
        is_token0,
    )?;

    Ok(SwapStep {
        sqrt_ratio_next_x96,
        amount_used,
        amount_out,
        delta_l,
    })
}

/// Amount of the specified token needed to move the price all the way from
/// `current` to `target`, fee included. Negative for exact-output.
fn calc_reach_amount(
    current: I256,
    target: I256,
    liquidity: I256,
    fee: I256,
    exact_in: bool,
    is_token0: bool,
) -> Result<I256, MathError> {
    let abs_price_diff = (current - target).checked_abs().ok_or(MathError::Overflow)?;

    if exact_in {
        if is_token0 {
            // sqrtP goes down
            let denominator = TWO_FEE_UNITS * target - fee * current;
            let numerator = mul_div(liquidity, TWO_FEE_UNITS * abs_price_diff, denominator)?;
            mul_div(numerator, Q96_SIGNED, current)
        } else {
            // sqrtP goes up
            let denominator = TWO_FEE_UNITS * current - fee * target;
            let numerator = mul_div(liquidity, TWO_FEE_UNITS * abs_price_diff, denominator)?;
            mul_div(numerator, current, Q96_SIGNED)
        }
    } else if is_token0 {
        // token0 out, sqrtP goes up
        let denominator = TWO_FEE_UNITS * current - fee * target;
        let numerator = denominator - fee * current;
        let numerator = mul_div(liquidity << 96, numerator, denominator)?;
        Ok(-(mul_div(numerator, abs_price_diff, current)? / target))
    } else {
        // token1 out, sqrtP goes down
        let denominator = TWO_FEE_UNITS * target - fee * current;
        let numerator = denominator - fee * target;
        let numerator = mul_div(liquidity, numerator, denominator)?;
        Ok(-mul_div(numerator, abs_price_diff, Q96_SIGNED)?)
    }
}

/// Reinvestment liquidity minted when the step reaches the tick boundary and
/// the final price is already known.
fn calc_incremental_liquidity(
    current: I256,
    target: I256,
    liquidity: I256,
    abs_amount: I256,
    exact_in: bool,
    is_token0: bool,
) -> Result<I256, MathError> {
    let tmp3 = if is_token0 {
        let tmp1 = mul_div(liquidity, Q96_SIGNED, current)?;
        let tmp2 = if exact_in {
            tmp1 + abs_amount
        } else {
            tmp1 - abs_amount
        };
        mul_div(target, tmp2, Q96_SIGNED)?
    } else {
        let tmp1 = mul_div(liquidity, current, Q96_SIGNED)?;
        let tmp2 = if exact_in {
            tmp1 + abs_amount
        } else {
            tmp1 - abs_amount
        };
        mul_div(tmp2, Q96_SIGNED, target)?
    };
    // rounding can leave the requirement at zero
    Ok(if tmp3 > liquidity {
        tmp3 - liquidity
    } else {
        I256::ZERO
    })
}

/// Reinvestment liquidity for an amount-limited step, where the final price
/// is not yet known. Closed form for exact-input; for exact-output `delta_l`
/// is the smaller root of `fee*x^2 - 2*b*x + c = 0`.
fn estimate_incremental_liquidity(
    abs_amount: I256,
    liquidity: I256,
    current: I256,
    fee: I256,
    exact_in: bool,
    is_token0: bool,
) -> Result<I256, MathError> {
    if exact_in {
        if is_token0 {
            // deltaL = feeInFeeUnits * absDelta * currentSqrtP / 2
            return mul_div(current * fee, abs_amount, TWO_FEE_UNITS * Q96_SIGNED);
        }
        // deltaL = feeInFeeUnits * absDelta / (currentSqrtP * 2); rounded
        // down so the next sqrt price rounds up
        return mul_div(fee * Q96_SIGNED, abs_amount, TWO_FEE_UNITS * current);
    }

    let mut b = (FEE_UNITS - fee) * liquidity;
    b -= if is_token0 {
        mul_div(abs_amount, FEE_UNITS * current, Q96_SIGNED)?
    } else {
        mul_div(abs_amount, FEE_UNITS * Q96_SIGNED, current)?
    };

    // c = fee * liquidity * absDelta scaled by the price; the three-factor
    // product needs 512 bits before the division.
    let c_product =
        U512::from((fee * liquidity).unsigned_abs()) * U512::from(abs_amount.unsigned_abs());
    let c512 = if is_token0 {
        mul_div_u512(c_product, U512::from(current.unsigned_abs()), U512::from(Q96))?
    } else {
        mul_div_u512(c_product, U512::from(Q96), U512::from(current.unsigned_abs()))?
    };
    let c = narrow_u512(c512)?;

    get_smaller_root_of_quad_eqn(fee, b, c)
}

/// Final sqrt price of an amount-limited step.
fn calc_final_price(
    abs_amount: I256,
    liquidity: I256,
    delta_l: I256,
    current: I256,
    exact_in: bool,
    is_token0: bool,
) -> Result<I256, MathError> {
    if is_token0 {
        let tmp = mul_div(abs_amount, current, Q96_SIGNED)?;
        if exact_in {
            mul_div_rounding_up(liquidity + delta_l, current, liquidity + tmp)
        } else {
            mul_div(liquidity + delta_l, current, liquidity - tmp)
        }
    } else {
        let tmp = mul_div(abs_amount, Q96_SIGNED, current)?;
        if exact_in {
            mul_div(liquidity + tmp, current, liquidity + delta_l)
        } else {
            mul_div_rounding_up(liquidity - tmp, current, liquidity + delta_l)
        }
    }
}

/// Amount of the unspecified token moved by the step: negative when it is
/// paid out by the pool, positive when it is owed to the pool.
fn calc_returned_amount(
    current: I256,
    next: I256,
    liquidity: I256,
    delta_l: I256,
    exact_in: bool,
    is_token0: bool,
) -> Result<I256, MathError> {
    let mut returned = if is_token0 {
        if exact_in {
            // minimise the output so the pool never sends too much
            mul_div_rounding_up(delta_l, next, Q96_SIGNED)?
                - mul_div(liquidity, current - next, Q96_SIGNED)?
        } else {
            // maximise the input needed for the desired output
            mul_div_rounding_up(delta_l, next, Q96_SIGNED)?
                + mul_div_rounding_up(liquidity, next - current, Q96_SIGNED)?
        }
    } else {
        mul_div_rounding_up(liquidity + delta_l, Q96_SIGNED, next)?
            - mul_div_rounding_up(liquidity, Q96_SIGNED, current)?
    };

    // a residue of one wei is rounding noise, not output
    if exact_in && returned == I256::ONE {
        returned = I256::ZERO;
    }
    Ok(returned)
}
