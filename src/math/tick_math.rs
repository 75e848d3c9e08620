use crate::error::StateError;
use alloy_primitives::{I256, U256};

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = -MIN_TICK;

pub const MIN_SQRT_RATIO: U256 = U256::from_limbs([4295128739, 0, 0, 0]);
pub const MAX_SQRT_RATIO: U256 =
    U256::from_limbs([6743328256752651558, 17280870778742802505, 4294805859, 0]);

const SQRT_10001: I256 = I256::from_raw(U256::from_limbs([11745905768312294533, 13863, 0, 0]));
const TICK_LOW: I256 = I256::from_raw(U256::from_limbs([
    6552757943157144234,
    184476617836266586,
    0,
    0,
]));
const TICK_HIGH: I256 = I256::from_raw(U256::from_limbs([
    4998474450511881007,
    15793544031827761793,
    0,
    0,
]));

// Q128 multipliers for sqrt(1.0001)^-(2^k), k = 1..=19. Bit 0 is handled
// separately as the loop seed.
const TICK_MULTIPLIERS: [[u64; 2]; 19] = [
    [6459403834229662010, 18444899583751176498],
    [17226890335427755468, 18443055278223354162],
    [2032852871939366096, 18439367220385604838],
    [14545316742740207172, 18431993317065449817],
    [5129152022828963008, 18417254355718160513],
    [4894419605888772193, 18387811781193591352],
    [1280255884321894483, 18329067761203520168],
    [15924666964335305636, 18212142134806087854],
    [8010504389359918676, 17980523815641551639],
    [10668036004952895731, 17526086738831147013],
    [4878133418470705625, 16651378430235024244],
    [9537173718739605541, 15030750278693429944],
    [9972618978014552549, 12247334978882834399],
    [10428997489610666743, 8131365268884726200],
    [9305304367709015974, 3584323654723342297],
    [14301143598189091785, 696457651847595233],
    [7393154844743099908, 26294789957452057],
    [2209338891292245656, 37481735321082],
    [10518117631919034274, 76158723],
];

/// Returns the sqrt price (Q64.96 fixed-point) at a given tick index, or
/// `StateError::TickOutOfBounds` if the tick is outside `[MIN_TICK, MAX_TICK]`.
///
/// Bit-exact with the on-chain implementation, including the final rounding
/// step from Q128 down to Q96.
pub fn get_sqrt_ratio_at_tick(tick: i32) -> Result<U256, StateError> {
    let abs_tick = tick.unsigned_abs();

    if abs_tick > MAX_TICK as u32 {
        return Err(StateError::TickOutOfBounds);
    }

    let mut ratio = if abs_tick & 1 != 0 {
        U256::from_limbs([12262481743371124737, 18445821805675392311, 0, 0])
    } else {
        U256::from_limbs([0, 0, 1, 0])
    };

    for (i, limbs) in TICK_MULTIPLIERS.iter().enumerate() {
        if abs_tick & (2u32 << i) != 0 {
            ratio = ratio.wrapping_mul(U256::from_limbs([limbs[0], limbs[1], 0, 0])) >> 128;
        }
    }

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    let lower_32_bits = (ratio.as_limbs()[0] & 0xFFFF_FFFF) as u32;
    Ok((ratio >> 32) + U256::from((lower_32_bits != 0) as u64))
}

const MASK_128: U256 = U256::from_limbs([u64::MAX, u64::MAX, 0, 0]);
const MASK_64: U256 = U256::from_limbs([u64::MAX, 0, 0, 0]);
const MASK_32: U256 = U256::from_limbs([u32::MAX as u64, 0, 0, 0]);
const MASK_16: U256 = U256::from_limbs([u16::MAX as u64, 0, 0, 0]);

#[inline(always)]
fn most_significant_bit(mut r: U256) -> u32 {
    let mut msb: u32 = 0;

    if r > MASK_128 {
        msb |= 128;
        r >>= 128;
    }
    if r > MASK_64 {
        msb |= 64;
        r >>= 64;
    }
    if r > MASK_32 {
        msb |= 32;
        r >>= 32;
    }
    if r > MASK_16 {
        msb |= 16;
        r >>= 16;
    }
    if r > U256::from(255u64) {
        msb |= 8;
        r >>= 8;
    }
    if r > U256::from(15u64) {
        msb |= 4;
        r >>= 4;
    }
    if r > U256::from(3u64) {
        msb |= 2;
        r >>= 2;
    }
    if r > U256::ONE {
        msb |= 1;
    }

    msb
}

/// Computes the tick index for a given sqrt price (Q64.96 fixed-point).
///
/// The valid input range is `[MIN_SQRT_RATIO, MAX_SQRT_RATIO)`; this is the
/// exact inverse of [`get_sqrt_ratio_at_tick`] at tick boundaries.
pub fn get_tick_at_sqrt_ratio(sqrt_price_x96: U256) -> Result<i32, StateError> {
    if sqrt_price_x96 < MIN_SQRT_RATIO || sqrt_price_x96 >= MAX_SQRT_RATIO {
        return Err(StateError::SqrtPriceOutOfBounds);
    }

    let ratio = sqrt_price_x96 << 32;
    let msb = most_significant_bit(ratio);

    let mut r = if msb >= 128 {
        ratio >> (msb - 127)
    } else {
        ratio << (127 - msb)
    };

    let mut log_2: I256 =
        (I256::from_raw(U256::from(msb)) - I256::from_raw(U256::from(128u64))) << 64;

    for shift in (50usize..=63).rev() {
        r = r.overflowing_mul(r).0 >> 127;
        let f = r >> 128;
        log_2 |= I256::from_raw(f << shift);
        r >>= f;
    }

    let log_sqrt10001 = log_2.wrapping_mul(SQRT_10001);
    let tick_low = ((log_sqrt10001 - TICK_LOW) >> 128usize).low_i32();
    let tick_high = ((log_sqrt10001 + TICK_HIGH) >> 128usize).low_i32();

    Ok(if tick_low == tick_high {
        tick_low
    } else if get_sqrt_ratio_at_tick(tick_high)? <= sqrt_price_x96 {
        tick_high
    } else {
        tick_low
    })
}
