use fixed::types::{I16F16, I32F32};

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// All volumes, temperatures, and rates in the simulation use this type so
/// that identical operation sequences produce identical state on every
/// platform.
pub type Fixed64 = I32F32;

/// Q16.16 fixed-point for compact storage (display colours, tilt angles).
pub type Fixed32 = I16F16;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Content entries with less volume than this are pruned from a vessel, and
/// volume-sum invariants are checked against this tolerance.
pub const VOLUME_EPSILON: Fixed64 = Fixed64::from_bits(1 << 22); // ~0.001

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display/FFI, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Checked division for Fixed64 that returns None on zero divisor.
#[inline]
pub fn checked_div_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_div(b)
}

/// Deterministic square root for non-negative Fixed64 values.
///
/// Computes the integer square root of the raw Q32.32 bits shifted into
/// Q64.64, which yields the Q32.32 root exactly (truncated). Negative inputs
/// return zero.
pub fn sqrt64(v: Fixed64) -> Fixed64 {
    if v <= Fixed64::ZERO {
        return Fixed64::ZERO;
    }
    let wide = (v.to_bits() as u128) << 32;
    Fixed64::from_bits(isqrt_u128(wide) as i64)
}

/// Newton's method integer square root on u128.
fn isqrt_u128(n: u128) -> u128 {
    if n == 0 {
        return 0;
    }
    let mut x = n;
    let mut y = (x + 1) >> 1;
    while y < x {
        x = y;
        y = (x + n / x) >> 1;
    }
    x
}
