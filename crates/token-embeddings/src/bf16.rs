//! 16-bit truncated floats (bf16 bit patterns stored as `u16`).
//!
//! bf16 is 1 sign bit, 8 exponent bits and 7 mantissa bits: the top half of
//! an IEEE-754 f32. Encoding drops the low 16 mantissa bits without
//! rounding, so `decode(encode(x))` is `x` with those bits zeroed. NaN and
//! infinity keep their (truncated) bit patterns.

/// Truncate an f32 to its bf16 code.
#[inline]
pub fn encode(value: f32) -> u16 {
    (value.to_bits() >> 16) as u16
}

/// Widen a bf16 code back to f32, zero-filling the low mantissa bits.
#[inline]
pub fn decode(code: u16) -> f32 {
    f32::from_bits((code as u32) << 16)
}

/// Append the codes for `row` to `out`, in order.
pub fn encode_row(row: &[f32], out: &mut Vec<u16>) {
    out.extend(row.iter().copied().map(encode));
}

pub fn decode_row(codes: &[u16]) -> Vec<f32> {
    codes.iter().copied().map(decode).collect()
}
