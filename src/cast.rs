/// Casts usize to u64. Returns an error if usize doesn't fit in u64.
#[inline(always)]
pub fn usize_to_u64(value: usize) -> crate::WaveResult<u64> {
    // this should always succeed, unless usize is extended to be 128 bits long
    u64::try_from(value).map_err(|_| crate::WaveError::Param("Size is too large".to_string()))
}

/// Casts u64 to usize. Returns an error if the value doesn't fit in usize.
#[inline(always)]
pub fn u64_to_usize(value: u64) -> crate::WaveResult<usize> {
    usize::try_from(value).map_err(|_| crate::WaveError::Param("Size is too large".to_string()))
}

/// Casts u8 to f64.
#[inline(always)]
pub fn u8_to_f64(value: u8) -> f64 {
    f64::from(value)
}

/// Casts i64 to f64, losing precision for values above 2^53.
#[allow(clippy::cast_precision_loss)] // 64-bit samples are normalized to f64 anyway
#[inline(always)]
pub const fn i64_to_f64(value: i64) -> f64 {
    value as f64
}

/// Casts f64 to i64, saturating at the i64 bounds. NaN maps to 0.
#[allow(clippy::cast_possible_truncation)] // float to int casts saturate
#[inline(always)]
pub fn f64_to_i64(value: f64) -> i64 {
    value as i64
}

/// Casts f64 to f32.
#[allow(clippy::cast_possible_truncation)] // precision loss is expected
#[inline(always)]
pub fn f64_to_f32(value: f64) -> f32 {
    value as f32
}

/// Casts i64 to i16 clamping the value to the i16 range.
#[allow(clippy::cast_possible_truncation)] // value has been clamped before casting
#[inline(always)]
pub fn clamp_i64_to_i16(value: i64) -> i16 {
    value.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16
}

/// Casts i64 to u8, keeping only the lowest 8 bits.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // truncation is expected
#[inline(always)]
pub const fn i64_to_u8(value: i64) -> u8 {
    value as u8
}

/// Casts u32 to usize. Returns an error if the value doesn't fit in usize.
#[inline(always)]
pub fn u32_to_usize(value: u32) -> crate::WaveResult<usize> {
    // this always succeeds on 32-bit and 64-bit targets
    usize::try_from(value).map_err(|_| crate::WaveError::Param("Size is too large".to_string()))
}
