pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

pub(crate) fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

/// Truncating `c * a / 255`, the premultiply step used by every filter primitive.
pub(crate) fn premul_trunc(c: u8, a: u8) -> u8 {
    ((u32::from(c) * u32::from(a)) / 255) as u8
}

/// Truncating `c * 255 / a`; callers guarantee `a != 0`.
pub(crate) fn unpremul_trunc(c: u8, a: u8) -> i32 {
    i32::from(c) * 255 / i32::from(a)
}

pub(crate) fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Clamp to `0..=255` then truncate, matching a C `(guchar)` cast of a clamped double.
pub(crate) fn clamp_f64_u8(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.clamp(0.0, 255.0) as u8
}

/// Euclidean modulo for wraparound indexing.
pub(crate) fn wrap_index(v: i32, len: i32) -> i32 {
    v.rem_euclid(len)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
