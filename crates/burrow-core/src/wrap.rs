//! Modular arithmetic for worlds that wrap around an axis.

/// Wrap `v` into `[0, size)`. `size` must be positive.
#[inline]
pub fn wrap_index(v: i32, size: i32) -> i32 {
    debug_assert!(size > 0);
    v.rem_euclid(size)
}

/// Shortest signed displacement `d` on an axis of length `size`.
///
/// With wrapping the result lies in `[-size/2, size/2]`; without wrapping
/// `d` is returned unchanged.
#[inline]
pub fn shortest_delta(d: f32, size: f32, wraps: bool) -> f32 {
    if !wraps || size <= 0.0 {
        return d;
    }
    let m = d.rem_euclid(size);
    if m > size / 2.0 { m - size } else { m }
}
