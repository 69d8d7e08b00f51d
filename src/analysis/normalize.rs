//! Peak measurement and unit normalisation.

/// Largest absolute value in `src`, or `0.0` for an empty slice.
pub fn peak_abs(src: &[f32]) -> f32 {
    src.iter().fold(0.0f32, |max, s| max.max(s.abs()))
}

/// Write `src / peak_abs(src)` into `dst` and return the peak.
///
/// A silent block (peak of zero) is copied through unchanged. Only the common
/// length of the two slices is touched.
pub fn normalize_to_unit(src: &[f32], dst: &mut [f32]) -> f32 {
    let peak = peak_abs(src);
    if peak > 0.0 {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = s / peak;
        }
    } else {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = *s;
        }
    }
    peak
}
