//! Pure calculation functions for page dimensions.
//!
//! No I/O, no pixels — just the math the transcoder applies before asking
//! the codec to resample.

/// Dimensions after capping the width at `max_width`, aspect preserved.
///
/// Returns `None` when the image already fits (no resample needed).
/// New height is `round(height × max_width / width)`.
pub fn fit_to_width(original: (u32, u32), max_width: u32) -> Option<(u32, u32)> {
    let (w, h) = original;
    if w <= max_width {
        return None;
    }
    let scaled = (h as f64 * max_width as f64 / w as f64).round() as u32;
    Some((max_width, scaled.max(1)))
}
