//! Output size resolution from a source size and a resize request.

/// Compute the output `(width, height)` for a conversion.
///
/// Rules, in priority order:
/// 1. No target → the original size.
/// 2. Both targets, aspect ratio not kept → exactly the targets.
/// 3. Only a width → height follows the source aspect ratio.
/// 4. Only a height → width follows the source aspect ratio.
/// 5. Both targets, aspect ratio kept → the largest size fitting inside the
///    target box.
///
/// Zero targets count as absent. Rounding is half away from zero and both
/// results are at least 1, so this never fails.
pub fn resolve_dimensions(
    original_width: u32,
    original_height: u32,
    target_width: Option<u32>,
    target_height: Option<u32>,
    maintain_aspect_ratio: bool,
) -> (u32, u32) {
    let ow = original_width.max(1);
    let oh = original_height.max(1);
    let tw = target_width.filter(|&w| w > 0);
    let th = target_height.filter(|&h| h > 0);

    let aspect = f64::from(ow) / f64::from(oh);

    match (tw, th) {
        (None, None) => (ow, oh),
        (Some(w), Some(h)) if !maintain_aspect_ratio => (w, h),
        (Some(w), None) => (w, round_dim(f64::from(w) / aspect)),
        (None, Some(h)) => (round_dim(f64::from(h) * aspect), h),
        (Some(w), Some(h)) => {
            let scale = (f64::from(w) / f64::from(ow)).min(f64::from(h) / f64::from(oh));
            (
                round_dim(f64::from(ow) * scale),
                round_dim(f64::from(oh) * scale),
            )
        }
    }
}

fn round_dim(value: f64) -> u32 {
    // f64::round is half-away-from-zero; the cast saturates at u32::MAX
    (value.round() as u32).max(1)
}
