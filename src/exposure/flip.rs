//! Zero-crossing search over ladder profiles

use ndarray::Array1;

// Sign with a distinct zero, so an exact zero sample registers as a
// crossing against either neighbor.
fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Spot level where the profile first changes sign, linearly
/// interpolated between the two samples around the crossing.
///
/// Returns `None` when the profile holds one sign across the whole
/// ladder. That is a valid market state, not a failure; callers log it
/// and move on.
pub fn find_flip(levels: &Array1<f64>, profile: &Array1<f64>) -> Option<f64> {
    let n = levels.len().min(profile.len());
    for i in 0..n.saturating_sub(1) {
        let left = profile[i];
        let right = profile[i + 1];
        if sign(left) == sign(right) {
            continue;
        }
        let left_level = levels[i];
        let right_level = levels[i + 1];
        return Some(right_level - (right_level - left_level) * right / (right - left));
    }
    None
}
