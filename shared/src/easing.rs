use rand::Rng;

use crate::constants::{
    EDGE_PAST_PROBABILITY, EDGE_SHORT_PROBABILITY, EDGE_SOFT_MAX, EDGE_STRONG_MAX, EDGE_STRONG_MIN,
};
use crate::reel::ReelLayout;

/// Quartic ease-out: fast start, long deceleration.
pub fn ease_out_quart(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(4)
}

/// Scroll offset after `elapsed_ms` of a `total_ms` animation towards `target`.
pub fn offset_at(elapsed_ms: f64, total_ms: f64, target: f64) -> f64 {
    if total_ms <= 0.0 {
        return target;
    }
    let progress = (elapsed_ms / total_ms).clamp(0.0, 1.0);
    if progress >= 1.0 {
        return target;
    }
    ease_out_quart(progress) * target
}

/// Where the reel settles relative to the centre of the final slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeTension {
    /// Stops suggestively before the centre
    Short,
    /// Drifts suggestively past the centre
    Past,
    Centered,
}

impl EdgeTension {
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let roll: f64 = rng.gen();
        if roll < EDGE_SHORT_PROBABILITY {
            EdgeTension::Short
        } else if roll < EDGE_SHORT_PROBABILITY + EDGE_PAST_PROBABILITY {
            EdgeTension::Past
        } else {
            EdgeTension::Centered
        }
    }
}

/// Landing jitter in pixels, drawn once per reel per session.
/// Always within half an item so the marker rests on the final slot.
pub fn landing_jitter<R: Rng + ?Sized>(rng: &mut R, item_width: f64) -> f64 {
    let fraction = match EdgeTension::roll(rng) {
        EdgeTension::Short => -rng.gen_range(EDGE_STRONG_MIN..EDGE_STRONG_MAX),
        EdgeTension::Past => rng.gen_range(EDGE_STRONG_MIN..EDGE_STRONG_MAX),
        EdgeTension::Centered => rng.gen_range(-EDGE_SOFT_MAX..EDGE_SOFT_MAX),
    };
    fraction * item_width
}

pub fn target_offset(layout: &ReelLayout, jitter: f64) -> f64 {
    layout.final_index as f64 * layout.item_width + jitter
}
