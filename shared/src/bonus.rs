use rand::seq::SliceRandom;
use rand::Rng;

use crate::constants::{BONUS_FINAL_INDEX, BONUS_ITEM_WIDTH, BONUS_REEL_LENGTH};
use crate::reel::ReelLayout;
use crate::shared_wheel_game::BonusEvent;

pub const BONUS_LAYOUT: ReelLayout = ReelLayout {
    length: BONUS_REEL_LENGTH,
    final_index: BONUS_FINAL_INDEX,
    item_width: BONUS_ITEM_WIDTH,
};

/// Cumulative-weight draw over the bonus catalog.
///
/// Returns `None` only for an empty catalog. If rounding walks past the last
/// entry the first entry is chosen.
pub fn draw_bonus_event<'a, R: Rng + ?Sized>(catalog: &'a [BonusEvent], rng: &mut R) -> Option<&'a BonusEvent> {
    let first = catalog.first()?;
    let total: f64 = catalog.iter().map(|event| event.effective_weight().max(0.0)).sum();
    if total <= 0.0 {
        return Some(first);
    }

    let mut remainder = rng.gen_range(0.0..total);
    for event in catalog {
        remainder -= event.effective_weight().max(0.0);
        if remainder <= 0.0 {
            return Some(event);
        }
    }
    Some(first)
}

/// A strip of random catalog entries with `selected` pinned at the bonus final index.
pub fn build_bonus_strip<R: Rng + ?Sized>(catalog: &[BonusEvent], selected: &BonusEvent, rng: &mut R) -> Vec<BonusEvent> {
    (0..BONUS_LAYOUT.length)
        .map(|index| {
            if index == BONUS_LAYOUT.final_index {
                selected.clone()
            } else {
                catalog.choose(rng).unwrap_or(selected).clone()
            }
        })
        .collect()
}
