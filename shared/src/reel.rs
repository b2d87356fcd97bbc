//! Filler reels built around a single pinned slot.
//!
//! The filler is purely cosmetic: the rolls below only make the strip look
//! plausible and say nothing about the real reward odds.

use rand::seq::SliceRandom;
use rand::Rng;
use std::rc::Rc;

use crate::catalog::ItemCatalog;
use crate::constants::{
    FILLER_INSANE_THRESHOLD, FILLER_LEGENDARY_THRESHOLD, FILLER_MYTHIC_THRESHOLD, FILLER_RARE_THRESHOLD,
};
use crate::error::SpinError;
use crate::shared_wheel_game::Item;

/// Geometry shared by every reel of a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReelLayout {
    pub length: usize,
    pub final_index: usize,
    pub item_width: f64,
}

impl ReelLayout {
    pub fn validate(&self) -> Result<(), SpinError> {
        if self.length <= self.final_index {
            return Err(SpinError::InvalidLayout {
                length: self.length,
                final_index: self.final_index,
            });
        }
        Ok(())
    }
}

/// An ordered strip of items whose final slot holds the session outcome
#[derive(Debug, Clone)]
pub struct Reel {
    slots: Vec<Rc<Item>>,
    final_index: usize,
}

impl Reel {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Rc<Item>] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> Option<&Rc<Item>> {
        self.slots.get(index)
    }

    pub fn final_index(&self) -> usize {
        self.final_index
    }

    pub fn final_item(&self) -> &Rc<Item> {
        &self.slots[self.final_index]
    }

    /// Replaces the final slot only; every other slot stays where it is on screen.
    pub fn pin_final(&mut self, item: Rc<Item>) {
        self.slots[self.final_index] = item;
    }
}

/// Round-robin cursor over one shuffled pool
struct PoolCursor<'a> {
    items: Vec<&'a Rc<Item>>,
    next: usize,
}

impl<'a> PoolCursor<'a> {
    fn shuffled<R: Rng + ?Sized>(pool: &'a [Rc<Item>], rng: &mut R) -> Self {
        let mut items: Vec<&Rc<Item>> = pool.iter().collect();
        items.shuffle(rng);
        Self { items, next: 0 }
    }

    fn take(&mut self) -> Option<Rc<Item>> {
        if self.items.is_empty() {
            return None;
        }
        let item = self.items[self.next % self.items.len()];
        self.next += 1;
        Some(Rc::clone(item))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FillerTier {
    Insane,
    Mythic,
    Legendary,
    Rare,
    Regular,
}

fn classify_roll(roll: f64) -> FillerTier {
    if roll < FILLER_INSANE_THRESHOLD {
        FillerTier::Insane
    } else if roll < FILLER_MYTHIC_THRESHOLD {
        FillerTier::Mythic
    } else if roll < FILLER_LEGENDARY_THRESHOLD {
        FillerTier::Legendary
    } else if roll < FILLER_RARE_THRESHOLD {
        FillerTier::Rare
    } else {
        FillerTier::Regular
    }
}

/// Builds a reel of `layout.length` slots with `guaranteed` at `layout.final_index`.
///
/// Empty pools fall back to the regular pool, and an empty regular pool
/// falls back to repeating `guaranteed`, so every slot is always filled.
pub fn build_reel<R: Rng + ?Sized>(
    catalog: &ItemCatalog,
    guaranteed: Rc<Item>,
    layout: &ReelLayout,
    rng: &mut R,
) -> Result<Reel, SpinError> {
    layout.validate()?;

    let mut regular = PoolCursor::shuffled(&catalog.regular, rng);
    let mut rare = PoolCursor::shuffled(&catalog.rare, rng);
    let mut legendary = PoolCursor::shuffled(&catalog.legendary, rng);
    let mut mythic = PoolCursor::shuffled(&catalog.mythic, rng);
    let mut insane = PoolCursor::shuffled(&catalog.insane, rng);

    let mut slots = Vec::with_capacity(layout.length);
    for index in 0..layout.length {
        if index == layout.final_index {
            slots.push(Rc::clone(&guaranteed));
            continue;
        }

        let flavored = match classify_roll(rng.gen::<f64>()) {
            FillerTier::Insane => insane.take(),
            FillerTier::Mythic => mythic.take(),
            FillerTier::Legendary => legendary.take(),
            FillerTier::Rare => rare.take(),
            FillerTier::Regular => None,
        };
        let item = flavored
            .or_else(|| regular.take())
            .unwrap_or_else(|| Rc::clone(&guaranteed));
        slots.push(item);
    }

    Ok(Reel {
        slots,
        final_index: layout.final_index,
    })
}
