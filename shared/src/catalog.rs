use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::rc::Rc;

use crate::shared_wheel_game::Item;

/// Display pools used to fill reels. Read-only for the lifetime of a session.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    pub regular: Vec<Rc<Item>>,
    pub rare: Vec<Rc<Item>>,
    pub legendary: Vec<Rc<Item>>,
    pub mythic: Vec<Rc<Item>>,
    pub insane: Vec<Rc<Item>>,
}

/// Wire shape of `GET /api/items`
#[derive(Debug, Deserialize, Default)]
pub struct CatalogDocument {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub rare: Vec<Item>,
    #[serde(default)]
    pub legendary: Vec<Item>,
    #[serde(default)]
    pub mythic: Vec<Item>,
    #[serde(default)]
    pub insane: Vec<Item>,
}

fn shared(items: Vec<Item>) -> Vec<Rc<Item>> {
    items.into_iter().map(Rc::new).collect()
}

impl From<CatalogDocument> for ItemCatalog {
    fn from(doc: CatalogDocument) -> Self {
        Self {
            regular: shared(doc.items),
            rare: shared(doc.rare),
            legendary: shared(doc.legendary),
            mythic: shared(doc.mythic),
            insane: shared(doc.insane),
        }
    }
}

impl ItemCatalog {
    pub fn from_regular(items: Vec<Item>) -> Self {
        Self {
            regular: shared(items),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.regular.is_empty()
            && self.rare.is_empty()
            && self.legendary.is_empty()
            && self.mythic.is_empty()
            && self.insane.is_empty()
    }

    pub fn total_len(&self) -> usize {
        self.regular.len() + self.rare.len() + self.legendary.len() + self.mythic.len() + self.insane.len()
    }

    /// Item shown in the final slot until the real outcome arrives.
    /// Regular items first so the placeholder never hints at a big win.
    pub fn placeholder<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Rc<Item>> {
        self.regular
            .choose(rng)
            .or_else(|| {
                [&self.rare, &self.legendary, &self.mythic, &self.insane]
                    .into_iter()
                    .find_map(|pool| pool.choose(rng))
            })
            .cloned()
    }

    /// Uniform pick among regular items, used when the 5x batch gives up on a slot.
    pub fn random_regular<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Rc<Item>> {
        self.regular.choose(rng).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_wheel_game::Rarity;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn placeholder_prefers_regular_items() {
        let mut catalog = ItemCatalog::from_regular(vec![Item::new("dirt", "Dirt", Rarity::Regular)]);
        catalog.mythic.push(Rc::new(Item::new("mythic_jimbo", "Jimbo", Rarity::Mythic)));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(catalog.placeholder(&mut rng).unwrap().texture, "dirt");
        }
    }

    #[test]
    fn placeholder_uses_flavor_pools_when_regular_is_empty() {
        let catalog = ItemCatalog {
            rare: vec![Rc::new(Item::new("rare_steez", "steez", Rarity::Rare))],
            ..ItemCatalog::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(catalog.placeholder(&mut rng).unwrap().texture, "rare_steez");
        assert!(ItemCatalog::default().placeholder(&mut rng).is_none());
    }

    #[test]
    fn document_keeps_pools_apart() {
        let doc: CatalogDocument = serde_json::from_str(
            r#"{"items":[{"texture":"dirt","name":"Dirt"}],"insane":[{"texture":"insane_x","name":"X"}]}"#,
        )
        .unwrap();
        let catalog = ItemCatalog::from(doc);
        assert_eq!(catalog.regular.len(), 1);
        assert_eq!(catalog.insane.len(), 1);
        assert_eq!(catalog.total_len(), 2);
    }
}
