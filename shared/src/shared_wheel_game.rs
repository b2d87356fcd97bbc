use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::constants::{LUCKY_SPIN_ENDPOINT, SPIN_ENDPOINT, FIVE_X_REELS, TRIPLE_LUCKY_REELS};

/// Rarity classes, as tagged by the Reward Service's `type` field
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Rare,
    #[serde(alias = "special")]
    Legendary,
    Mythic,
    Insane,
    Event,
    Recursion,
    #[default]
    #[serde(other)]
    Regular,
}

/// Emphasis picked for the reward sound and highlight of a finished spin
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RewardCue {
    Regular,
    Rare,
    Legendary,
    Mythic,
    Insane,
}

impl Rarity {
    pub fn cue(self) -> RewardCue {
        match self {
            Rarity::Insane => RewardCue::Insane,
            Rarity::Mythic => RewardCue::Mythic,
            Rarity::Legendary => RewardCue::Legendary,
            Rarity::Rare => RewardCue::Rare,
            _ => RewardCue::Regular,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Rarity::Insane => "#FF55FF",
            Rarity::Mythic => "#55FFFF",
            Rarity::Legendary => "#AA00AA",
            Rarity::Rare => "#FF5555",
            Rarity::Event => "#FF8800",
            Rarity::Recursion => "#00FF9C",
            Rarity::Regular => "#FFAA00",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rarity::Insane => "Insane",
            Rarity::Mythic => "Mythic",
            Rarity::Legendary => "Legendary",
            Rarity::Rare => "Rare",
            Rarity::Event => "Event",
            Rarity::Recursion => "Recursion",
            Rarity::Regular => "Common",
        }
    }
}

/// A displayable reward
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(alias = "id")]
    pub texture: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Rarity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Item {
    pub fn new(texture: &str, name: &str, rarity: Rarity) -> Self {
        Self {
            texture: texture.to_string(),
            name: name.to_string(),
            kind: Some(rarity),
            chance: None,
            image_url: None,
            username: None,
        }
    }

    /// Explicit `type` first, then the texture naming convention.
    pub fn rarity(&self) -> Rarity {
        if let Some(kind) = self.kind {
            return kind;
        }
        let prefixes = [
            ("insane_", Rarity::Insane),
            ("mythic_", Rarity::Mythic),
            ("special_", Rarity::Legendary),
            ("rare_", Rarity::Rare),
            ("event_", Rarity::Event),
            ("recursion_", Rarity::Recursion),
        ];
        prefixes
            .iter()
            .find(|(prefix, _)| self.texture.starts_with(prefix))
            .map(|(_, rarity)| *rarity)
            .unwrap_or(Rarity::Regular)
    }

    pub fn image_url(&self, image_base: &str, wheel_texture: &str) -> String {
        if let Some(url) = &self.image_url {
            return url.clone();
        }
        if let Some(username) = &self.username {
            return format!("https://minotar.net/helm/{}/64", username);
        }
        if self.rarity() == Rarity::Event {
            return wheel_texture.to_string();
        }
        format!("{}/{}.png", image_base, self.texture)
    }
}

/// Best emphasis across a finished spin, insane > mythic > legendary > rare > other
pub fn best_cue<'a>(items: impl IntoIterator<Item = &'a Item>) -> RewardCue {
    items
        .into_iter()
        .map(|item| item.rarity().cue())
        .max()
        .unwrap_or(RewardCue::Regular)
}

/// Drop chance as a percentage with up to six decimals, `0.0001` -> `"0.01"`
pub fn format_chance(chance: Option<f64>) -> String {
    let Some(chance) = chance.filter(|c| *c > 0.0) else {
        return "0".to_string();
    };
    let formatted = format!("{:.6}", chance * 100.0);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// State of the global recursion event
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecursionStatus {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub lucky_spins_remaining: u32,
    #[serde(default)]
    pub ends_at: Option<String>,
    #[serde(default)]
    pub triggered_by: Option<String>,
}

impl RecursionStatus {
    /// Whether a free lucky spin is still on offer. `ends_at_ms` is the
    /// parsed `ends_at`, if it could be read.
    pub fn offers_lucky_spin(&self, ends_at_ms: Option<f64>, now_ms: f64) -> bool {
        self.active && self.lucky_spins_remaining > 0 && ends_at_ms.map_or(true, |ends| now_ms < ends)
    }
}

/// The server-authoritative result of one spin
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub item: Rc<Item>,
    pub is_new: bool,
    pub is_event: bool,
    pub is_recursion: bool,
    pub recursion: Option<RecursionStatus>,
    /// The spin that produced this outcome was itself a privileged lucky draw
    pub privileged_lucky: bool,
}

impl Outcome {
    /// A plain regular-item outcome with no server flags
    pub fn neutral(item: Rc<Item>) -> Self {
        Self {
            item,
            is_new: false,
            is_event: false,
            is_recursion: false,
            recursion: None,
            privileged_lucky: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpinVariant {
    Single,
    FiveX,
    Lucky,
    TripleLucky,
}

impl SpinVariant {
    pub fn endpoint(self) -> &'static str {
        match self {
            SpinVariant::Single | SpinVariant::FiveX => SPIN_ENDPOINT,
            SpinVariant::Lucky | SpinVariant::TripleLucky => LUCKY_SPIN_ENDPOINT,
        }
    }

    pub fn reel_count(self) -> usize {
        match self {
            SpinVariant::Single | SpinVariant::Lucky => 1,
            SpinVariant::FiveX => FIVE_X_REELS,
            SpinVariant::TripleLucky => TRIPLE_LUCKY_REELS,
        }
    }

    pub fn is_lucky(self) -> bool {
        matches!(self, SpinVariant::Lucky | SpinVariant::TripleLucky)
    }
}

/// Which spin a bonus event grants
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BonusKind {
    FiveXSpin,
    LuckySpin,
    TripleLuckySpin,
}

impl BonusKind {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "triple_spin" | "five_x_spin" => Some(BonusKind::FiveXSpin),
            "lucky_spin" => Some(BonusKind::LuckySpin),
            "triple_lucky_spin" => Some(BonusKind::TripleLuckySpin),
            _ => None,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            BonusKind::FiveXSpin => "triple_spin",
            BonusKind::LuckySpin => "lucky_spin",
            BonusKind::TripleLuckySpin => "triple_lucky_spin",
        }
    }

    pub fn variant(self) -> SpinVariant {
        match self {
            BonusKind::FiveXSpin => SpinVariant::FiveX,
            BonusKind::LuckySpin => SpinVariant::Lucky,
            BonusKind::TripleLuckySpin => SpinVariant::TripleLucky,
        }
    }
}

/// An entry of the bonus wheel
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BonusEvent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
}

impl BonusEvent {
    pub fn new(id: &str, name: &str, description: &str, weight: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            weight: Some(weight),
            color: None,
        }
    }

    pub fn kind(&self) -> Option<BonusKind> {
        BonusKind::from_id(&self.id)
    }

    /// Unset weights count as 1.
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }
}

pub fn default_bonus_events() -> Vec<BonusEvent> {
    vec![
        BonusEvent::new("triple_spin", "5x Spin", "5 bonus spins at once!", 40.0),
        BonusEvent::new("lucky_spin", "Lucky Spin", "Equal chance for all items!", 40.0),
        BonusEvent::new("triple_lucky_spin", "Triple Lucky", "3 lucky spins at once!", 20.0),
    ]
}

/// Tags a bonus-triggered request for analytics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonusTag {
    pub kind: BonusKind,
}

impl BonusTag {
    pub fn body(self, is_first_spin: bool) -> SpinRequestBody {
        SpinRequestBody {
            bonus: true,
            event_type: self.kind.id().to_string(),
            is_first_spin,
        }
    }
}

// === API Types ===

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpinRequestBody {
    pub bonus: bool,
    pub event_type: String,
    pub is_first_spin: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SpinResponse {
    #[serde(default)]
    pub result: Option<Item>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_event: Option<bool>,
    #[serde(default)]
    pub is_recursion: Option<bool>,
    #[serde(default)]
    pub recursion_status: Option<RecursionStatus>,
    #[serde(default)]
    pub is_lucky_spin: Option<bool>,
    #[serde(default)]
    pub cooldown: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SpinResponse {
    /// `None` when the payload carries no winning item.
    pub fn into_outcome(self) -> Option<Outcome> {
        let item = self.result?;
        let is_event = self.is_event.unwrap_or(false) || item.rarity() == Rarity::Event;
        Some(Outcome {
            item: Rc::new(item),
            is_new: self.is_new,
            is_event,
            is_recursion: self.is_recursion.unwrap_or(false),
            recursion: self.recursion_status,
            privileged_lucky: self.is_lucky_spin.unwrap_or(false),
        })
    }
}
