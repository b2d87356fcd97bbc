use futures::future::{LocalBoxFuture, Shared};
use futures::FutureExt;
use log::{info, warn};
use serde::Deserialize;
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use crate::constants::{
    DEFAULT_FINAL_INDEX, DEFAULT_IMAGE_BASE_URL, DEFAULT_ITEM_WIDTH, DEFAULT_REEL_LENGTH, DEFAULT_SPIN_DURATION_MS,
    DEFAULT_WHEEL_TEXTURE_URL,
};
use crate::error::TransportError;
use crate::reel::ReelLayout;
use crate::shared_wheel_game::{default_bonus_events, BonusEvent};

/// Tunables for the wheel, served by the Reward Service
#[derive(Debug, Clone, PartialEq)]
pub struct WheelConfig {
    pub layout: ReelLayout,
    pub spin_duration_ms: f64,
    pub image_base_url: String,
    pub wheel_texture_url: String,
    pub bonus_events: Vec<BonusEvent>,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            layout: ReelLayout {
                length: DEFAULT_REEL_LENGTH,
                final_index: DEFAULT_FINAL_INDEX,
                item_width: DEFAULT_ITEM_WIDTH,
            },
            spin_duration_ms: DEFAULT_SPIN_DURATION_MS,
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            wheel_texture_url: DEFAULT_WHEEL_TEXTURE_URL.to_string(),
            bonus_events: default_bonus_events(),
        }
    }
}

// === Wire format of GET /api/config ===

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    #[serde(default)]
    pub wheel: Option<WheelSection>,
    #[serde(default)]
    pub urls: Option<UrlSection>,
    #[serde(default)]
    pub bonus_events: Vec<BonusEvent>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WheelSection {
    pub item_width: f64,
    pub spin_duration: f64,
    pub strip_length: usize,
    pub final_index: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UrlSection {
    #[serde(default)]
    pub image_base: Option<String>,
    #[serde(default)]
    pub wheel_texture: Option<String>,
}

impl From<ConfigDocument> for WheelConfig {
    fn from(doc: ConfigDocument) -> Self {
        let defaults = WheelConfig::default();

        let (layout, spin_duration_ms) = match doc.wheel {
            Some(wheel)
                if wheel.final_index < wheel.strip_length
                    && wheel.spin_duration > 0.0
                    && wheel.item_width > 0.0 =>
            {
                let layout = ReelLayout {
                    length: wheel.strip_length,
                    final_index: wheel.final_index,
                    item_width: wheel.item_width,
                };
                (layout, wheel.spin_duration)
            }
            Some(wheel) => {
                warn!("Ignoring invalid wheel config {:?}, using defaults", wheel);
                (defaults.layout, defaults.spin_duration_ms)
            }
            None => (defaults.layout, defaults.spin_duration_ms),
        };

        let urls = doc.urls.unwrap_or(UrlSection {
            image_base: None,
            wheel_texture: None,
        });
        let bonus_events = if doc.bonus_events.is_empty() {
            defaults.bonus_events
        } else {
            doc.bonus_events
        };

        Self {
            layout,
            spin_duration_ms,
            image_base_url: urls.image_base.unwrap_or(defaults.image_base_url),
            wheel_texture_url: urls.wheel_texture.unwrap_or(defaults.wheel_texture_url),
            bonus_events,
        }
    }
}

/// Where the config document comes from
pub trait ConfigSource {
    fn fetch(&self) -> impl Future<Output = Result<ConfigDocument, TransportError>>;
}

type PendingConfig = Shared<LocalBoxFuture<'static, Rc<WheelConfig>>>;

/// Loads the config once and hands the same copy to every caller.
///
/// Concurrent callers share a single request. An unreachable source yields
/// the defaults, which are cached like a real answer until [`reset`].
///
/// [`reset`]: ConfigLoader::reset
pub struct ConfigLoader<S> {
    source: Rc<S>,
    cached: RefCell<Option<Rc<WheelConfig>>>,
    pending: RefCell<Option<PendingConfig>>,
}

impl<S: ConfigSource + 'static> ConfigLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Rc::new(source),
            cached: RefCell::new(None),
            pending: RefCell::new(None),
        }
    }

    pub fn cached(&self) -> Option<Rc<WheelConfig>> {
        self.cached.borrow().clone()
    }

    /// Cached config, or the defaults while nothing is loaded yet.
    pub fn current(&self) -> Rc<WheelConfig> {
        self.cached().unwrap_or_default()
    }

    pub async fn load(&self) -> Rc<WheelConfig> {
        if let Some(config) = self.cached() {
            return config;
        }

        let pending = self
            .pending
            .borrow_mut()
            .get_or_insert_with(|| {
                let source = Rc::clone(&self.source);
                async move {
                    match source.fetch().await {
                        Ok(doc) => {
                            info!("Loaded wheel config");
                            Rc::new(WheelConfig::from(doc))
                        }
                        Err(err) => {
                            warn!("Config fetch failed, using fallback: {}", err);
                            Rc::new(WheelConfig::default())
                        }
                    }
                }
                .boxed_local()
                .shared()
            })
            .clone();

        let config = pending.clone().await;
        // a reset while this load was in flight drops its answer
        let current = self.pending.borrow().as_ref().is_some_and(|p| Shared::ptr_eq(p, &pending));
        if current {
            self.cached.borrow_mut().get_or_insert_with(|| Rc::clone(&config));
            self.pending.borrow_mut().take();
        }
        config
    }

    /// Forgets the cached config so the next `load` asks the source again.
    pub fn reset(&self) {
        self.cached.borrow_mut().take();
        self.pending.borrow_mut().take();
    }
}
