//! Browser implementations of the engine's clock, transport and config source.

use futures::channel::oneshot;
use gloo::net::http::{Request, RequestBuilder};
use gloo_render::request_animation_frame;
use gloo_timers::future::TimeoutFuture;
use log::{debug, error};
use shared::catalog::{CatalogDocument, ItemCatalog};
use shared::config::{ConfigDocument, ConfigSource};
use shared::constants::{CONFIG_ENDPOINT, ITEMS_ENDPOINT};
use shared::error::TransportError;
use shared::fetcher::{RewardTransport, TransportReply};
use shared::frame::FrameClock;
use shared::SpinRequestBody;
use web_sys::{window, AbortController};

use crate::config::api_url;

// Get auth token from storage
pub fn get_auth_token() -> Option<String> {
    window()
        .and_then(|w| w.local_storage().ok().flatten())
        .and_then(|s| s.get_item("token").ok().flatten())
        .or_else(|| {
            window()
                .and_then(|w| w.session_storage().ok().flatten())
                .and_then(|s| s.get_item("token").ok().flatten())
        })
}

fn authorized(builder: RequestBuilder) -> RequestBuilder {
    match get_auth_token() {
        Some(token) => builder.header("Authorization", &format!("Bearer {}", token)),
        None => builder,
    }
}

/// Animation frames from `requestAnimationFrame`, timers from `setTimeout`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserClock;

impl FrameClock for BrowserClock {
    async fn next_frame(&self) -> f64 {
        let (tx, rx) = oneshot::channel();
        // dropping the handle cancels the frame request
        let _frame = request_animation_frame(move |timestamp| {
            let _ = tx.send(timestamp);
        });
        rx.await.unwrap_or_else(|_| self.now())
    }

    async fn sleep(&self, ms: u32) {
        TimeoutFuture::new(ms).await;
    }

    fn now(&self) -> f64 {
        window()
            .and_then(|w| w.performance())
            .map(|performance| performance.now())
            .unwrap_or_else(js_sys::Date::now)
    }
}

/// Aborts the browser request unless it finished first.
struct AbortOnDrop {
    controller: AbortController,
    finished: bool,
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if !self.finished {
            debug!("Aborting in-flight spin request");
            self.controller.abort();
        }
    }
}

/// POSTs spin requests to the Reward Service with `fetch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchTransport;

impl RewardTransport for FetchTransport {
    async fn post(&self, path: &str, body: Option<&SpinRequestBody>) -> Result<TransportReply, TransportError> {
        let controller = AbortController::new().map_err(|e| TransportError(format!("{:?}", e)))?;
        let mut guard = AbortOnDrop {
            controller,
            finished: false,
        };

        let signal = guard.controller.signal();
        let builder = authorized(Request::post(&api_url(path)))
            .header("Content-Type", "application/json")
            .abort_signal(Some(&signal));
        let request = match body {
            Some(body) => builder.json(body),
            None => builder.build(),
        }
        .map_err(|e| TransportError(e.to_string()))?;

        let response = request.send().await.map_err(|e| TransportError(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| TransportError(e.to_string()))?;
        guard.finished = true;
        Ok(TransportReply { status, body })
    }
}

/// Reads `GET /api/config`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConfigSource;

impl ConfigSource for HttpConfigSource {
    async fn fetch(&self) -> Result<ConfigDocument, TransportError> {
        let response = Request::get(&api_url(CONFIG_ENDPOINT))
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        if !response.ok() {
            return Err(TransportError(format!("Error status: {}", response.status())));
        }
        let text = response.text().await.map_err(|e| TransportError(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| TransportError(format!("Error parsing config: {}", e)))
    }
}

pub async fn fetch_catalog() -> Result<ItemCatalog, String> {
    let response = authorized(Request::get(&api_url(ITEMS_ENDPOINT)))
        .send()
        .await
        .map_err(|e| format!("Network error: {:?}", e))?;
    if !response.ok() {
        return Err(format!("Error status: {}", response.status()));
    }
    let text = response.text().await.map_err(|e| format!("Network error: {:?}", e))?;
    match serde_json::from_str::<CatalogDocument>(&text) {
        Ok(doc) => Ok(ItemCatalog::from(doc)),
        Err(e) => {
            error!("Item catalog could not be parsed: {}", e);
            Err(format!("Error parsing items: {}", e))
        }
    }
}
