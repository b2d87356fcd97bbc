use futures::future::{self, Either};
use log::{debug, error, warn};
use rand::Rng;
use std::cell::Cell;
use std::future::Future;
use std::pin::pin;
use std::rc::Rc;

use crate::catalog::ItemCatalog;
use crate::constants::{
    HTTP_TOO_MANY_REQUESTS, MALFORMED_RESPONSE_ERROR, MAX_EVENT_RETRIES, SPIN_COOLDOWN_MS, SPIN_TIMEOUT_MS,
};
use crate::error::{SpinError, TransportError};
use crate::frame::{CancelFlag, FrameClock};
use crate::shared_wheel_game::{BonusTag, Outcome, SpinRequestBody, SpinResponse, SpinVariant};

/// Raw HTTP reply handed back by a transport
#[derive(Debug, Clone, PartialEq)]
pub struct TransportReply {
    pub status: u16,
    pub body: String,
}

/// HTTP access to the Reward Service.
///
/// Dropping the returned future must abort the underlying request.
pub trait RewardTransport {
    fn post(
        &self,
        path: &str,
        body: Option<&SpinRequestBody>,
    ) -> impl Future<Output = Result<TransportReply, TransportError>>;
}

/// Remembers the last confirmed success of a cooldown-gated spin.
#[derive(Debug)]
pub struct CooldownClock {
    window_ms: f64,
    last_success: Cell<Option<f64>>,
}

impl CooldownClock {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms,
            last_success: Cell::new(None),
        }
    }

    /// Milliseconds left before the next spin may be sent, if any.
    pub fn remaining(&self, now: f64) -> Option<f64> {
        let last = self.last_success.get()?;
        let remaining = self.window_ms - (now - last);
        (remaining > 0.0).then_some(remaining)
    }

    pub fn record_success(&self, now: f64) {
        self.last_success.set(Some(now));
    }

    pub fn last_success(&self) -> Option<f64> {
        self.last_success.get()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FetchOptions {
    pub bonus: Option<BonusTag>,
    pub is_first_spin: bool,
}

impl FetchOptions {
    pub fn bonus(tag: Option<BonusTag>) -> Self {
        Self { bonus: tag, is_first_spin: false }
    }

    fn body(&self) -> Option<SpinRequestBody> {
        self.bonus.map(|tag| tag.body(self.is_first_spin))
    }
}

/// Turns a raw reply into an outcome or one of the failure kinds.
pub fn classify_reply(reply: &TransportReply) -> Result<Outcome, SpinError> {
    if reply.status == HTTP_TOO_MANY_REQUESTS {
        return Err(SpinError::Cooldown { remaining_ms: None });
    }

    let parsed = serde_json::from_str::<SpinResponse>(&reply.body).ok();
    if parsed.as_ref().and_then(|r| r.cooldown).unwrap_or(false) {
        return Err(SpinError::Cooldown { remaining_ms: None });
    }

    if !(200..300).contains(&reply.status) {
        let message = parsed
            .and_then(|r| r.error)
            .unwrap_or_else(|| format!("Spin failed ({})", reply.status));
        return Err(SpinError::ServerRejected(message));
    }

    let Some(response) = parsed else {
        return Err(SpinError::ServerRejected(MALFORMED_RESPONSE_ERROR.to_string()));
    };
    let server_error = response.error.clone();
    response
        .into_outcome()
        .ok_or_else(|| SpinError::ServerRejected(server_error.unwrap_or_else(|| MALFORMED_RESPONSE_ERROR.to_string())))
}

/// Result of one 5x slot after its event-skipping retries
#[derive(Debug, Clone, PartialEq)]
pub enum SlotFetch {
    Drawn { outcome: Outcome, attempts: u32 },
    /// Every attempt came back as an event
    Exhausted { attempts: u32 },
}

/// One finished slot of a multi-reel batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSlot {
    pub outcome: Outcome,
    pub attempts: u32,
    pub synthesized: bool,
    /// The slot reported as the batch's first successful spin
    pub event_trigger: bool,
}

/// Per-slot results of a batch, in slot order
#[derive(Debug, Clone, PartialEq)]
pub struct BatchTally {
    slots: Vec<SlotFetch>,
}

impl BatchTally {
    pub fn new(slots: Vec<SlotFetch>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[SlotFetch] {
        &self.slots
    }

    /// First slot that succeeded on its first attempt, else first slot that
    /// succeeded at all. Synthesized slots never qualify.
    pub fn event_trigger(&self) -> Option<usize> {
        let clean = self
            .slots
            .iter()
            .position(|slot| matches!(slot, SlotFetch::Drawn { attempts: 1, .. }));
        clean.or_else(|| {
            self.slots
                .iter()
                .position(|slot| matches!(slot, SlotFetch::Drawn { .. }))
        })
    }

    /// Fills exhausted slots with a uniformly random regular item.
    pub fn finish<R: Rng + ?Sized>(self, catalog: &ItemCatalog, rng: &mut R) -> Result<Vec<BatchSlot>, SpinError> {
        let trigger = self.event_trigger();
        self.slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                let event_trigger = trigger == Some(index);
                match slot {
                    SlotFetch::Drawn { outcome, attempts } => Ok(BatchSlot {
                        outcome,
                        attempts,
                        synthesized: false,
                        event_trigger,
                    }),
                    SlotFetch::Exhausted { attempts } => {
                        let item = catalog.random_regular(rng).ok_or(SpinError::CatalogUnavailable)?;
                        Ok(BatchSlot {
                            outcome: Outcome::neutral(item),
                            attempts,
                            synthesized: true,
                            event_trigger,
                        })
                    }
                }
            })
            .collect()
    }
}

/// Issues spin requests against the Reward Service.
pub struct OutcomeFetcher<T, C> {
    transport: T,
    clock: Rc<C>,
    cooldown: CooldownClock,
    timeout_ms: u32,
}

impl<T: RewardTransport, C: FrameClock> OutcomeFetcher<T, C> {
    pub fn new(transport: T, clock: Rc<C>) -> Self {
        Self {
            transport,
            clock,
            cooldown: CooldownClock::new(SPIN_COOLDOWN_MS),
            timeout_ms: SPIN_TIMEOUT_MS,
        }
    }

    pub fn with_timings(mut self, cooldown_ms: f64, timeout_ms: u32) -> Self {
        self.cooldown = CooldownClock::new(cooldown_ms);
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn cooldown(&self) -> &CooldownClock {
        &self.cooldown
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Only plain single spins are cooldown-gated; lucky and bonus spins are free.
    fn is_gated(variant: SpinVariant, options: &FetchOptions) -> bool {
        variant == SpinVariant::Single && options.bonus.is_none()
    }

    pub fn check_cooldown(&self, variant: SpinVariant, options: &FetchOptions) -> Result<(), SpinError> {
        if !Self::is_gated(variant, options) {
            return Ok(());
        }
        match self.cooldown.remaining(self.clock.now()) {
            Some(remaining_ms) => Err(SpinError::Cooldown {
                remaining_ms: Some(remaining_ms),
            }),
            None => Ok(()),
        }
    }

    /// Fetches one authoritative outcome.
    ///
    /// The cooldown clock moves only after a reply has been validated, and
    /// never for a request whose session was cancelled meanwhile.
    pub async fn fetch(
        &self,
        variant: SpinVariant,
        options: FetchOptions,
        cancel: &CancelFlag,
    ) -> Result<Outcome, SpinError> {
        self.check_cooldown(variant, &options)?;

        let reply = self.send(variant, &options, cancel).await?;
        if cancel.is_cancelled() {
            return Err(SpinError::Aborted);
        }

        let outcome = classify_reply(&reply).map_err(|err| {
            match &err {
                SpinError::Cooldown { .. } => warn!("Spin rate-limited by the reward service"),
                other => error!("Spin rejected: {}", other),
            }
            err
        })?;

        if Self::is_gated(variant, &options) {
            self.cooldown.record_success(self.clock.now());
        }
        Ok(outcome)
    }

    async fn send(
        &self,
        variant: SpinVariant,
        options: &FetchOptions,
        cancel: &CancelFlag,
    ) -> Result<TransportReply, SpinError> {
        let body = options.body();
        let request = pin!(self.transport.post(variant.endpoint(), body.as_ref()));
        let timeout = pin!(self.clock.sleep(self.timeout_ms));

        match cancel.guard(future::select(request, timeout)).await {
            Err(_) => {
                debug!("Spin request cancelled");
                Err(SpinError::Aborted)
            }
            Ok(Either::Right(_)) => {
                warn!("Spin request timed out after {}ms", self.timeout_ms);
                Err(SpinError::Aborted)
            }
            Ok(Either::Left((reply, _))) => reply.map_err(|err| {
                error!("Reward service unreachable: {}", err);
                SpinError::from(err)
            }),
        }
    }

    /// Retries a 5x slot while the service keeps answering with bonus events.
    async fn fetch_skipping_events(&self, options: FetchOptions, cancel: &CancelFlag) -> Result<SlotFetch, SpinError> {
        let mut attempts = 0;
        while attempts < MAX_EVENT_RETRIES {
            attempts += 1;
            let outcome = self.fetch(SpinVariant::FiveX, options, cancel).await?;
            if !outcome.is_event {
                return Ok(SlotFetch::Drawn { outcome, attempts });
            }
            debug!("5x slot drew a bonus event, retrying (attempt {})", attempts);
        }
        warn!("5x slot drew events {} times in a row, synthesizing a regular item", attempts);
        Ok(SlotFetch::Exhausted { attempts })
    }

    /// Runs every slot of a multi-reel variant in parallel.
    ///
    /// No slot request is sent as the first spin: which slot triggered the
    /// batch is only known from the replies, and is read off the tally.
    /// The first failing slot fails the whole batch and drops (aborting) the
    /// others.
    pub async fn fetch_batch(
        &self,
        variant: SpinVariant,
        options: FetchOptions,
        cancel: &CancelFlag,
    ) -> Result<BatchTally, SpinError> {
        let count = variant.reel_count();
        let options = FetchOptions {
            is_first_spin: false,
            ..options
        };

        let slots = if variant == SpinVariant::FiveX {
            future::try_join_all((0..count).map(|_| self.fetch_skipping_events(options, cancel))).await?
        } else {
            future::try_join_all((0..count).map(|_| async move {
                let outcome = self.fetch(variant, options, cancel).await?;
                Ok::<_, SpinError>(SlotFetch::Drawn { outcome, attempts: 1 })
            }))
            .await?
        };
        Ok(BatchTally::new(slots))
    }
}
