//! Spin session controller.
//!
//! A session animates its reels and fetches the real outcome at the same
//! time, and only settles once both are done. Offsets change every frame and
//! are read by polling; the session state changes a handful of times per spin
//! and is pushed to subscribers.

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::bonus::{build_bonus_strip, draw_bonus_event, BONUS_LAYOUT};
use crate::catalog::ItemCatalog;
use crate::config::WheelConfig;
use crate::constants::{
    BONUS_RESULT_DELAY_MS, BONUS_SPIN_DURATION_MS, EVENT_REVEAL_DELAY_MS, REEL_STAGGER_MS, UNKNOWN_BONUS_ERROR,
};
use crate::easing::{landing_jitter, target_offset};
use crate::error::{SpinError, SpinNotice};
use crate::fetcher::{FetchOptions, OutcomeFetcher, RewardTransport};
use crate::frame::{drive_reel, drive_reel_after, CancelFlag, FrameClock, FrameOutcome, ReelOffset, SpinPlan};
use crate::reel::{build_reel, Reel, ReelLayout};
use crate::shared_wheel_game::{
    best_cue, BonusEvent, BonusKind, BonusTag, Item, RecursionStatus, RewardCue, SpinVariant,
};

/// What the wheel is doing, with exactly the data each screen needs
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle {
        notice: Option<SpinNotice>,
    },
    Spinning,
    /// The five-reel bonus spin
    TripleSpinning,
    LuckySpinning,
    TripleLuckySpinning,
    Result {
        item: Rc<Item>,
        is_new: bool,
        recursion: Option<RecursionStatus>,
        cue: RewardCue,
    },
    Event {
        item: Rc<Item>,
    },
    BonusWheel {
        strip: Vec<BonusEvent>,
        selected: BonusEvent,
    },
    BonusResult {
        event: BonusEvent,
    },
    Recursion {
        item: Rc<Item>,
        is_new: bool,
        status: Option<RecursionStatus>,
        privileged_lucky: bool,
        cue: RewardCue,
    },
    TripleResult {
        items: Vec<Rc<Item>>,
        new_flags: Vec<bool>,
        /// Slot whose first attempt was the batch's first clean spin
        event_trigger: Option<usize>,
        cue: RewardCue,
    },
    LuckyResult {
        item: Rc<Item>,
        is_new: bool,
        recursion: Option<RecursionStatus>,
        cue: RewardCue,
    },
    TripleLuckyResult {
        items: Vec<Rc<Item>>,
        new_flags: Vec<bool>,
        event_trigger: Option<usize>,
        cue: RewardCue,
    },
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle { notice: None }
    }
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle { .. } => "idle",
            SessionState::Spinning => "spinning",
            SessionState::TripleSpinning => "tripleSpinning",
            SessionState::LuckySpinning => "luckySpinning",
            SessionState::TripleLuckySpinning => "tripleLuckySpinning",
            SessionState::Result { .. } => "result",
            SessionState::Event { .. } => "event",
            SessionState::BonusWheel { .. } => "bonusWheel",
            SessionState::BonusResult { .. } => "bonusResult",
            SessionState::Recursion { .. } => "recursion",
            SessionState::TripleResult { .. } => "tripleResult",
            SessionState::LuckyResult { .. } => "luckyResult",
            SessionState::TripleLuckyResult { .. } => "tripleLuckyResult",
        }
    }

    /// Latest recursion status reported by the Reward Service, if this state carries one
    pub fn recursion_status(&self) -> Option<&RecursionStatus> {
        match self {
            SessionState::Recursion { status, .. } => status.as_ref(),
            SessionState::Result { recursion, .. } | SessionState::LuckyResult { recursion, .. } => recursion.as_ref(),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle { .. })
    }

    pub fn is_spinning(&self) -> bool {
        matches!(
            self,
            SessionState::Spinning
                | SessionState::TripleSpinning
                | SessionState::LuckySpinning
                | SessionState::TripleLuckySpinning
        )
    }

    /// States that accept `reset` and `respin`
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Result { .. }
                | SessionState::Recursion { .. }
                | SessionState::TripleResult { .. }
                | SessionState::LuckyResult { .. }
                | SessionState::TripleLuckyResult { .. }
        )
    }

    fn spinning(variant: SpinVariant) -> Self {
        match variant {
            SpinVariant::Single => SessionState::Spinning,
            SpinVariant::FiveX => SessionState::TripleSpinning,
            SpinVariant::Lucky => SessionState::LuckySpinning,
            SpinVariant::TripleLucky => SessionState::TripleLuckySpinning,
        }
    }
}

/// How a session was started: the variant plus the bonus that granted it, if any
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Launch {
    pub variant: SpinVariant,
    pub bonus: Option<BonusTag>,
}

impl Launch {
    pub fn user(variant: SpinVariant) -> Self {
        Self { variant, bonus: None }
    }

    pub fn bonus(kind: BonusKind) -> Self {
        Self {
            variant: kind.variant(),
            bonus: Some(BonusTag { kind }),
        }
    }
}

/// A running session. Spawn it on the local executor.
pub type SessionRun = LocalBoxFuture<'static, ()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(usize);

type Observer = Rc<dyn Fn(&SessionState)>;

struct Session {
    launch: Launch,
    cancel: CancelFlag,
    catalog: Rc<ItemCatalog>,
    plans: Vec<SpinPlan>,
}

enum Step {
    Done,
    Launch(Launch),
}

pub struct SpinController<T, C> {
    clock: Rc<C>,
    fetcher: OutcomeFetcher<T, C>,
    layout: ReelLayout,
    spin_duration_ms: f64,
    bonus_catalog: Vec<BonusEvent>,
    catalog: RefCell<Option<Rc<ItemCatalog>>>,
    state: RefCell<SessionState>,
    reels: RefCell<Vec<Reel>>,
    offsets: RefCell<Vec<ReelOffset>>,
    bonus_offset: ReelOffset,
    cancel: RefCell<CancelFlag>,
    last_launch: Cell<Option<Launch>>,
    rng: RefCell<SmallRng>,
    observers: RefCell<Vec<(ObserverId, Observer)>>,
    next_observer: Cell<usize>,
}

impl<T: RewardTransport + 'static, C: FrameClock + 'static> SpinController<T, C> {
    pub fn new(transport: T, clock: Rc<C>, config: &WheelConfig) -> Self {
        let fetcher = OutcomeFetcher::new(transport, Rc::clone(&clock));
        Self {
            clock,
            fetcher,
            layout: config.layout,
            spin_duration_ms: config.spin_duration_ms,
            bonus_catalog: config.bonus_events.clone(),
            catalog: RefCell::new(None),
            state: RefCell::new(SessionState::default()),
            reels: RefCell::new(Vec::new()),
            offsets: RefCell::new(Vec::new()),
            bonus_offset: ReelOffset::default(),
            cancel: RefCell::new(CancelFlag::new()),
            last_launch: Cell::new(None),
            rng: RefCell::new(SmallRng::from_entropy()),
            observers: RefCell::new(Vec::new()),
            next_observer: Cell::new(0),
        }
    }

    pub fn with_rng(self, rng: SmallRng) -> Self {
        self.rng.replace(rng);
        self
    }

    // === Queries ===

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn layout(&self) -> ReelLayout {
        self.layout
    }

    pub fn spin_duration_ms(&self) -> f64 {
        self.spin_duration_ms
    }

    pub fn bonus_catalog(&self) -> &[BonusEvent] {
        &self.bonus_catalog
    }

    pub fn fetcher(&self) -> &OutcomeFetcher<T, C> {
        &self.fetcher
    }

    pub fn has_catalog(&self) -> bool {
        self.catalog.borrow().as_ref().is_some_and(|catalog| !catalog.is_empty())
    }

    /// Milliseconds before a plain spin is allowed again.
    pub fn cooldown_remaining(&self) -> Option<f64> {
        self.fetcher.cooldown().remaining(self.clock.now())
    }

    pub fn reel_count(&self) -> usize {
        self.reels.borrow().len()
    }

    pub fn reel_offset(&self, index: usize) -> Option<f64> {
        self.offsets.borrow().get(index).map(ReelOffset::get)
    }

    /// Runs `f` against reel `index`. `f` must not call back into the controller.
    pub fn with_reel<R>(&self, index: usize, f: impl FnOnce(&Reel) -> R) -> Option<R> {
        self.reels.borrow().get(index).map(f)
    }

    pub fn bonus_offset(&self) -> f64 {
        self.bonus_offset.get()
    }

    // === Setup ===

    pub fn set_catalog(&self, catalog: ItemCatalog) {
        info!("Item catalog loaded with {} items", catalog.total_len());
        self.catalog.replace(Some(Rc::new(catalog)));
    }

    pub fn subscribe(&self, observer: impl Fn(&SessionState) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer.get());
        self.next_observer.set(id.0 + 1);
        self.observers.borrow_mut().push((id, Rc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: ObserverId) {
        self.observers.borrow_mut().retain(|(observer, _)| *observer != id);
    }

    // === Transitions ===

    /// Starts a plain spin from `idle`.
    pub fn spin(self: &Rc<Self>) -> Result<SessionRun, SpinError> {
        self.start(Launch::user(SpinVariant::Single))
    }

    /// Starts an equal-odds lucky spin from `idle`. Never cooldown-gated.
    pub fn spin_lucky(self: &Rc<Self>) -> Result<SessionRun, SpinError> {
        self.start(Launch::user(SpinVariant::Lucky))
    }

    /// Starts a fresh session of the same kind straight from a result screen.
    pub fn respin(self: &Rc<Self>) -> Result<SessionRun, SpinError> {
        if !self.state.borrow().is_terminal() {
            return Err(SpinError::Busy);
        }
        let launch = self.last_launch.get().ok_or(SpinError::Busy)?;
        let session = self.prepare(launch)?;
        Ok(self.drive(session))
    }

    /// Back to `idle` from a result screen, dropping the reels.
    pub fn reset(&self) -> Result<(), SpinError> {
        let settled = {
            let state = self.state.borrow();
            state.is_idle() || state.is_terminal()
        };
        if !settled {
            return Err(SpinError::Busy);
        }
        self.settle_idle(None);
        Ok(())
    }

    /// Cancels the running session for good. Nothing is mutated or reported afterwards.
    pub fn shutdown(&self) {
        debug!("Spin controller shutting down");
        self.cancel.borrow().cancel();
        self.observers.borrow_mut().clear();
    }

    fn start(self: &Rc<Self>, launch: Launch) -> Result<SessionRun, SpinError> {
        if !self.state.borrow().is_idle() {
            return Err(SpinError::Busy);
        }
        let session = self.prepare(launch)?;
        Ok(self.drive(session))
    }

    /// Validates a launch and, if it may go ahead, lays out placeholder reels
    /// and enters the matching spinning state.
    fn prepare(&self, launch: Launch) -> Result<Session, SpinError> {
        let catalog = self
            .catalog
            .borrow()
            .clone()
            .filter(|catalog| !catalog.is_empty())
            .ok_or(SpinError::CatalogUnavailable)?;
        self.fetcher
            .check_cooldown(launch.variant, &FetchOptions::bonus(launch.bonus))?;
        self.layout.validate()?;

        let count = launch.variant.reel_count();
        let mut reels = Vec::with_capacity(count);
        let mut plans = Vec::with_capacity(count);
        {
            let mut rng = self.rng.borrow_mut();
            for _ in 0..count {
                let placeholder = catalog.placeholder(&mut *rng).ok_or(SpinError::CatalogUnavailable)?;
                reels.push(build_reel(&catalog, placeholder, &self.layout, &mut *rng)?);
                let jitter = landing_jitter(&mut *rng, self.layout.item_width);
                plans.push(SpinPlan {
                    target: target_offset(&self.layout, jitter),
                    duration_ms: self.spin_duration_ms,
                });
            }
        }

        let cancel = CancelFlag::new();
        self.cancel.replace(cancel.clone()).cancel();
        self.reels.replace(reels);
        self.offsets.replace((0..count).map(|_| ReelOffset::default()).collect());
        self.bonus_offset.set(0.0);
        self.last_launch.set(Some(launch));

        debug!("Starting {:?} session (bonus: {:?})", launch.variant, launch.bonus);
        self.set_state(SessionState::spinning(launch.variant));
        Ok(Session {
            launch,
            cancel,
            catalog,
            plans,
        })
    }

    fn drive(self: &Rc<Self>, first: Session) -> SessionRun {
        let this = Rc::clone(self);
        async move {
            let mut session = first;
            loop {
                let Step::Launch(launch) = this.run(&session).await else {
                    return;
                };
                info!("Bonus hands off to a {:?} spin", launch.variant);
                session = match this.prepare(launch) {
                    Ok(next) => next,
                    Err(err) => {
                        warn!("Bonus spin could not start: {}", err);
                        this.settle_idle(err.notice());
                        return;
                    }
                };
            }
        }
        .boxed_local()
    }

    async fn run(&self, session: &Session) -> Step {
        if session.launch.variant.reel_count() == 1 {
            self.run_single_reel(session).await
        } else {
            self.run_reels(session).await
        }
    }

    async fn run_single_reel(&self, session: &Session) -> Step {
        let Session {
            launch, cancel, plans, ..
        } = session;
        let offset = self.offsets.borrow().first().cloned().unwrap_or_default();
        let Some(plan) = plans.first().copied() else {
            return Step::Done;
        };

        let frame = drive_reel(&*self.clock, &offset, plan, cancel);
        // A granted single spin is its bonus's only request
        let options = FetchOptions {
            is_first_spin: launch.bonus.is_some(),
            ..FetchOptions::bonus(launch.bonus)
        };
        let fetch = async {
            let result = self.fetcher.fetch(launch.variant, options, cancel).await;
            if let Ok(outcome) = &result {
                self.pin_final(0, &outcome.item);
            }
            result
        };
        let (frame, result) = futures::join!(frame, fetch);

        if frame == FrameOutcome::Cancelled || cancel.is_cancelled() {
            debug!("Cancelled session settled without changes");
            return Step::Done;
        }
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.settle_failure(err);
                return Step::Done;
            }
        };

        self.pin_final(0, &outcome.item);
        let item = Rc::clone(&outcome.item);
        let cue = item.rarity().cue();
        debug!("Reconciled {:?} spin on {}", launch.variant, item.texture);

        if outcome.is_recursion {
            info!("Recursion triggered by {}", item.texture);
            self.set_state(SessionState::Recursion {
                item,
                is_new: outcome.is_new,
                status: outcome.recursion,
                privileged_lucky: outcome.privileged_lucky,
                cue,
            });
            return Step::Done;
        }

        if outcome.is_event && launch.variant == SpinVariant::Single {
            info!("Event {} drawn, revealing bonus wheel", item.texture);
            self.set_state(SessionState::Event { item });
            return self.run_bonus(cancel).await;
        }

        let state = if launch.variant.is_lucky() {
            SessionState::LuckyResult {
                item,
                is_new: outcome.is_new,
                recursion: outcome.recursion,
                cue,
            }
        } else {
            SessionState::Result {
                item,
                is_new: outcome.is_new,
                recursion: outcome.recursion,
                cue,
            }
        };
        info!("Spin finished in {}", state.name());
        self.set_state(state);
        Step::Done
    }

    /// Staggered animations, eager fetches: every slot is requested at once
    /// while the reels start one after another.
    async fn run_reels(&self, session: &Session) -> Step {
        let Session {
            launch,
            cancel,
            catalog,
            plans,
        } = session;
        let offsets = self.offsets.borrow().clone();

        let frames = future::join_all(offsets.iter().zip(plans).enumerate().map(|(index, (offset, plan))| {
            let delay = REEL_STAGGER_MS.get(index).copied().unwrap_or(0);
            drive_reel_after(&*self.clock, delay, offset, *plan, cancel)
        }));
        let fetch = async {
            let tally = self
                .fetcher
                .fetch_batch(launch.variant, FetchOptions::bonus(launch.bonus), cancel)
                .await?;
            let slots = tally.finish(catalog, &mut *self.rng.borrow_mut())?;
            for (index, slot) in slots.iter().enumerate() {
                self.pin_final(index, &slot.outcome.item);
            }
            Ok::<_, SpinError>(slots)
        };
        let (frames, result) = futures::join!(frames, fetch);

        if frames.contains(&FrameOutcome::Cancelled) || cancel.is_cancelled() {
            debug!("Cancelled batch settled without changes");
            return Step::Done;
        }
        let slots = match result {
            Ok(slots) => slots,
            Err(err) => {
                self.settle_failure(err);
                return Step::Done;
            }
        };

        let event_trigger = slots.iter().position(|slot| slot.event_trigger);
        for (index, slot) in slots.iter().enumerate() {
            self.pin_final(index, &slot.outcome.item);
        }
        let items: Vec<Rc<Item>> = slots.iter().map(|slot| Rc::clone(&slot.outcome.item)).collect();
        let new_flags = slots.iter().map(|slot| slot.outcome.is_new).collect();
        let cue = best_cue(items.iter().map(|item| &**item));

        let state = if launch.variant == SpinVariant::TripleLucky {
            SessionState::TripleLuckyResult {
                items,
                new_flags,
                event_trigger,
                cue,
            }
        } else {
            SessionState::TripleResult {
                items,
                new_flags,
                event_trigger,
                cue,
            }
        };
        info!(
            "Batch finished in {} with cue {:?}, trigger slot {:?}",
            state.name(),
            cue,
            event_trigger
        );
        self.set_state(state);
        Step::Done
    }

    /// Event reveal, bonus wheel, then the granted spin.
    async fn run_bonus(&self, cancel: &CancelFlag) -> Step {
        self.clock.sleep(EVENT_REVEAL_DELAY_MS).await;
        if cancel.is_cancelled() {
            return Step::Done;
        }

        let drawn = {
            let mut rng = self.rng.borrow_mut();
            draw_bonus_event(&self.bonus_catalog, &mut *rng)
                .cloned()
                .map(|selected| {
                    let strip = build_bonus_strip(&self.bonus_catalog, &selected, &mut *rng);
                    let jitter = landing_jitter(&mut *rng, BONUS_LAYOUT.item_width);
                    (selected, strip, jitter)
                })
        };
        let Some((selected, strip, jitter)) = drawn else {
            warn!("Bonus catalog is empty");
            self.settle_idle(SpinError::ServerRejected(UNKNOWN_BONUS_ERROR.to_string()).notice());
            return Step::Done;
        };

        info!("Bonus wheel drew {}", selected.id);
        self.bonus_offset.set(0.0);
        self.set_state(SessionState::BonusWheel {
            strip,
            selected: selected.clone(),
        });
        let plan = SpinPlan {
            target: target_offset(&BONUS_LAYOUT, jitter),
            duration_ms: BONUS_SPIN_DURATION_MS,
        };
        if drive_reel(&*self.clock, &self.bonus_offset, plan, cancel).await == FrameOutcome::Cancelled {
            return Step::Done;
        }

        let kind = selected.kind();
        self.set_state(SessionState::BonusResult { event: selected });
        self.clock.sleep(BONUS_RESULT_DELAY_MS).await;
        if cancel.is_cancelled() {
            return Step::Done;
        }

        match kind {
            Some(kind) => Step::Launch(Launch::bonus(kind)),
            None => {
                warn!("Bonus wheel landed on an unknown event");
                self.settle_idle(SpinError::ServerRejected(UNKNOWN_BONUS_ERROR.to_string()).notice());
                Step::Done
            }
        }
    }

    fn pin_final(&self, index: usize, item: &Rc<Item>) {
        if let Some(reel) = self.reels.borrow_mut().get_mut(index) {
            reel.pin_final(Rc::clone(item));
        }
    }

    fn settle_failure(&self, err: SpinError) {
        match &err {
            SpinError::Aborted => debug!("Spin aborted, returning to idle"),
            other => warn!("Spin failed: {}", other),
        }
        self.settle_idle(err.notice());
    }

    fn settle_idle(&self, notice: Option<SpinNotice>) {
        self.reels.borrow_mut().clear();
        self.offsets.borrow_mut().clear();
        self.bonus_offset.set(0.0);
        self.set_state(SessionState::Idle { notice });
    }

    fn set_state(&self, state: SessionState) {
        self.state.replace(state.clone());
        let observers: Vec<Observer> = self
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect();
        for observer in observers {
            observer(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{COOLDOWN_MESSAGE, LUCKY_SPIN_ENDPOINT, SPIN_ENDPOINT};
    use crate::error::NoticeKind;
    use crate::fetcher::TransportReply;
    use crate::shared_wheel_game::Rarity;
    use crate::test_support::{item_reply, new_item_reply, Scripted, ScriptedTransport, TestClock};

    type TestController = SpinController<ScriptedTransport, TestClock>;
    type StateLog = Rc<RefCell<Vec<(&'static str, f64)>>>;

    fn catalog() -> ItemCatalog {
        let mut catalog = ItemCatalog::from_regular(vec![
            Item::new("dirt", "Dirt", Rarity::Regular),
            Item::new("cobblestone", "Cobblestone", Rarity::Regular),
            Item::new("oak_log", "Oak Log", Rarity::Regular),
        ]);
        catalog.rare.push(Rc::new(Item::new("rare_gem", "Gem", Rarity::Rare)));
        catalog
    }

    fn setup(transport: ScriptedTransport, config: &WheelConfig) -> (Rc<TestController>, Rc<TestClock>) {
        let clock = Rc::new(TestClock::new());
        let controller =
            SpinController::new(transport, Rc::clone(&clock), config).with_rng(SmallRng::seed_from_u64(11));
        controller.set_catalog(catalog());
        (Rc::new(controller), clock)
    }

    fn bonus_config(id: &str) -> WheelConfig {
        WheelConfig {
            bonus_events: vec![BonusEvent::new(id, "Bonus", "", 1.0)],
            ..WheelConfig::default()
        }
    }

    fn record(controller: &TestController, clock: &Rc<TestClock>) -> StateLog {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (sink, clock) = (Rc::clone(&log), Rc::clone(clock));
        controller.subscribe(move |state| sink.borrow_mut().push((state.name(), clock.now())));
        log
    }

    fn names(log: &StateLog) -> Vec<&'static str> {
        log.borrow().iter().map(|(name, _)| *name).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn result_waits_for_the_full_animation() {
        let transport = ScriptedTransport::with_delay(vec![new_item_reply("emerald")], 100);
        let (controller, clock) = setup(transport, &WheelConfig::default());
        let log = record(&controller, &clock);

        let run = controller.spin().unwrap();
        assert_eq!(controller.state(), SessionState::Spinning);
        assert_eq!(controller.with_reel(0, Reel::len), Some(80));

        let watcher = async {
            clock.sleep(2000).await;
            controller.with_reel(0, |reel| reel.final_item().texture.clone())
        };
        let ((), mid_spin) = futures::join!(run, watcher);
        assert_eq!(mid_spin.as_deref(), Some("emerald"));

        match controller.state() {
            SessionState::Result { item, is_new, .. } => {
                assert_eq!(item.texture, "emerald");
                assert!(is_new);
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(names(&log), ["spinning", "result"]);
        let entered = log.borrow()[1].1;
        assert!((4000.0..4100.0).contains(&entered), "entered at {}", entered);

        assert_eq!(controller.with_reel(0, |reel| reel.final_index()), Some(72));
        let landed = controller.reel_offset(0).unwrap();
        assert!((landed - 72.0 * 80.0).abs() < 40.0);
    }

    #[tokio::test(start_paused = true)]
    async fn instant_replies_never_shorten_the_animation() {
        let transport = ScriptedTransport::new(vec![item_reply("emerald", false)]);
        let (controller, clock) = setup(transport, &WheelConfig::default());
        let log = record(&controller, &clock);

        controller.spin().unwrap().await;

        assert_eq!(names(&log), ["spinning", "result"]);
        assert!(log.borrow()[1].1 >= 4000.0);
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_mid_spin_freezes_everything() {
        let transport = ScriptedTransport::with_delay(vec![item_reply("emerald", false)], 3000);
        let (controller, clock) = setup(transport, &WheelConfig::default());

        let run = controller.spin().unwrap();
        let unmount = async {
            clock.sleep(2000).await;
            let frozen = controller.reel_offset(0);
            controller.shutdown();
            frozen
        };
        let ((), frozen) = futures::join!(run, unmount);
        clock.sleep(5000).await;

        assert!(frozen.unwrap() > 0.0);
        assert_eq!(controller.reel_offset(0), frozen);
        assert_eq!(controller.state(), SessionState::Spinning);
        assert_eq!(controller.fetcher().transport().aborted(), 1);
        assert_eq!(controller.fetcher().transport().completed(), 0);
        assert!(controller.fetcher().cooldown().last_success().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limits_end_in_idle_with_a_notice() {
        let transport = ScriptedTransport::new(vec![
            item_reply("emerald", false),
            Scripted::Reply(TransportReply {
                status: 429,
                body: String::new(),
            }),
        ]);
        let config = WheelConfig {
            spin_duration_ms: 1000.0,
            ..WheelConfig::default()
        };
        let (controller, clock) = setup(transport, &config);

        controller.spin().unwrap().await;
        let success_at = controller.fetcher().cooldown().last_success();
        controller.reset().unwrap();

        // local cooldown: rejected with no state change and no request
        let early = controller.spin();
        assert!(matches!(early, Err(SpinError::Cooldown { remaining_ms: Some(_) })));
        assert_eq!(controller.state(), SessionState::Idle { notice: None });
        assert_eq!(controller.fetcher().transport().calls(), 1);

        clock.sleep(2100).await;
        controller.spin().unwrap().await;
        match controller.state() {
            SessionState::Idle { notice: Some(notice) } => {
                assert_eq!(notice.kind, NoticeKind::Cooldown);
                assert_eq!(notice.message, COOLDOWN_MESSAGE);
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(controller.reel_count(), 0);
        assert_eq!(controller.fetcher().cooldown().last_success(), success_at);
    }

    #[tokio::test(start_paused = true)]
    async fn network_failures_surface_a_notice() {
        let transport = ScriptedTransport::new(vec![Scripted::Unreachable]);
        let (controller, _clock) = setup(transport, &WheelConfig::default());

        controller.spin().unwrap().await;

        match controller.state() {
            SessionState::Idle { notice: Some(notice) } => assert_eq!(notice.kind, NoticeKind::NetworkUnavailable),
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(controller.reel_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_end_silently() {
        let transport = ScriptedTransport::new(vec![Scripted::Hang]);
        let (controller, clock) = setup(transport, &WheelConfig::default());

        controller.spin().unwrap().await;

        assert!(clock.now() >= 15_000.0);
        assert_eq!(controller.state(), SessionState::Idle { notice: None });
        assert_eq!(controller.fetcher().transport().aborted(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_rejections_leave_the_state_alone() {
        let clock = Rc::new(TestClock::new());
        let bare = Rc::new(SpinController::new(
            ScriptedTransport::new(vec![]),
            Rc::clone(&clock),
            &WheelConfig::default(),
        ));
        assert!(matches!(bare.spin(), Err(SpinError::CatalogUnavailable)));
        assert!(bare.state().is_idle());
        assert_eq!(bare.fetcher().transport().calls(), 0);

        let (controller, _clock) = setup(ScriptedTransport::new(vec![item_reply("dirt", false)]), &WheelConfig::default());
        let run = controller.spin().unwrap();
        assert!(matches!(controller.spin(), Err(SpinError::Busy)));
        assert!(matches!(controller.respin(), Err(SpinError::Busy)));
        assert_eq!(controller.reset(), Err(SpinError::Busy));
        assert_eq!(controller.state(), SessionState::Spinning);
        run.await;
    }

    #[tokio::test(start_paused = true)]
    async fn respin_skips_idle() {
        let transport = ScriptedTransport::new(vec![item_reply("emerald", false), item_reply("diamond", false)]);
        let (controller, clock) = setup(transport, &WheelConfig::default());
        let log = record(&controller, &clock);

        controller.spin().unwrap().await;
        controller.respin().unwrap().await;

        assert_eq!(names(&log), ["spinning", "result", "spinning", "result"]);
        match controller.state() {
            SessionState::Result { item, .. } => assert_eq!(item.texture, "diamond"),
            other => panic!("unexpected state {:?}", other),
        }

        controller.reset().unwrap();
        assert!(matches!(controller.respin(), Err(SpinError::Busy)));
    }

    #[tokio::test(start_paused = true)]
    async fn events_hand_off_to_a_free_five_reel_spin() {
        // slot 0 draws an event first and is retried
        let mut replies = vec![item_reply("event_bonus", true), item_reply("event_bonus", true)];
        replies.extend((0..5).map(|slot| item_reply(&format!("slot{}", slot), false)));
        let (controller, clock) = setup(ScriptedTransport::new(replies), &bonus_config("triple_spin"));
        let log = record(&controller, &clock);

        controller.spin().unwrap().await;

        assert_eq!(
            names(&log),
            ["spinning", "event", "bonusWheel", "bonusResult", "tripleSpinning", "tripleResult"]
        );
        let finished_at = log.borrow()[5].1;
        assert!(finished_at >= 4000.0 + 1500.0 + 3500.0 + 1500.0 + 4000.0 + 800.0);

        match controller.state() {
            SessionState::TripleResult {
                items,
                new_flags,
                event_trigger,
                cue,
            } => {
                let textures: Vec<&str> = items.iter().map(|item| item.texture.as_str()).collect();
                assert_eq!(textures, ["slot0", "slot1", "slot2", "slot3", "slot4"]);
                assert_eq!(new_flags, [false; 5]);
                assert_eq!(event_trigger, Some(1));
                assert_eq!(cue, RewardCue::Regular);
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(controller.reel_count(), 5);

        let transport = controller.fetcher().transport();
        assert!(transport.paths().iter().all(|path| path == SPIN_ENDPOINT));
        let bodies = transport.bodies();
        assert_eq!(bodies.len(), 7);
        assert!(bodies[0].is_none());
        for body in &bodies[1..] {
            let tagged = body.as_ref().unwrap();
            assert!(tagged.bonus);
            assert_eq!(tagged.event_type, "triple_spin");
            assert!(!tagged.is_first_spin);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn five_event_draws_fill_the_slot_with_a_regular_item() {
        let mut replies = vec![
            item_reply("event_bonus", true),
            item_reply("slot0", false),
            item_reply("slot1", false),
            item_reply("event_bonus", true),
            item_reply("slot3", false),
            item_reply("slot4", false),
        ];
        replies.extend((0..4).map(|_| item_reply("event_bonus", true)));
        replies.push(item_reply("never_requested", false));
        let transport = ScriptedTransport::with_delay(replies, 100);
        let (controller, _clock) = setup(transport, &bonus_config("triple_spin"));

        controller.spin().unwrap().await;

        let filler = match controller.state() {
            SessionState::TripleResult {
                items, event_trigger, ..
            } => {
                assert_eq!(items[1].texture, "slot1");
                assert_eq!(event_trigger, Some(0));
                assert_eq!(items[2].rarity(), Rarity::Regular);
                assert!(["dirt", "cobblestone", "oak_log"].contains(&items[2].texture.as_str()));
                Rc::clone(&items[2])
            }
            other => panic!("unexpected state {:?}", other),
        };
        assert_eq!(controller.with_reel(2, |reel| Rc::clone(reel.final_item())), Some(filler));

        // one event spin, five first attempts, four retries for slot 2
        let transport = controller.fetcher().transport();
        assert_eq!(transport.calls(), 10);
        assert!(transport.bodies()[1..].iter().all(|body| !body.as_ref().unwrap().is_first_spin));
    }

    #[tokio::test(start_paused = true)]
    async fn triple_lucky_picks_the_best_cue() {
        let replies = vec![
            item_reply("event_bonus", true),
            item_reply("dirt", false),
            item_reply("insane_star", false),
            item_reply("rare_gem", false),
        ];
        let (controller, _clock) = setup(ScriptedTransport::new(replies), &bonus_config("triple_lucky_spin"));

        controller.spin().unwrap().await;

        match controller.state() {
            SessionState::TripleLuckyResult { items, cue, .. } => {
                assert_eq!(items.len(), 3);
                assert_eq!(cue, RewardCue::Insane);
            }
            other => panic!("unexpected state {:?}", other),
        }
        let paths = controller.fetcher().transport().paths();
        assert!(paths[1..].iter().all(|path| path == LUCKY_SPIN_ENDPOINT));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_bonus_events_end_in_idle() {
        let transport = ScriptedTransport::new(vec![item_reply("event_bonus", true)]);
        let (controller, _clock) = setup(transport, &bonus_config("mystery_box"));

        controller.spin().unwrap().await;

        match controller.state() {
            SessionState::Idle { notice: Some(notice) } => {
                assert_eq!(notice.kind, NoticeKind::ServerRejected);
                assert_eq!(notice.message, UNKNOWN_BONUS_ERROR);
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(controller.fetcher().transport().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recursion_then_free_lucky_spin() {
        let recursion = Scripted::Reply(TransportReply {
            status: 200,
            body: r#"{"result":{"texture":"recursion_gold","name":"Recursion"},"isNew":false,
                "isRecursion":true,"recursionStatus":{"active":true,"luckySpinsRemaining":10}}"#
                .to_string(),
        });
        let lucky = Scripted::Reply(TransportReply {
            status: 200,
            body: r#"{"result":{"texture":"event_bonus","name":"Bonus"},"isNew":false,"isEvent":true,
                "isLuckySpin":true,"recursionStatus":{"active":true,"luckySpinsRemaining":9}}"#
                .to_string(),
        });
        let transport = ScriptedTransport::new(vec![recursion, lucky]);
        let (controller, _clock) = setup(transport, &WheelConfig::default());

        controller.spin().unwrap().await;
        match controller.state() {
            SessionState::Recursion { status, .. } => {
                assert_eq!(status.unwrap().lucky_spins_remaining, 10);
            }
            other => panic!("unexpected state {:?}", other),
        }

        controller.reset().unwrap();
        controller.spin_lucky().unwrap().await;
        match controller.state() {
            SessionState::LuckyResult { item, recursion, .. } => {
                assert_eq!(item.texture, "event_bonus");
                assert_eq!(recursion.map(|status| status.lucky_spins_remaining), Some(9));
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(controller.fetcher().transport().paths()[1], LUCKY_SPIN_ENDPOINT);
    }
}
