//! Frame-driven reel animation.
//!
//! Everything here is single-threaded: offsets are plain cells written by the
//! driver and read by the renderer on its own frames.

use futures::future::{AbortHandle, AbortRegistration, Abortable};
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use crate::easing::offset_at;

/// Source of animation frames and timers.
pub trait FrameClock {
    /// Resolves on the next animation frame with its timestamp in milliseconds.
    fn next_frame(&self) -> impl Future<Output = f64>;

    fn sleep(&self, ms: u32) -> impl Future<Output = ()>;

    /// Milliseconds on the same timeline as frame timestamps.
    fn now(&self) -> f64;
}

/// Per-reel scroll offset in pixels
#[derive(Debug, Clone, Default)]
pub struct ReelOffset(Rc<Cell<f64>>);

impl ReelOffset {
    pub fn get(&self) -> f64 {
        self.0.get()
    }

    pub fn set(&self, offset: f64) {
        self.0.set(offset);
    }
}

#[derive(Default)]
struct CancelState {
    cancelled: Cell<bool>,
    handles: RefCell<Vec<AbortHandle>>,
}

/// Session-scoped cancellation.
///
/// Cancelling flips the flag seen by frame callbacks and aborts every future
/// registered through [`CancelFlag::guard`], which drops (and so aborts) any
/// request they own.
#[derive(Clone, Default)]
pub struct CancelFlag(Rc<CancelState>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.get()
    }

    pub fn cancel(&self) {
        if self.0.cancelled.replace(true) {
            return;
        }
        for handle in self.0.handles.borrow_mut().drain(..) {
            handle.abort();
        }
    }

    /// Wraps `future` so that cancelling this flag aborts it.
    pub fn guard<F: Future>(&self, future: F) -> Abortable<F> {
        let (handle, registration): (AbortHandle, AbortRegistration) = AbortHandle::new_pair();
        if self.is_cancelled() {
            handle.abort();
        } else {
            self.0.handles.borrow_mut().push(handle);
        }
        Abortable::new(future, registration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Completed,
    Cancelled,
}

/// One reel's animation target, fixed for the whole spin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinPlan {
    pub target: f64,
    pub duration_ms: f64,
}

/// Drives `sink` from 0 to `plan.target` over `plan.duration_ms`.
///
/// The clock is anchored to the first frame this reel sees, so reels started
/// at different times keep independent timelines. Returns `Cancelled` without
/// touching `sink` again once `cancel` is observed.
pub async fn drive_reel<C: FrameClock>(
    clock: &C,
    sink: &ReelOffset,
    plan: SpinPlan,
    cancel: &CancelFlag,
) -> FrameOutcome {
    if cancel.is_cancelled() {
        return FrameOutcome::Cancelled;
    }
    sink.set(0.0);

    let mut started_at: Option<f64> = None;
    loop {
        let timestamp = clock.next_frame().await;
        if cancel.is_cancelled() {
            return FrameOutcome::Cancelled;
        }

        let start = *started_at.get_or_insert(timestamp);
        let elapsed = timestamp - start;
        sink.set(offset_at(elapsed, plan.duration_ms, plan.target));

        if elapsed >= plan.duration_ms {
            return FrameOutcome::Completed;
        }
    }
}

/// Like [`drive_reel`], after waiting `delay_ms` for a staggered start.
pub async fn drive_reel_after<C: FrameClock>(
    clock: &C,
    delay_ms: u32,
    sink: &ReelOffset,
    plan: SpinPlan,
    cancel: &CancelFlag,
) -> FrameOutcome {
    if delay_ms > 0 {
        clock.sleep(delay_ms).await;
    }
    drive_reel(clock, sink, plan, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestClock;

    #[tokio::test(start_paused = true)]
    async fn reaches_target_after_duration() {
        let clock = TestClock::new();
        let sink = ReelOffset::default();
        let plan = SpinPlan { target: 5760.0, duration_ms: 4000.0 };

        let outcome = drive_reel(&clock, &sink, plan, &CancelFlag::new()).await;

        assert_eq!(outcome, FrameOutcome::Completed);
        assert_eq!(sink.get(), 5760.0);
        assert!(clock.now() >= 4000.0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_freezes_the_offset() {
        let clock = TestClock::new();
        let sink = ReelOffset::default();
        let cancel = CancelFlag::new();
        let plan = SpinPlan { target: 1000.0, duration_ms: 4000.0 };

        let canceller = async {
            clock.sleep(2000).await;
            cancel.cancel();
            sink.get()
        };
        let (outcome, frozen) = futures::join!(drive_reel(&clock, &sink, plan, &cancel), canceller);

        assert_eq!(outcome, FrameOutcome::Cancelled);
        assert!(frozen > 0.0 && frozen < 1000.0);
        clock.sleep(5000).await;
        assert_eq!(sink.get(), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn staggered_reels_keep_their_own_timelines() {
        let clock = TestClock::new();
        let sinks = [ReelOffset::default(), ReelOffset::default()];
        let plan = SpinPlan { target: 100.0, duration_ms: 1000.0 };
        let cancel = CancelFlag::new();

        let first = async {
            drive_reel_after(&clock, 0, &sinks[0], plan, &cancel).await;
            clock.now()
        };
        let second = async {
            drive_reel_after(&clock, 400, &sinks[1], plan, &cancel).await;
            clock.now()
        };
        let (first_done, second_done) = futures::join!(first, second);

        assert!(first_done >= 1000.0);
        assert!(second_done >= 1400.0);
        assert!(second_done > first_done);
    }

    #[test]
    fn guard_aborts_futures_registered_after_cancel() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let guarded = cancel.guard(async { 5 });
        assert!(futures::executor::block_on(guarded).is_err());
    }
}
