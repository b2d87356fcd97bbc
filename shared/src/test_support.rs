//! Virtual-time clock and scripted transports for engine tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::TransportError;
use crate::fetcher::{RewardTransport, TransportReply};
use crate::frame::FrameClock;
use crate::shared_wheel_game::SpinRequestBody;

pub const FRAME_MS: u64 = 16;

/// Frames every 16ms of tokio time. Use with `start_paused = true`.
pub struct TestClock {
    origin: Instant,
}

impl TestClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for TestClock {
    async fn next_frame(&self) -> f64 {
        tokio::time::sleep(Duration::from_millis(FRAME_MS)).await;
        self.now()
    }

    async fn sleep(&self, ms: u32) {
        tokio::time::sleep(Duration::from_millis(ms as u64)).await;
    }

    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

pub enum Scripted {
    Reply(TransportReply),
    Unreachable,
    /// Never answers; only a timeout or cancel ends it.
    Hang,
}

pub fn item_reply(texture: &str, is_event: bool) -> Scripted {
    Scripted::Reply(TransportReply {
        status: 200,
        body: format!(
            r#"{{"result":{{"texture":"{0}","name":"{0}"}},"isNew":false,"isEvent":{1}}}"#,
            texture, is_event
        ),
    })
}

pub fn new_item_reply(texture: &str) -> Scripted {
    Scripted::Reply(TransportReply {
        status: 200,
        body: format!(r#"{{"result":{{"texture":"{0}","name":"{0}"}},"isNew":true}}"#, texture),
    })
}

#[derive(Default)]
struct TransportLog {
    calls: Cell<usize>,
    completed: Cell<usize>,
    aborted: Cell<usize>,
    paths: RefCell<Vec<String>>,
    bodies: RefCell<Vec<Option<SpinRequestBody>>>,
}

/// Counts a request as aborted when dropped before it answered.
struct InFlight {
    log: Rc<TransportLog>,
    done: bool,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.done {
            self.log.completed.set(self.log.completed.get() + 1);
        } else {
            self.log.aborted.set(self.log.aborted.get() + 1);
        }
    }
}

/// Answers requests from a queue, in call order.
#[derive(Clone)]
pub struct ScriptedTransport {
    replies: Rc<RefCell<VecDeque<Scripted>>>,
    delay_ms: u64,
    log: Rc<TransportLog>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Scripted>) -> Self {
        Self::with_delay(replies, 0)
    }

    pub fn with_delay(replies: Vec<Scripted>, delay_ms: u64) -> Self {
        Self {
            replies: Rc::new(RefCell::new(replies.into())),
            delay_ms,
            log: Rc::new(TransportLog::default()),
        }
    }

    pub fn calls(&self) -> usize {
        self.log.calls.get()
    }

    pub fn completed(&self) -> usize {
        self.log.completed.get()
    }

    pub fn aborted(&self) -> usize {
        self.log.aborted.get()
    }

    pub fn paths(&self) -> Vec<String> {
        self.log.paths.borrow().clone()
    }

    pub fn bodies(&self) -> Vec<Option<SpinRequestBody>> {
        self.log.bodies.borrow().clone()
    }
}

impl RewardTransport for ScriptedTransport {
    async fn post(&self, path: &str, body: Option<&SpinRequestBody>) -> Result<TransportReply, TransportError> {
        self.log.calls.set(self.log.calls.get() + 1);
        self.log.paths.borrow_mut().push(path.to_string());
        self.log.bodies.borrow_mut().push(body.cloned());
        let scripted = self.replies.borrow_mut().pop_front().unwrap_or(Scripted::Hang);

        let mut in_flight = InFlight {
            log: Rc::clone(&self.log),
            done: false,
        };
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        let result = match scripted {
            Scripted::Reply(reply) => Ok(reply),
            Scripted::Unreachable => Err(TransportError("connection refused".into())),
            Scripted::Hang => std::future::pending().await,
        };
        in_flight.done = true;
        result
    }
}
