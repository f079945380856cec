//! Behavior tracker: passive listener plus on-demand reporting.
//!
//! A tracker attaches one handler to an [`EventSource`] when it is built and
//! keeps listening until [`stop`](BehaviorTracker::stop) or drop. Everything
//! runs on the host's event-loop thread, so state lives in `Rc<RefCell<_>>`
//! and no locks are involved.

use crate::collector::{EventHandler, EventSource, InteractionEvent, ListenerId};
use crate::config::{Config, ScoringThresholds, TrackerConfig};
use crate::core::clock::{Clock, SystemClock};
use crate::core::report::BehavioralReport;
use crate::core::session::BehaviorSession;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{info, trace};
use uuid::Uuid;

/// Lifecycle of a tracker. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Monitoring,
    Stopped,
}

/// Passive interaction monitor owning one [`BehaviorSession`].
///
/// Construct one per application and pass it where reports are needed.
pub struct BehaviorTracker {
    /// Where interaction events come from
    source: Rc<dyn EventSource>,
    /// Registration to detach on stop
    listener: Cell<Option<ListenerId>>,
    /// Shared with the attached handler
    session: Rc<RefCell<BehaviorSession>>,
    /// Shared with the attached handler
    state: Rc<Cell<TrackerState>>,
    /// Session timing source
    clock: Rc<dyn Clock>,
    /// Report sizing
    config: TrackerConfig,
    /// Scoring thresholds
    thresholds: ScoringThresholds,
}

impl BehaviorTracker {
    /// Start monitoring `source` using the system clock.
    pub fn new(source: Rc<dyn EventSource>, config: &Config) -> Self {
        Self::with_clock(source, config, Rc::new(SystemClock))
    }

    /// Start monitoring `source`, timing the session with `clock`.
    pub fn with_clock(source: Rc<dyn EventSource>, config: &Config, clock: Rc<dyn Clock>) -> Self {
        let session = Rc::new(RefCell::new(BehaviorSession::new(
            &config.tracker,
            clock.now(),
        )));
        let state = Rc::new(Cell::new(TrackerState::Idle));

        let tracker = Self {
            source,
            listener: Cell::new(None),
            session,
            state,
            clock,
            config: config.tracker.clone(),
            thresholds: config.scoring.clone(),
        };
        tracker.start();
        tracker
    }

    fn start(&self) {
        let session = Rc::clone(&self.session);
        let state = Rc::clone(&self.state);

        let handler: EventHandler = Rc::new(move |event: &InteractionEvent| {
            if state.get() != TrackerState::Monitoring {
                return;
            }
            // Never fail inside a host callback; a dropped sample is fine
            match session.try_borrow_mut() {
                Ok(mut session) => session.record(event),
                Err(_) => trace!(kind = ?event.kind(), "session busy, event dropped"),
            }
        });

        self.listener.set(Some(self.source.attach(handler)));
        self.state.set(TrackerState::Monitoring);
        info!(session_id = %self.session_id(), "behavior tracking started");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TrackerState {
        self.state.get()
    }

    /// Identifier of the current session; changes on [`clear`](Self::clear).
    pub fn session_id(&self) -> Uuid {
        self.session.borrow().session_id()
    }

    /// Record a navigation reported by the host application.
    pub fn on_page_visited(&self, url: &str) {
        if self.state.get() != TrackerState::Monitoring {
            return;
        }
        if let Ok(mut session) = self.session.try_borrow_mut() {
            session.visit_page(url);
        }
    }

    /// Build a report from the current state without mutating it.
    pub fn snapshot(&self) -> BehavioralReport {
        BehavioralReport::build(
            &self.session.borrow(),
            self.clock.now(),
            &self.config,
            &self.thresholds,
        )
    }

    /// Reset all counters and buffers and restart the session clock.
    pub fn clear(&self) {
        let now = self.clock.now();
        self.session.borrow_mut().reset(now);
        info!(session_id = %self.session_id(), "behavior session cleared");
    }

    /// Detach from the event source. Safe to call more than once.
    ///
    /// Once this returns no event reaches the session, including an event
    /// whose dispatch is already in progress.
    pub fn stop(&self) {
        if self.state.replace(TrackerState::Stopped) == TrackerState::Stopped {
            return;
        }
        if let Some(id) = self.listener.take() {
            self.source.detach(id);
        }
        info!(session_id = %self.session_id(), "behavior tracking stopped");
    }
}

impl Drop for BehaviorTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Build a tracker over `source` with default configuration.
pub fn create_tracker(source: Rc<dyn EventSource>) -> BehaviorTracker {
    BehaviorTracker::new(source, &Config::default())
}
