//! Interaction event sources.
//!
//! The tracker registers a single handler with an [`EventSource`]. Browsers
//! use the DOM-backed source; native hosts and tests push events through a
//! [`LocalEventBus`].

pub mod types;

#[cfg(all(target_arch = "wasm32", feature = "browser"))]
pub mod dom;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub use types::{EventKind, InteractionEvent};

#[cfg(all(target_arch = "wasm32", feature = "browser"))]
pub use dom::DomEventSource;

/// Callback invoked for every delivered event.
pub type EventHandler = Rc<dyn Fn(&InteractionEvent)>;

/// DOM event types a browser source listens to, and whether each listener
/// is registered passive. Only the high-frequency ones are.
pub const DOM_EVENT_TYPES: [(&str, bool); 9] = [
    ("keydown", false),
    ("keyup", false),
    ("click", false),
    ("mousemove", true),
    ("scroll", true),
    ("focus", false),
    ("blur", false),
    ("paste", false),
    ("copy", false),
];

/// Registration handle returned by [`EventSource::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Something that delivers interaction events on the host's main thread.
pub trait EventSource {
    /// Start delivering events to `handler`.
    fn attach(&self, handler: EventHandler) -> ListenerId;

    /// Stop delivering events to the handler registered as `id`.
    ///
    /// Unknown ids are ignored.
    fn detach(&self, id: ListenerId);
}

/// In-process event source driven by explicit [`dispatch`](Self::dispatch) calls.
#[derive(Default)]
pub struct LocalEventBus {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, EventHandler)>>,
}

impl LocalEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every attached handler.
    pub fn dispatch(&self, event: &InteractionEvent) {
        // Snapshot so handlers may attach/detach while being called
        let handlers: Vec<EventHandler> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl EventSource for LocalEventBus {
    fn attach(&self, handler: EventHandler) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, handler));
        id
    }

    fn detach(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }
}
