//! DOM event source for wasm32 browser builds.

use super::{EventHandler, EventSource, InteractionEvent, ListenerId, DOM_EVENT_TYPES};
use chrono::Utc;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{AddEventListenerOptions, Event, KeyboardEvent, MouseEvent, Window};

type DomListener = (&'static str, Closure<dyn FnMut(Event)>);

/// Listens on the page's window.
pub struct DomEventSource {
    window: Window,
    next_id: Cell<u64>,
    attached: RefCell<HashMap<ListenerId, Vec<DomListener>>>,
}

impl DomEventSource {
    pub fn new() -> Option<Self> {
        Some(Self {
            window: web_sys::window()?,
            next_id: Cell::new(0),
            attached: RefCell::new(HashMap::new()),
        })
    }
}

/// Convert a DOM event into an interaction event.
fn convert(window: &Window, event_type: &str, event: &Event) -> Option<InteractionEvent> {
    let timestamp = Utc::now();
    let key = || {
        event
            .dyn_ref::<KeyboardEvent>()
            .map(KeyboardEvent::key)
            .unwrap_or_default()
    };

    let converted = match event_type {
        "keydown" => InteractionEvent::KeyDown {
            timestamp,
            key: key(),
        },
        "keyup" => InteractionEvent::KeyUp {
            timestamp,
            key: key(),
        },
        "click" => {
            let mouse = event.dyn_ref::<MouseEvent>()?;
            InteractionEvent::Click {
                timestamp,
                x: f64::from(mouse.client_x()),
                y: f64::from(mouse.client_y()),
                button: mouse.button(),
            }
        }
        "mousemove" => {
            let mouse = event.dyn_ref::<MouseEvent>()?;
            InteractionEvent::mouse_move(
                timestamp,
                f64::from(mouse.client_x()),
                f64::from(mouse.client_y()),
            )
        }
        "scroll" => InteractionEvent::scroll(timestamp, window.scroll_y().unwrap_or(0.0)),
        "focus" => InteractionEvent::Focus { timestamp },
        "blur" => InteractionEvent::Blur { timestamp },
        "paste" => InteractionEvent::Paste { timestamp },
        "copy" => InteractionEvent::Copy { timestamp },
        _ => return None,
    };
    Some(converted)
}

impl EventSource for DomEventSource {
    fn attach(&self, handler: EventHandler) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let mut listeners = Vec::with_capacity(DOM_EVENT_TYPES.len());
        for (event_type, passive) in DOM_EVENT_TYPES {
            let handler = handler.clone();
            let window = self.window.clone();
            let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                if let Some(event) = convert(&window, event_type, &event) {
                    handler(&event);
                }
            });
            let options = AddEventListenerOptions::new();
            options.set_passive(passive);
            if self
                .window
                .add_event_listener_with_callback_and_add_event_listener_options(
                    event_type,
                    closure.as_ref().unchecked_ref(),
                    &options,
                )
                .is_ok()
            {
                listeners.push((event_type, closure));
            }
        }

        self.attached.borrow_mut().insert(id, listeners);
        id
    }

    fn detach(&self, id: ListenerId) {
        let Some(listeners) = self.attached.borrow_mut().remove(&id) else {
            return;
        };
        for (event_type, closure) in listeners {
            let _ = self
                .window
                .remove_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref());
        }
    }
}

impl Drop for DomEventSource {
    fn drop(&mut self) {
        let ids: Vec<ListenerId> = self.attached.borrow().keys().copied().collect();
        for id in ids {
            self.detach(id);
        }
    }
}
