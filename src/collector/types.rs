//! Interaction event types delivered to the behavior tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event type tag, as reported in event sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    KeyDown,
    KeyUp,
    Click,
    MouseMove,
    Scroll,
    Focus,
    Blur,
    Paste,
    Copy,
}

/// One user interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InteractionEvent {
    KeyDown {
        timestamp: DateTime<Utc>,
        key: String,
    },
    KeyUp {
        timestamp: DateTime<Utc>,
        key: String,
    },
    Click {
        timestamp: DateTime<Utc>,
        x: f64,
        y: f64,
        button: i16,
    },
    MouseMove {
        timestamp: DateTime<Utc>,
        x: f64,
        y: f64,
    },
    Scroll {
        timestamp: DateTime<Utc>,
        scroll_y: f64,
    },
    Focus {
        timestamp: DateTime<Utc>,
    },
    Blur {
        timestamp: DateTime<Utc>,
    },
    Paste {
        timestamp: DateTime<Utc>,
    },
    Copy {
        timestamp: DateTime<Utc>,
    },
}

impl InteractionEvent {
    pub fn key_down(timestamp: DateTime<Utc>, key: impl Into<String>) -> Self {
        Self::KeyDown {
            timestamp,
            key: key.into(),
        }
    }

    pub fn click(timestamp: DateTime<Utc>, x: f64, y: f64) -> Self {
        Self::Click {
            timestamp,
            x,
            y,
            button: 0,
        }
    }

    pub fn mouse_move(timestamp: DateTime<Utc>, x: f64, y: f64) -> Self {
        Self::MouseMove { timestamp, x, y }
    }

    pub fn scroll(timestamp: DateTime<Utc>, scroll_y: f64) -> Self {
        Self::Scroll {
            timestamp,
            scroll_y,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::KeyDown { timestamp, .. }
            | Self::KeyUp { timestamp, .. }
            | Self::Click { timestamp, .. }
            | Self::MouseMove { timestamp, .. }
            | Self::Scroll { timestamp, .. }
            | Self::Focus { timestamp }
            | Self::Blur { timestamp }
            | Self::Paste { timestamp }
            | Self::Copy { timestamp } => *timestamp,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::KeyDown { .. } => EventKind::KeyDown,
            Self::KeyUp { .. } => EventKind::KeyUp,
            Self::Click { .. } => EventKind::Click,
            Self::MouseMove { .. } => EventKind::MouseMove,
            Self::Scroll { .. } => EventKind::Scroll,
            Self::Focus { .. } => EventKind::Focus,
            Self::Blur { .. } => EventKind::Blur,
            Self::Paste { .. } => EventKind::Paste,
            Self::Copy { .. } => EventKind::Copy,
        }
    }
}
