use serde::{Deserialize, Serialize};
use std::fmt;

/// The four input categories the pipeline knows how to intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventCategory {
    PointerMove,
    Wheel,
    TouchMove,
    Scroll,
}

impl EventCategory {
    pub const ALL: [EventCategory; 4] = [
        EventCategory::PointerMove,
        EventCategory::Wheel,
        EventCategory::TouchMove,
        EventCategory::Scroll,
    ];

    /// Wheel and scroll events carry X/Y/Z deltas that can be accumulated.
    pub fn carries_deltas(self) -> bool {
        matches!(self, EventCategory::Wheel | EventCategory::Scroll)
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventCategory::PointerMove => write!(f, "pointer-move"),
            EventCategory::Wheel => write!(f, "wheel"),
            EventCategory::TouchMove => write!(f, "touch-move"),
            EventCategory::Scroll => write!(f, "scroll"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeltaMode {
    #[default]
    Pixel,
    Line,
    Page,
}

/// Scroll distance reported by a wheel or scroll event.
///
/// Components are optional because some sources only report a subset of axes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WheelDelta {
    pub delta_x: Option<f64>,
    pub delta_y: Option<f64>,
    pub delta_z: Option<f64>,
    pub delta_mode: DeltaMode,
}

impl WheelDelta {
    pub fn new(delta_x: f64, delta_y: f64, delta_z: f64) -> Self {
        Self {
            delta_x: Some(delta_x),
            delta_y: Some(delta_y),
            delta_z: Some(delta_z),
            delta_mode: DeltaMode::Pixel,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    #[default]
    Mouse,
    Pen,
    Touch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerMove {
    pub x: f64,
    pub y: f64,
    pub pointer_id: u32,
    pub pointer_kind: PointerKind,
    /// Bitmask of pressed buttons (bit 0 = primary).
    pub buttons: u16,
    pub pressure: f32,
    pub active_modifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchPoint {
    pub identifier: u32,
    pub x: f64,
    pub y: f64,
    pub force: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchMove {
    pub touches: Vec<TouchPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventPayload {
    PointerMove(PointerMove),
    Wheel(WheelDelta),
    TouchMove(TouchMove),
    Scroll(WheelDelta),
}

/// A raw input event as observed on the event source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Monotonic timestamp in milliseconds.
    pub timestamp_ms: f64,
    pub payload: EventPayload,
}

impl RawEvent {
    pub fn new(timestamp_ms: f64, payload: EventPayload) -> Self {
        Self {
            timestamp_ms,
            payload,
        }
    }

    /// Mouse pointer move at `(x, y)` with no buttons held.
    pub fn pointer_move(timestamp_ms: f64, x: f64, y: f64) -> Self {
        Self::new(
            timestamp_ms,
            EventPayload::PointerMove(PointerMove {
                x,
                y,
                pointer_id: 1,
                pointer_kind: PointerKind::Mouse,
                buttons: 0,
                pressure: 0.0,
                active_modifiers: Vec::new(),
            }),
        )
    }

    pub fn wheel(timestamp_ms: f64, delta_x: f64, delta_y: f64, delta_z: f64) -> Self {
        Self::new(
            timestamp_ms,
            EventPayload::Wheel(WheelDelta::new(delta_x, delta_y, delta_z)),
        )
    }

    pub fn scroll(timestamp_ms: f64, delta_x: f64, delta_y: f64, delta_z: f64) -> Self {
        Self::new(
            timestamp_ms,
            EventPayload::Scroll(WheelDelta::new(delta_x, delta_y, delta_z)),
        )
    }

    pub fn touch_move(timestamp_ms: f64, touches: Vec<TouchPoint>) -> Self {
        Self::new(timestamp_ms, EventPayload::TouchMove(TouchMove { touches }))
    }

    pub fn category(&self) -> EventCategory {
        match self.payload {
            EventPayload::PointerMove(_) => EventCategory::PointerMove,
            EventPayload::Wheel(_) => EventCategory::Wheel,
            EventPayload::TouchMove(_) => EventCategory::TouchMove,
            EventPayload::Scroll(_) => EventCategory::Scroll,
        }
    }

    /// Delta components for wheel and scroll events, `None` for everything else.
    pub fn deltas(&self) -> Option<&WheelDelta> {
        match &self.payload {
            EventPayload::Wheel(delta) | EventPayload::Scroll(delta) => Some(delta),
            _ => None,
        }
    }
}

/// Running sum of wheel/scroll deltas between two deliveries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulatedDeltas {
    pub delta_x: f64,
    pub delta_y: f64,
    pub delta_z: f64,
}

impl AccumulatedDeltas {
    pub const ZERO: AccumulatedDeltas = AccumulatedDeltas {
        delta_x: 0.0,
        delta_y: 0.0,
        delta_z: 0.0,
    };

    /// Adds whichever components are present; missing ones contribute nothing.
    pub fn add(&mut self, delta: &WheelDelta) {
        if let Some(x) = delta.delta_x {
            self.delta_x += x;
        }
        if let Some(y) = delta.delta_y {
            self.delta_y += y;
        }
        if let Some(z) = delta.delta_z {
            self.delta_z += z;
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}
