//! Pinch-to-zoom mapping.
//!
//! The camera zoom is a scalar in `[0, 1]`. Gestures are translated into a
//! signed delta using a per-platform [`ZoomSensitivity`], then accumulated
//! and clamped by [`ZoomLevel`].

use serde::{Deserialize, Serialize};

/// Platform whose gesture recogniser produced the pinch events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Ios,
    Android,
}

/// Multipliers applied to pinch velocity when zooming in and out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomSensitivity {
    pub zoom_in: f64,
    pub zoom_out: f64,
}

impl ZoomSensitivity {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Ios => Self {
                zoom_in: 0.01,
                zoom_out: 0.02,
            },
            Platform::Android => Self {
                zoom_in: 25.0,
                zoom_out: 50.0,
            },
        }
    }
}

impl Default for ZoomSensitivity {
    fn default() -> Self {
        Self::for_platform(Platform::default())
    }
}

/// One pinch update as reported by the gesture recogniser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchGesture {
    pub velocity: f64,
    pub scale: f64,
}

// Raw recogniser velocities are scaled down by this factor before use.
const VELOCITY_DIVISOR: f64 = 20.0;

/// Signed zoom change for a pinch update. Positive velocity zooms in.
pub fn pinch_delta(gesture: PinchGesture, sensitivity: ZoomSensitivity) -> f64 {
    let velocity = gesture.velocity / VELOCITY_DIVISOR;
    if velocity > 0.0 {
        gesture.scale * velocity * sensitivity.zoom_in
    } else {
        -(gesture.scale * velocity.abs() * sensitivity.zoom_out)
    }
}

/// Zoom after applying `gesture` on top of `previous`, clamped to `[0, 1]`.
pub fn next_zoom(previous: f64, gesture: PinchGesture, sensitivity: ZoomSensitivity) -> f64 {
    let mut level = ZoomLevel::new(previous);
    level.apply(pinch_delta(gesture, sensitivity));
    level.get()
}

/// Accumulated zoom, always within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ZoomLevel(f64);

impl ZoomLevel {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 1.0;

    pub fn new(value: f64) -> Self {
        let mut level = Self::default();
        level.apply(value);
        level
    }

    pub fn get(self) -> f64 {
        self.0
    }

    /// Add `delta` and clamp. NaN deltas are ignored.
    pub fn apply(&mut self, delta: f64) -> f64 {
        let next = self.0 + delta;
        if !next.is_nan() {
            self.0 = next.clamp(Self::MIN, Self::MAX);
        }
        self.0
    }
}
