//! Viewport visibility tracking
//!
//! Emulates a per-element intersection observer: each observed element has a
//! rectangle, and `evaluate` compares it against the current viewport to
//! produce enter/exit edges.
//!
//! - Enter is tested against the viewport grown by `enter_margin` and fires
//!   once per visible period.
//! - Exit is tested against the viewport grown by `exit_margin` (at least as
//!   large), so an element has to leave the wider unload window before it is
//!   reported hidden.
//! - After an exit the element can enter again.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use showreel_common::config::PlaybackTuning;
use tracing::trace;
use uuid::Uuid;

use crate::device::DeviceClass;

/// Axis-aligned rectangle in page pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Grow on every side by `margin` (like a CSS root margin)
    pub fn expand(&self, margin: f64) -> Rect {
        Rect {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
        }
    }

    pub fn intersection_area(&self, other: &Rect) -> f64 {
        let left = self.x.max(other.x);
        let right = (self.x + self.width).min(other.x + other.width);
        let top = self.y.max(other.y);
        let bottom = (self.y + self.height).min(other.y + other.height);
        (right - left).max(0.0) * (bottom - top).max(0.0)
    }
}

/// Fraction of `element` inside `viewport` grown by `margin`
///
/// Zero-area elements report 0.0.
pub fn intersection_ratio(element: &Rect, viewport: &Rect, margin: f64) -> f64 {
    let area = element.area();
    if area <= 0.0 {
        return 0.0;
    }
    element.intersection_area(&viewport.expand(margin)) / area
}

/// Margins and threshold of one tracker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibilityConfig {
    pub enter_margin: f64,
    pub exit_margin: f64,
    pub threshold: f64,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            enter_margin: 0.0,
            exit_margin: 0.0,
            threshold: 0.1,
        }
    }
}

impl VisibilityConfig {
    pub fn for_device(class: DeviceClass, tuning: &PlaybackTuning) -> Self {
        let (enter_margin, exit_margin) = match class {
            DeviceClass::Constrained => (
                tuning.constrained_enter_margin_px,
                tuning.constrained_exit_margin_px,
            ),
            DeviceClass::Capable => (tuning.capable_enter_margin_px, tuning.capable_exit_margin_px),
        };
        Self {
            enter_margin,
            exit_margin: exit_margin.max(enter_margin),
            threshold: tuning.visibility_threshold,
        }
    }
}

/// Visibility edge for one observed element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityEvent {
    pub instance_id: Uuid,
    pub visible: bool,
}

#[derive(Debug, Clone)]
struct Observation {
    element: Rect,
    visible: bool,
    enter_armed: bool,
}

/// Tracks visibility of many elements against one viewport
#[derive(Debug)]
pub struct ViewportTracker {
    config: VisibilityConfig,
    observations: HashMap<Uuid, Observation>,
    /// Insertion order, so events come out in layout order
    order: Vec<Uuid>,
}

impl ViewportTracker {
    pub fn new(config: VisibilityConfig) -> Self {
        Self {
            config,
            observations: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn config(&self) -> &VisibilityConfig {
        &self.config
    }

    /// Start observing an element. Re-observing replaces its rectangle and
    /// resets it to hidden.
    pub fn observe(&mut self, instance_id: Uuid, element: Rect) {
        let previous = self.observations.insert(
            instance_id,
            Observation {
                element,
                visible: false,
                enter_armed: true,
            },
        );
        if previous.is_none() {
            self.order.push(instance_id);
        }
    }

    /// Move an observed element (layout change); no-op for unknown ids
    pub fn update_element(&mut self, instance_id: Uuid, element: Rect) {
        if let Some(obs) = self.observations.get_mut(&instance_id) {
            obs.element = element;
        }
    }

    /// Stop observing one element. Safe to call repeatedly.
    pub fn unobserve(&mut self, instance_id: Uuid) {
        if self.observations.remove(&instance_id).is_some() {
            self.order.retain(|id| *id != instance_id);
        }
    }

    /// Stop observing everything. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        self.observations.clear();
        self.order.clear();
    }

    pub fn is_observing(&self, instance_id: Uuid) -> bool {
        self.observations.contains_key(&instance_id)
    }

    pub fn is_visible(&self, instance_id: Uuid) -> bool {
        self.observations
            .get(&instance_id)
            .is_some_and(|obs| obs.visible)
    }

    /// Compute visibility edges against `viewport`
    pub fn evaluate(&mut self, viewport: Rect) -> Vec<VisibilityEvent> {
        let mut events = Vec::new();

        for id in &self.order {
            let Some(obs) = self.observations.get_mut(id) else {
                continue;
            };

            if obs.visible {
                let ratio = intersection_ratio(&obs.element, &viewport, self.config.exit_margin);
                if ratio < self.config.threshold {
                    obs.visible = false;
                    obs.enter_armed = true;
                    trace!("Element {} left unload window (ratio {:.2})", id, ratio);
                    events.push(VisibilityEvent { instance_id: *id, visible: false });
                }
            } else if obs.enter_armed {
                let ratio = intersection_ratio(&obs.element, &viewport, self.config.enter_margin);
                if ratio >= self.config.threshold {
                    obs.visible = true;
                    obs.enter_armed = false;
                    trace!("Element {} entered preload window (ratio {:.2})", id, ratio);
                    events.push(VisibilityEvent { instance_id: *id, visible: true });
                }
            }
        }

        events
    }
}
