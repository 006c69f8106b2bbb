//! Device capability classification
//!
//! One-shot classification of the running device into a tier that scales the
//! loader's concurrency ceiling and the tracker's preload margins. Nothing is
//! persisted; the classification is recomputed every session.
//!
//! Missing processor/memory signals assume a capable device. A missing
//! viewport width takes the conservative branch and classifies as constrained.

use serde::{Deserialize, Serialize};
use showreel_common::config::{DeviceThresholds, PlaybackTuning};
use sysinfo::System;
use tracing::debug;

use crate::viewport::VisibilityConfig;

/// Device tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Low concurrency/memory or small touch viewport
    Constrained,
    Capable,
}

impl DeviceClass {
    pub fn is_constrained(self) -> bool {
        self == DeviceClass::Constrained
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceClass::Constrained => write!(f, "constrained"),
            DeviceClass::Capable => write!(f, "capable"),
        }
    }
}

/// Raw signals the classifier looks at, each optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSignals {
    /// Logical processor count
    pub logical_cores: Option<usize>,
    /// Approximate device memory in GiB
    pub memory_gb: Option<f64>,
    /// Layout viewport width in CSS pixels
    pub viewport_width: Option<u32>,
    /// Reported maximum touch points (0 = no touch)
    pub touch_points: Option<u32>,
}

impl DeviceSignals {
    /// Detect processor and memory signals of the host
    ///
    /// The viewport is not a host property; supply it with `with_viewport`.
    pub fn detect_host() -> Self {
        Self {
            logical_cores: std::thread::available_parallelism().ok().map(|n| n.get()),
            memory_gb: detect_memory_gb(),
            viewport_width: None,
            touch_points: None,
        }
    }

    pub fn with_viewport(mut self, width: Option<u32>, touch_points: Option<u32>) -> Self {
        self.viewport_width = width;
        self.touch_points = touch_points;
        self
    }
}

/// Classify a device from its signals
pub fn classify(signals: &DeviceSignals, thresholds: &DeviceThresholds) -> DeviceClass {
    let (class, reason) = classify_with_reason(signals, thresholds);
    debug!("Device classified as {} ({})", class, reason);
    class
}

fn classify_with_reason(
    signals: &DeviceSignals,
    thresholds: &DeviceThresholds,
) -> (DeviceClass, &'static str) {
    if let Some(cores) = signals.logical_cores {
        if cores <= thresholds.max_constrained_cores {
            return (DeviceClass::Constrained, "few logical cores");
        }
    }

    if let Some(memory) = signals.memory_gb {
        if memory <= thresholds.max_constrained_memory_gb {
            return (DeviceClass::Constrained, "low device memory");
        }
    }

    let Some(width) = signals.viewport_width else {
        return (DeviceClass::Constrained, "viewport unknown");
    };

    if width < thresholds.small_viewport_px {
        return (DeviceClass::Constrained, "small viewport");
    }

    let touch = signals.touch_points.is_some_and(|t| t > 0);
    if touch && width < thresholds.touch_viewport_px {
        return (DeviceClass::Constrained, "tablet-sized touch viewport");
    }

    (DeviceClass::Capable, "no constraint signal")
}

/// Classification plus the limits derived from it
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    pub class: DeviceClass,
    /// Max loading+loaded videos
    pub ceiling: usize,
    pub visibility: VisibilityConfig,
}

impl DeviceProfile {
    pub fn new(class: DeviceClass, tuning: &PlaybackTuning) -> Self {
        let ceiling = match class {
            DeviceClass::Constrained => tuning.constrained_ceiling,
            DeviceClass::Capable => tuning.capable_ceiling,
        };
        Self {
            class,
            ceiling,
            visibility: VisibilityConfig::for_device(class, tuning),
        }
    }

    pub fn detect(signals: &DeviceSignals, thresholds: &DeviceThresholds, tuning: &PlaybackTuning) -> Self {
        Self::new(classify(signals, thresholds), tuning)
    }
}

/// Total physical memory reported by the OS
fn detect_memory_gb() -> Option<f64> {
    let mut system = System::new();
    system.refresh_memory();
    let total = system.total_memory();
    // Unsupported platforms report 0
    (total > 0).then(|| bytes_to_gb(total))
}

fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desktop() -> DeviceSignals {
        DeviceSignals {
            logical_cores: Some(8),
            memory_gb: Some(16.0),
            viewport_width: Some(1440),
            touch_points: Some(0),
        }
    }

    #[test]
    fn test_desktop_is_capable() {
        assert_eq!(classify(&desktop(), &DeviceThresholds::default()), DeviceClass::Capable);
    }

    #[test]
    fn test_missing_hardware_signals_assume_capable() {
        let signals = DeviceSignals {
            logical_cores: None,
            memory_gb: None,
            ..desktop()
        };
        assert_eq!(classify(&signals, &DeviceThresholds::default()), DeviceClass::Capable);
    }

    #[test]
    fn test_missing_viewport_is_constrained() {
        let signals = DeviceSignals {
            viewport_width: None,
            ..desktop()
        };
        assert_eq!(classify(&signals, &DeviceThresholds::default()), DeviceClass::Constrained);
    }

    #[test]
    fn test_low_cores_or_memory_constrained() {
        let thresholds = DeviceThresholds::default();
        let few_cores = DeviceSignals { logical_cores: Some(2), ..desktop() };
        let low_memory = DeviceSignals { memory_gb: Some(1.5), ..desktop() };
        assert!(classify(&few_cores, &thresholds).is_constrained());
        assert!(classify(&low_memory, &thresholds).is_constrained());
    }

    #[test]
    fn test_viewport_heuristics() {
        let thresholds = DeviceThresholds::default();
        let phone = DeviceSignals { viewport_width: Some(390), touch_points: Some(5), ..desktop() };
        let tablet = DeviceSignals { viewport_width: Some(900), touch_points: Some(5), ..desktop() };
        let narrow_desktop = DeviceSignals { viewport_width: Some(900), touch_points: Some(0), ..desktop() };

        assert!(classify(&phone, &thresholds).is_constrained());
        assert!(classify(&tablet, &thresholds).is_constrained());
        assert_eq!(classify(&narrow_desktop, &thresholds), DeviceClass::Capable);
    }

    #[test]
    fn test_profile_ceilings() {
        let tuning = PlaybackTuning::default();
        assert_eq!(DeviceProfile::new(DeviceClass::Constrained, &tuning).ceiling, 1);
        assert_eq!(DeviceProfile::new(DeviceClass::Capable, &tuning).ceiling, 4);
    }

    #[test]
    fn test_bytes_to_gb() {
        assert_eq!(bytes_to_gb(8 * 1024 * 1024 * 1024), 8.0);
        assert_eq!(bytes_to_gb(512 * 1024 * 1024), 0.5);
    }

    #[test]
    fn test_detect_host_leaves_viewport_to_caller() {
        let signals = DeviceSignals::detect_host();
        assert!(signals.logical_cores.is_some_and(|n| n > 0));
        assert!(signals.memory_gb.map_or(true, |gb| gb > 0.0));
        assert_eq!(signals.viewport_width, None);
    }
}
