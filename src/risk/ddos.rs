//! Frequency-based traffic classification.

use std::time::Duration;

use crate::config::DdosConfig;
use crate::track::RequestTracker;

/// Traffic anomaly classes, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficClass {
    /// Short spike past the burst threshold: block.
    Burst,
    /// Sustained flood past the long-window threshold: block.
    Sustained,
    /// Elevated but not flooding: warn only.
    Suspicious,
}

/// Classifies identities by request frequency alone.
pub struct DdosClassifier {
    config: DdosConfig,
}

impl DdosClassifier {
    pub fn new(config: &DdosConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Classify prior traffic for `identity`.
    ///
    /// The request under evaluation is not yet recorded, so thresholds
    /// compare against history only: a burst threshold of 20 trips on the
    /// 21st request inside the window.
    pub fn classify(&self, tracker: &RequestTracker, identity: &str) -> Option<TrafficClass> {
        let burst = tracker.burst_count(identity, Duration::from_secs(self.config.burst_window_secs));
        if burst as u32 >= self.config.burst_threshold {
            return Some(TrafficClass::Burst);
        }

        let sustained = tracker.count_within(
            identity,
            Duration::from_secs(self.config.sustained_window_secs),
        );
        if sustained as u32 >= self.config.sustained_threshold {
            return Some(TrafficClass::Sustained);
        }

        let recent = tracker.count_within(
            identity,
            Duration::from_secs(self.config.suspicious_window_secs),
        );
        if recent as u32 >= self.config.suspicious_threshold {
            return Some(TrafficClass::Suspicious);
        }

        None
    }
}
