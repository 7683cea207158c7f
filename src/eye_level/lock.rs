// Eye-level lock state and the camera-changed drift tracker.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::host::{CameraChangedHandler, SubscriptionId, Viewport};
use crate::settings::TuningSettings;

/// Locked eye height plus the timestamp of the last camera change.
///
/// Camera-changed notifications only record a timestamp; correction happens
/// from the poll tick once the camera has been quiet long enough.
pub struct EyeLevelLock {
    enabled: bool,
    target_level: f64,
    tolerance: f64,
    quiescence: Duration,
    last_change: Arc<Mutex<Option<Instant>>>,
    subscription: Option<SubscriptionId>,
}

impl EyeLevelLock {
    pub fn new(tuning: &TuningSettings) -> Self {
        Self {
            enabled: false,
            target_level: 0.0,
            tolerance: tuning.drift_tolerance,
            quiescence: Duration::from_millis(tuning.quiescence_ms),
            last_change: Arc::new(Mutex::new(None)),
            subscription: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn target_level(&self) -> f64 {
        self.target_level
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn set_target_level(&mut self, level: f64) {
        self.target_level = level;
    }

    pub fn is_tracking(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn last_change(&self) -> Option<Instant> {
        *self.last_change.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tracker(&self) -> CameraChangedHandler {
        let last_change = self.last_change.clone();
        Box::new(move |_| {
            *last_change.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        })
    }

    pub fn enable(&mut self, target_level: f64, viewport: &mut dyn Viewport) {
        self.enabled = true;
        self.target_level = target_level;
        self.attach(viewport);
        info!("Eye level lock enabled at {:.3}", target_level);
    }

    pub fn disable(&mut self, viewport: &mut dyn Viewport) {
        self.enabled = false;
        self.target_level = 0.0;
        self.detach(viewport);
        info!("Eye level lock disabled");
    }

    /// (Re)subscribe the drift tracker.
    pub fn attach(&mut self, viewport: &mut dyn Viewport) {
        self.detach(viewport);
        self.subscription = Some(viewport.subscribe_camera_changed(self.tracker()));
    }

    /// Drop the subscription but keep the lock state.
    pub fn detach(&mut self, viewport: &mut dyn Viewport) {
        if let Some(id) = self.subscription.take() {
            viewport.unsubscribe_camera_changed(id);
        }
    }

    /// Passive correction check.
    ///
    /// Returns the drift when the lock is on, the camera has been quiet for the
    /// quiescence period and the eye is further than the tolerance from the
    /// locked level. Every completed check restarts the quiet period.
    pub fn check(&self, current_eye_level: f64, now: Instant) -> Option<f64> {
        if !self.enabled {
            return None;
        }
        let mut last_change = self.last_change.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(changed) = *last_change {
            if now.saturating_duration_since(changed) < self.quiescence {
                return None;
            }
        }
        *last_change = Some(now);

        let drift = (current_eye_level - self.target_level).abs();
        debug!("Eye level drift {:.4} (tolerance {})", drift, self.tolerance);
        (drift > self.tolerance).then_some(drift)
    }
}
