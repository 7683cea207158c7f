// Eye-level lock and level changes.

pub mod animation;
pub mod lock;

pub use animation::{Easing, LevelAnimation, ease_in_out_cubic, ease_in_out_sine};
pub use lock::EyeLevelLock;

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::camera::{ApplyMode, CameraApplier, CameraState, PendingUpdate, PropertyChange, build_payload};
use crate::error::{CameraError, CameraResult};
use crate::host::{Document, Viewport};
use crate::math::{CanonicalTransform, level_in_model_range, level_of};
use crate::settings::{Preferences, TuningSettings};

pub struct EyeLevelController {
    lock: EyeLevelLock,
    animate: bool,
    duration: Duration,
    fps: u32,
    easing: Easing,
    sensor_width: f64,
}

impl EyeLevelController {
    pub fn new(tuning: &TuningSettings) -> Self {
        Self {
            lock: EyeLevelLock::new(tuning),
            animate: tuning.animate_eye_level,
            duration: Duration::from_millis(tuning.animation_duration_ms),
            fps: tuning.animation_fps,
            easing: tuning.easing,
            sensor_width: tuning.sensor_width_mm,
        }
    }

    pub fn lock(&self) -> &EyeLevelLock {
        &self.lock
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_enabled()
    }

    /// Re-arm a lock persisted by a previous session.
    pub fn restore(&mut self, prefs: &Preferences, viewport: &mut dyn Viewport) {
        if prefs.eye_level_locked {
            self.lock.enable(prefs.eye_level_target, viewport);
        }
    }

    /// Lock or unlock, writing the new state into `prefs` for the caller to persist.
    pub fn toggle_lock(&mut self, enabled: bool, level: f64, viewport: &mut dyn Viewport, prefs: &mut Preferences) {
        if enabled {
            self.lock.enable(level, viewport);
        } else {
            self.lock.disable(viewport);
        }
        prefs.eye_level_locked = enabled;
        prefs.eye_level_target = if enabled { level } else { 0.0 };
    }

    /// Drop the camera-changed subscription, leaving the lock state intact.
    pub fn detach(&mut self, viewport: &mut dyn Viewport) {
        self.lock.detach(viewport);
    }

    pub fn current_eye_level(&self, viewport: &dyn Viewport, document: Option<&dyn Document>) -> CameraResult<f64> {
        let document = document
            .filter(|d| d.has_active_model())
            .ok_or(CameraError::NoActiveModel)?;
        let camera = viewport.camera()?;
        let up = CanonicalTransform::for_document(Some(document)).doc_up;
        Ok(level_of(&camera.eye, &up))
    }

    /// Bring eye and target to the given levels, animated or in one write.
    ///
    /// The animation blocks until done; `on_step` sees each frame.
    pub fn set_eye_and_target_level(
        &mut self,
        eye_level: f64,
        target_level: f64,
        viewport: &mut dyn Viewport,
        document: Option<&dyn Document>,
        applier: &mut CameraApplier,
        mut on_step: impl FnMut(&CameraState),
    ) -> CameraResult<()> {
        let document = document
            .filter(|d| d.has_active_model())
            .ok_or(CameraError::NoActiveModel)?;

        if self.animate {
            let up = CanonicalTransform::for_document(Some(document)).doc_up;
            let camera = viewport.camera()?;
            LevelAnimation::new(&camera, up, eye_level, target_level, self.duration, self.fps, self.easing)
                .run(viewport, &mut on_step)?;
        } else {
            let pending = PendingUpdate::default()
                .with(PropertyChange::EyeLevel(eye_level))
                .with(PropertyChange::TargetLevel(target_level));
            let current = viewport.camera()?;
            let payload = build_payload(&pending, &current, Some(document), self.sensor_width)?;
            applier.apply(viewport, &payload, ApplyMode::Ui, self.lock.is_enabled())?;
            on_step(&viewport.camera()?);
        }
        self.lock.set_target_level(eye_level);
        Ok(())
    }

    /// Eye-level slider. With `snap` the camera moves to the level right away.
    pub fn handle_set_eye_level(
        &mut self,
        level: f64,
        snap: bool,
        viewport: &mut dyn Viewport,
        document: Option<&dyn Document>,
        applier: &mut CameraApplier,
        on_step: impl FnMut(&CameraState),
    ) -> CameraResult<bool> {
        let bounds = document.and_then(|d| d.bounding_box());
        let up = CanonicalTransform::for_document(document).doc_up;
        if !level_in_model_range(bounds.as_ref(), &up, level) {
            warn!("Eye level {:.3} is outside the model's vertical range", level);
        }
        if !snap || level == 0.0 {
            return Ok(false);
        }
        self.set_eye_and_target_level(level, level, viewport, document, applier, on_step)?;
        Ok(true)
    }

    /// Poll-tick drift correction. Returns true when a correction ran.
    pub fn check_passive_correction(
        &mut self,
        now: Instant,
        viewport: &mut dyn Viewport,
        document: Option<&dyn Document>,
        applier: &mut CameraApplier,
        on_step: impl FnMut(&CameraState),
    ) -> CameraResult<bool> {
        if !self.lock.is_enabled() {
            return Ok(false);
        }
        let current = match self.current_eye_level(viewport, document) {
            Ok(level) => level,
            Err(CameraError::NoActiveModel) => {
                debug!("No active design, skipping eye level check");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        let Some(drift) = self.lock.check(current, now) else {
            return Ok(false);
        };

        let level = self.lock.target_level();
        info!("Eye level drifted by {:.3}, correcting to {:.3}", drift, level);
        self.set_eye_and_target_level(level, level, viewport, document, applier, on_step)?;
        Ok(true)
    }
}
