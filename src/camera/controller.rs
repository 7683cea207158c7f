use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use nalgebra_glm as glm;

use super::{
    ApplyMode, CameraApplier, CameraState, InitialState, PendingUpdate, PropertyChange, TelemetrySnapshot,
    build_payload, gather_telemetry,
};
use crate::error::{CameraError, CameraResult};
use crate::host::{Document, Viewport};
use crate::math::{
    CanonicalTransform, DistanceBounds, GEOMETRY_EPSILON, Point3, corrected_up_vector, distance_bounds_from_model,
};
use crate::settings::TuningSettings;

pub const NO_SELECTION_MESSAGE: &str = "Select a construction point first.";
pub const COINCIDENT_POINTS_MESSAGE: &str = "Eye and target cannot be the same point.";

/// Pending slider edits shared between event intake and the flush task.
#[derive(Debug, Clone, Default)]
pub struct PendingBuffer(Arc<Mutex<PendingUpdate>>);

impl PendingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an edit. Returns true if the buffer was empty, i.e. a flush needs
    /// scheduling.
    pub fn push(&self, change: PropertyChange) -> bool {
        let mut pending = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let was_empty = pending.is_empty();
        pending.merge(change);
        was_empty
    }

    /// Take everything buffered so far, leaving the buffer empty.
    pub fn take(&self) -> PendingUpdate {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

/// Camera operations behind the palette: slider edits, set-eye/target, reset,
/// fit and lens, plus the readout sent back.
pub struct CameraController {
    initial: InitialState,
    distance_bounds: DistanceBounds,
    telemetry_paused: bool,
    sensor_width: f64,
    distance_multiplier: f64,
}

impl CameraController {
    pub fn new(tuning: &TuningSettings) -> Self {
        Self {
            initial: InitialState::default(),
            distance_bounds: DistanceBounds::fallback(tuning.distance_multiplier),
            telemetry_paused: false,
            sensor_width: tuning.sensor_width_mm,
            distance_multiplier: tuning.distance_multiplier,
        }
    }

    pub fn record_initial_state(&mut self, viewport: &dyn Viewport) -> CameraResult<()> {
        let camera = viewport.camera()?;
        debug!(
            "Recorded initial camera: eye ({:.3}, {:.3}, {:.3})",
            camera.eye.x, camera.eye.y, camera.eye.z
        );
        self.initial.record(camera);
        Ok(())
    }

    pub fn initial_state(&self) -> Option<&CameraState> {
        self.initial.get()
    }

    /// Return to the camera recorded at session start. No-op without one.
    pub fn reset(&self, viewport: &mut dyn Viewport, applier: &mut CameraApplier) -> CameraResult<bool> {
        let Some(initial) = self.initial.get() else {
            warn!("No initial camera state recorded, reset skipped");
            return Ok(false);
        };
        applier.restore(viewport, initial)?;
        info!("Camera reset to initial state");
        Ok(true)
    }

    pub fn update_distance_bounds(&mut self, document: Option<&dyn Document>) -> DistanceBounds {
        let bounding_box = document
            .filter(|d| d.has_active_model())
            .and_then(|d| d.bounding_box());
        self.distance_bounds = distance_bounds_from_model(bounding_box.as_ref(), self.distance_multiplier);
        self.distance_bounds
    }

    pub fn distance_bounds(&self) -> DistanceBounds {
        self.distance_bounds
    }

    pub fn set_telemetry_paused(&mut self, paused: bool) {
        self.telemetry_paused = paused;
    }

    pub fn is_telemetry_paused(&self) -> bool {
        self.telemetry_paused
    }

    pub fn sensor_width(&self) -> f64 {
        self.sensor_width
    }

    pub fn telemetry(&self, viewport: &dyn Viewport, document: Option<&dyn Document>) -> CameraResult<TelemetrySnapshot> {
        gather_telemetry(&viewport.camera()?, document, &self.distance_bounds)
    }

    /// Apply buffered slider edits in UI mode.
    ///
    /// With the eye lock on, a lens edit pins the live eye/target/up so the
    /// host's reframe cannot move the eye.
    pub fn apply_pending(
        &self,
        mut pending: PendingUpdate,
        viewport: &mut dyn Viewport,
        document: Option<&dyn Document>,
        applier: &mut CameraApplier,
        eye_lock_active: bool,
    ) -> CameraResult<()> {
        if pending.is_empty() {
            return Ok(());
        }
        let current = viewport.camera()?;
        if eye_lock_active && pending.changes_lens() && pending.eye.is_none() {
            pending.capture_pose(&current);
        }
        let payload = build_payload(&pending, &current, document, self.sensor_width)?;
        applier.apply(viewport, &payload, ApplyMode::Ui, eye_lock_active)
    }

    /// Move the eye onto the selected point, keeping the target.
    pub fn set_eye_to_point(
        &self,
        selection: Option<Point3>,
        viewport: &mut dyn Viewport,
        document: Option<&dyn Document>,
    ) -> CameraResult<()> {
        let point = selection.ok_or_else(|| CameraError::invalid(NO_SELECTION_MESSAGE))?;
        let mut camera = viewport.camera()?;
        if glm::distance(&point, &camera.target) < GEOMETRY_EPSILON {
            return Err(CameraError::invalid(COINCIDENT_POINTS_MESSAGE));
        }
        camera.eye = point;
        self.relevel_and_commit(camera, viewport, document)
    }

    /// Move the target onto the selected point, keeping the eye.
    pub fn set_target_to_point(
        &self,
        selection: Option<Point3>,
        viewport: &mut dyn Viewport,
        document: Option<&dyn Document>,
    ) -> CameraResult<()> {
        let point = selection.ok_or_else(|| CameraError::invalid(NO_SELECTION_MESSAGE))?;
        let mut camera = viewport.camera()?;
        if glm::distance(&point, &camera.eye) < GEOMETRY_EPSILON {
            return Err(CameraError::invalid(COINCIDENT_POINTS_MESSAGE));
        }
        camera.target = point;
        self.relevel_and_commit(camera, viewport, document)
    }

    fn relevel_and_commit(
        &self,
        mut camera: CameraState,
        viewport: &mut dyn Viewport,
        document: Option<&dyn Document>,
    ) -> CameraResult<()> {
        let doc_up = CanonicalTransform::for_document(document).doc_up;
        match corrected_up_vector(&camera.view_vector(), &doc_up) {
            Some(up) => camera.up = up,
            None => warn!("View runs along document up, keeping previous up vector"),
        }
        viewport.set_camera(&camera.without_transitions())?;
        viewport.refresh()
    }

    pub fn fit(&self, viewport: &mut dyn Viewport) -> CameraResult<()> {
        viewport.fit()?;
        viewport.refresh()
    }

    pub fn apply_default_lens(&self, viewport: &mut dyn Viewport, applier: &mut CameraApplier) -> CameraResult<()> {
        applier.apply_default_lens(viewport)
    }
}
