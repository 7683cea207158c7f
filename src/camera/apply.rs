//! Writing cameras to the host viewport.
//!
//! The host reframes the view whenever projection type or perspective angle
//! changes, and it can get stuck switching straight between orthographic and
//! perspective. Writes are therefore split into phases:
//!
//! `Idle -> TypeSanitize? -> PhaseOneCommit -> PhaseTwoCommit -> Idle`
//!
//! Phase one writes lens and projection, phase two writes eye/target/up on top
//! of whatever the host reframed to.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use log::{debug, error, info};

use super::{CameraPayload, CameraState, ProjectionType};
use crate::error::{CameraError, CameraResult};
use crate::host::Viewport;
use crate::math::FUSION_DEFAULT_FOV_DEG;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyPhase {
    Idle,
    TypeSanitize,
    PhaseOneCommit,
    PhaseTwoCommit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Paste, named-view recall, reset: always two commits.
    Direct,
    /// Slider streaming: one commit unless the eye lock is on and the lens changes.
    Ui,
}

/// Shared view of the applier's phase, for pollers that must skip a cycle
/// while a write is in flight.
#[derive(Debug, Clone)]
pub struct ApplyStatus(Arc<Mutex<ApplyPhase>>);

impl ApplyStatus {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(ApplyPhase::Idle)))
    }

    pub fn phase(&self) -> ApplyPhase {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_busy(&self) -> bool {
        self.phase() != ApplyPhase::Idle
    }

    fn set(&self, phase: ApplyPhase) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }
}

/// Serializes camera writes to the viewport.
pub struct CameraApplier {
    status: ApplyStatus,
    settle_delay: Duration,
}

impl CameraApplier {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            status: ApplyStatus::new(),
            settle_delay,
        }
    }

    pub fn status(&self) -> ApplyStatus {
        self.status.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.status.is_busy()
    }

    /// Run `op` as one apply operation; refuses to start while another is in flight.
    fn guarded<T>(&mut self, op: impl FnOnce(&mut Self) -> CameraResult<T>) -> CameraResult<T> {
        if self.status.is_busy() {
            return Err(CameraError::ApplyInProgress);
        }
        let result = op(self);
        self.status.set(ApplyPhase::Idle);
        if let Err(e) = &result {
            error!("Camera apply aborted: {}", e);
        }
        result
    }

    /// Write `payload` to the viewport.
    pub fn apply(
        &mut self,
        viewport: &mut dyn Viewport,
        payload: &CameraPayload,
        mode: ApplyMode,
        eye_lock_active: bool,
    ) -> CameraResult<()> {
        self.guarded(|this| {
            let current = viewport.camera()?;
            if payload.camera.projection != current.projection {
                this.sanitize(viewport, payload.camera.projection, Some(payload.camera.fov))?;
            }

            match mode {
                ApplyMode::Direct => this.two_phase(viewport, &payload.camera, true),
                ApplyMode::Ui if eye_lock_active && payload.changes_lens => {
                    debug!("Eye lock active with lens change, using two-phase write");
                    this.two_phase(viewport, &payload.camera, false)
                }
                ApplyMode::Ui => {
                    this.status.set(ApplyPhase::PhaseOneCommit);
                    viewport.set_camera(&payload.camera.without_transitions())?;
                    viewport.refresh()
                }
            }
        })
    }

    /// Recall a saved camera (named view or initial state) in direct mode.
    ///
    /// Unlike [`apply`](Self::apply) the camera's own fit flag is written.
    pub fn restore(&mut self, viewport: &mut dyn Viewport, camera: &CameraState) -> CameraResult<()> {
        self.guarded(|this| {
            let current = viewport.camera()?;
            if camera.projection != current.projection {
                this.sanitize(viewport, camera.projection, Some(camera.fov))?;
            }
            this.two_phase(viewport, camera, true)
        })
    }

    /// Set the host's stock lens without touching eye/target/up.
    pub fn apply_default_lens(&mut self, viewport: &mut dyn Viewport) -> CameraResult<()> {
        self.guarded(|this| {
            this.status.set(ApplyPhase::PhaseOneCommit);
            let mut camera = viewport.camera()?.without_transitions();
            camera.fov = FUSION_DEFAULT_FOV_DEG.to_radians();
            viewport.set_camera(&camera)?;
            viewport.refresh()?;
            info!("Applied default lens ({:.2} deg)", FUSION_DEFAULT_FOV_DEG);
            Ok(())
        })
    }

    /// Switch the viewport to `target_type` through a perspective + fit write.
    fn sanitize(
        &mut self,
        viewport: &mut dyn Viewport,
        target_type: ProjectionType,
        target_fov: Option<f64>,
    ) -> CameraResult<()> {
        self.status.set(ApplyPhase::TypeSanitize);
        debug!("Sanitizing camera for switch to {}", target_type.label());

        let mut camera = viewport.camera()?;
        camera.projection = ProjectionType::Perspective;
        camera.is_fit_view = true;
        camera.is_smooth_transition = false;
        viewport.set_camera(&camera)?;
        viewport.refresh()?;
        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }

        let mut camera = viewport.camera()?;
        camera.projection = target_type;
        if let Some(fov) = target_fov {
            camera.fov = fov;
        }
        camera.is_fit_view = target_type == ProjectionType::Orthographic;
        camera.is_smooth_transition = false;
        viewport.set_camera(&camera)?;
        viewport.refresh()
    }

    fn two_phase(&mut self, viewport: &mut dyn Viewport, camera: &CameraState, fit_orthographic: bool) -> CameraResult<()> {
        self.status.set(ApplyPhase::PhaseOneCommit);
        let mut staged = viewport.camera()?;
        staged.fov = camera.fov;
        staged.projection = camera.projection;
        staged.is_fit_view = false;
        staged.is_smooth_transition = false;
        viewport.set_camera(&staged)?;

        // Re-read: the host may have reframed after the lens write.
        self.status.set(ApplyPhase::PhaseTwoCommit);
        let mut staged = viewport.camera()?;
        staged.eye = camera.eye;
        staged.target = camera.target;
        staged.up = camera.up;
        staged.is_fit_view = camera.is_fit_view;
        staged.is_smooth_transition = camera.is_smooth_transition;
        viewport.set_camera(&staged)?;
        viewport.refresh()?;

        if fit_orthographic && viewport.camera()?.projection == ProjectionType::Orthographic {
            viewport.fit()?;
        }
        Ok(())
    }
}
