// Named views and the copy/paste clipboard.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info};

use crate::camera::{ApplyMode, CameraApplier, CameraState, CanonicalCamera, ProjectionType, build_payload_from_canonical};
use crate::error::{CameraError, CameraResult};
use crate::host::{CameraChangedHandler, Document, NamedViewEntry, SubscriptionId, Viewport};
use crate::math::CanonicalTransform;

pub const PERSPECTIVE_VIEW_BASE_NAME: &str = "Camera Tools Persp View";
pub const ORTHOGRAPHIC_VIEW_BASE_NAME: &str = "Camera Tools Ortho View";

/// First free name of the form `base`, `base 1`, `base 2`, ...
pub fn unique_view_name(projection: ProjectionType, existing: &[String]) -> String {
    let base = match projection {
        ProjectionType::Perspective => PERSPECTIVE_VIEW_BASE_NAME,
        ProjectionType::Orthographic => ORTHOGRAPHIC_VIEW_BASE_NAME,
    };
    let mut candidate = base.to_string();
    let mut suffix = 1;
    while existing.iter().any(|n| *n == candidate) {
        candidate = format!("{} {}", base, suffix);
        suffix += 1;
    }
    candidate
}

pub fn list_named_views(document: Option<&dyn Document>) -> Vec<NamedViewEntry> {
    document
        .filter(|d| d.has_active_model())
        .map(|d| {
            d.named_views()
                .into_iter()
                .enumerate()
                .map(|(index, v)| NamedViewEntry { index, name: v.name })
                .collect()
        })
        .unwrap_or_default()
}

fn log_camera(label: &str, camera: &CameraState) {
    debug!(
        "{}: type {} eye ({:.3}, {:.3}, {:.3}) target ({:.3}, {:.3}, {:.3}) up ({:.3}, {:.3}, {:.3}) fov {:.2}",
        label,
        camera.projection.label(),
        camera.eye.x,
        camera.eye.y,
        camera.eye.z,
        camera.target.x,
        camera.target.y,
        camera.target.z,
        camera.up.x,
        camera.up.y,
        camera.up.z,
        camera.fov_degrees()
    );
}

/// Named-view recall/save, the canonical clipboard and dropdown sync.
#[derive(Default)]
pub struct ViewController {
    clipboard: Option<CanonicalCamera>,
    last_sent: Option<Vec<NamedViewEntry>>,
    selection_armed: Arc<AtomicBool>,
    reset_pending: Arc<AtomicBool>,
    subscription: Option<SubscriptionId>,
}

impl ViewController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe the dropdown-reset watcher.
    ///
    /// After a named view is applied the next camera change means the user
    /// moved away from it, so the dropdown selection should clear.
    pub fn attach(&mut self, viewport: &mut dyn Viewport) {
        self.detach(viewport);
        let armed = self.selection_armed.clone();
        let pending = self.reset_pending.clone();
        let handler: CameraChangedHandler = Box::new(move |_| {
            if armed.swap(false, Ordering::SeqCst) {
                pending.store(true, Ordering::SeqCst);
            }
        });
        self.subscription = Some(viewport.subscribe_camera_changed(handler));
    }

    pub fn detach(&mut self, viewport: &mut dyn Viewport) {
        if let Some(id) = self.subscription.take() {
            viewport.unsubscribe_camera_changed(id);
        }
    }

    /// Whether the dropdown should be reset; clears the flag.
    pub fn take_reset_request(&self) -> bool {
        self.reset_pending.swap(false, Ordering::SeqCst)
    }

    pub fn apply_named_view(
        &mut self,
        index: usize,
        viewport: &mut dyn Viewport,
        document: Option<&dyn Document>,
        applier: &mut CameraApplier,
    ) -> CameraResult<CameraState> {
        let document = document
            .filter(|d| d.has_active_model())
            .ok_or(CameraError::NoActiveModel)?;
        let view = document.named_view_by_index(index).ok_or_else(|| {
            error!("Named view index out of range: {}", index);
            CameraError::invalid(format!("Named view {} does not exist.", index))
        })?;

        // A saved fit flag would refit the host after the pose commit.
        let mut camera = view.camera.clone();
        camera.is_smooth_transition = false;
        camera.is_fit_view = false;
        applier.restore(viewport, &camera)?;

        // Arm after our own commits so they do not trigger the reset.
        self.selection_armed.store(true, Ordering::SeqCst);
        info!("Applied named view '{}'", view.name);
        log_camera("Named view camera", &view.camera);
        viewport.camera()
    }

    /// Save the live camera under `name`, or a generated unique name.
    pub fn save_named_view(
        &mut self,
        name: Option<&str>,
        viewport: &dyn Viewport,
        document: Option<&mut (dyn Document + '_)>,
    ) -> CameraResult<String> {
        let document = match document {
            Some(d) if d.has_active_model() => d,
            _ => return Err(CameraError::invalid("No active Fusion design.")),
        };
        let camera = viewport.camera()?;
        let existing: Vec<String> = document.named_views().into_iter().map(|v| v.name).collect();
        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(n) => n.to_string(),
            None => unique_view_name(camera.projection, &existing),
        };
        document.add_named_view(&name, &camera)?;
        log_camera("Saved camera", &camera);
        Ok(name)
    }

    /// Remember the live camera in canonical space.
    pub fn copy_view(&mut self, viewport: &dyn Viewport, document: Option<&dyn Document>) -> CameraResult<()> {
        let document = document
            .filter(|d| d.has_active_model())
            .ok_or(CameraError::NoActiveModel)?;
        let transform = CanonicalTransform::for_document(Some(document));
        let snapshot = CanonicalCamera::capture(&viewport.camera()?, &transform);
        debug!(
            "Copied canonical camera: eye ({:.3}, {:.3}, {:.3})",
            snapshot.eye.x, snapshot.eye.y, snapshot.eye.z
        );
        self.clipboard = Some(snapshot);
        Ok(())
    }

    pub fn clipboard(&self) -> Option<&CanonicalCamera> {
        self.clipboard.as_ref()
    }

    /// Apply the copied camera in direct mode.
    pub fn paste_view(
        &self,
        viewport: &mut dyn Viewport,
        document: Option<&dyn Document>,
        applier: &mut CameraApplier,
        eye_lock_active: bool,
    ) -> CameraResult<ProjectionType> {
        let snapshot = self
            .clipboard
            .as_ref()
            .ok_or_else(|| CameraError::invalid("No camera view to paste"))?;
        let payload = build_payload_from_canonical(snapshot, document)?;
        applier.apply(viewport, &payload, ApplyMode::Direct, eye_lock_active)?;
        info!("Camera view pasted");
        Ok(payload.camera.projection)
    }

    /// Named-view list if it changed since the last call.
    pub fn poll_named_views(&mut self, document: Option<&dyn Document>) -> Option<Vec<NamedViewEntry>> {
        let current = list_named_views(document);
        if self.last_sent.as_ref() == Some(&current) {
            return None;
        }
        self.last_sent = Some(current.clone());
        Some(current)
    }

    /// Forget what was last sent so the next poll resends.
    pub fn invalidate_list(&mut self) {
        self.last_sent = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryDocument, MemoryViewport};
    use crate::math::{assert_vec_close, point};
    use nalgebra_glm as glm;
    use std::time::Duration;

    fn camera(projection: ProjectionType) -> CameraState {
        CameraState::new(
            point(20.0, -60.0, 30.0),
            point(0.0, 0.0, 5.0),
            glm::vec3(0.0, 0.0, 1.0),
            35.0,
            projection,
        )
    }

    #[test]
    fn generated_names_skip_taken_ones() {
        let existing = vec![
            PERSPECTIVE_VIEW_BASE_NAME.to_string(),
            format!("{} 1", PERSPECTIVE_VIEW_BASE_NAME),
        ];
        assert_eq!(
            unique_view_name(ProjectionType::Perspective, &existing),
            format!("{} 2", PERSPECTIVE_VIEW_BASE_NAME)
        );
        assert_eq!(
            unique_view_name(ProjectionType::Orthographic, &existing),
            ORTHOGRAPHIC_VIEW_BASE_NAME
        );
    }

    #[test]
    fn save_then_list() {
        let viewport = MemoryViewport::new(camera(ProjectionType::Perspective));
        let mut doc = MemoryDocument::new(glm::vec3(0.0, 0.0, 1.0));
        let mut views = ViewController::new();

        let first = views.save_named_view(None, &viewport, Some(&mut doc)).unwrap();
        let second = views.save_named_view(None, &viewport, Some(&mut doc)).unwrap();
        let custom = views.save_named_view(Some("  Hero  "), &viewport, Some(&mut doc)).unwrap();
        assert_eq!(first, PERSPECTIVE_VIEW_BASE_NAME);
        assert_eq!(second, format!("{} 1", PERSPECTIVE_VIEW_BASE_NAME));
        assert_eq!(custom, "Hero");

        let list = list_named_views(Some(&doc as &dyn Document));
        assert_eq!(list.len(), 3);
        assert_eq!(list[2], NamedViewEntry { index: 2, name: "Hero".to_string() });
    }

    #[test]
    fn poll_sends_only_changes() {
        let mut doc = MemoryDocument::new(glm::vec3(0.0, 0.0, 1.0));
        let mut views = ViewController::new();
        assert_eq!(views.poll_named_views(Some(&doc as &dyn Document)), Some(vec![]));
        assert_eq!(views.poll_named_views(Some(&doc as &dyn Document)), None);
        doc.add_named_view("A", &camera(ProjectionType::Perspective)).unwrap();
        assert_eq!(views.poll_named_views(Some(&doc as &dyn Document)).map(|l| l.len()), Some(1));
        assert_eq!(views.poll_named_views(Some(&doc as &dyn Document)), None);
        views.invalidate_list();
        assert!(views.poll_named_views(Some(&doc as &dyn Document)).is_some());
    }

    #[test]
    fn applying_a_view_arms_dropdown_reset() {
        let mut viewport = MemoryViewport::new(camera(ProjectionType::Perspective));
        let saved = camera(ProjectionType::Orthographic);
        let doc = MemoryDocument::new(glm::vec3(0.0, 0.0, 1.0)).with_named_view("Top", saved.clone());
        let mut applier = CameraApplier::new(Duration::ZERO);
        let mut views = ViewController::new();
        views.attach(&mut viewport);

        let live = views
            .apply_named_view(0, &mut viewport, Some(&doc as &dyn Document), &mut applier)
            .unwrap();
        assert_eq!(live.projection, ProjectionType::Orthographic);
        assert_vec_close(&live.eye, &saved.eye, 1e-12);
        assert_eq!(viewport.fit_count(), 1);
        // Our own commits do not count as moving away.
        assert!(!views.take_reset_request());

        viewport.user_navigate(camera(ProjectionType::Perspective));
        assert!(views.take_reset_request());
        assert!(!views.take_reset_request());
    }

    #[test]
    fn recall_never_writes_a_saved_fit_flag() {
        let mut viewport = MemoryViewport::new(camera(ProjectionType::Perspective));
        let mut saved = camera(ProjectionType::Perspective);
        saved.eye = point(40.0, -20.0, 12.0);
        saved.is_fit_view = true;
        let doc = MemoryDocument::new(glm::vec3(0.0, 0.0, 1.0)).with_named_view("Framed", saved.clone());
        let mut applier = CameraApplier::new(Duration::ZERO);
        let mut views = ViewController::new();

        views
            .apply_named_view(0, &mut viewport, Some(&doc as &dyn Document), &mut applier)
            .unwrap();

        let commits = viewport.commits();
        assert_eq!(commits.len(), 2);
        assert!(commits.iter().all(|c| !c.is_fit_view));
        assert_vec_close(&viewport.camera().unwrap().eye, &saved.eye, 1e-12);
        assert_eq!(viewport.fit_count(), 0);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut viewport = MemoryViewport::new(camera(ProjectionType::Perspective));
        let doc = MemoryDocument::new(glm::vec3(0.0, 0.0, 1.0));
        let mut applier = CameraApplier::new(Duration::ZERO);
        let mut views = ViewController::new();
        assert!(views
            .apply_named_view(3, &mut viewport, Some(&doc as &dyn Document), &mut applier)
            .is_err());
        assert!(viewport.commits().is_empty());
    }

    #[test]
    fn paste_without_copy_is_user_facing() {
        let mut viewport = MemoryViewport::new(camera(ProjectionType::Perspective));
        let doc = MemoryDocument::new(glm::vec3(0.0, 0.0, 1.0));
        let mut applier = CameraApplier::new(Duration::ZERO);
        let err = ViewController::new()
            .paste_view(&mut viewport, Some(&doc as &dyn Document), &mut applier, false)
            .unwrap_err();
        assert!(err.is_user_facing());
    }

    #[test]
    fn copy_then_paste_restores_camera() {
        let original = camera(ProjectionType::Perspective);
        let mut viewport = MemoryViewport::new(original.clone());
        let doc = MemoryDocument::new(glm::vec3(0.0, 0.0, 1.0));
        let mut applier = CameraApplier::new(Duration::ZERO);
        let mut views = ViewController::new();

        views.copy_view(&viewport, Some(&doc as &dyn Document)).unwrap();
        viewport.user_navigate(CameraState::default());
        views
            .paste_view(&mut viewport, Some(&doc as &dyn Document), &mut applier, false)
            .unwrap();

        let live = viewport.camera().unwrap();
        assert_vec_close(&live.eye, &original.eye, 1e-9);
        assert_vec_close(&live.target, &original.target, 1e-9);
        assert!((live.fov - original.fov).abs() < 1e-12);
    }
}
