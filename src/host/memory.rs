// In-memory host used by the binary and the tests.
//
// The viewport mimics the host's reframing: whenever a commit changes the
// projection type or the perspective angle, the eye is pulled along the view
// ray to keep the frame size. Only a follow-up commit restores the requested
// position.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use nalgebra_glm as glm;

use super::{
    CameraChangedBus, CameraChangedHandler, Document, NamedView, SubscriptionId, UiChannel, UiMessage,
    Viewport,
};
use crate::camera::{CameraState, ProjectionType};
use crate::error::{CameraError, CameraResult};
use crate::math::{BoundingBox, Vector3, point};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct ViewportLog {
    commits: Vec<CameraState>,
    fits: usize,
    refreshes: usize,
    fail_next_commit: bool,
}

struct ViewportInner {
    camera: CameraState,
    size: (u32, u32),
    log: ViewportLog,
}

/// Simulated viewport. Clones share the same camera.
#[derive(Clone)]
pub struct MemoryViewport {
    inner: Arc<Mutex<ViewportInner>>,
    bus: Arc<Mutex<CameraChangedBus>>,
}

impl MemoryViewport {
    pub fn new(camera: CameraState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ViewportInner {
                camera,
                size: (1920, 1080),
                log: ViewportLog::default(),
            })),
            bus: Arc::new(Mutex::new(CameraChangedBus::new())),
        }
    }

    /// Every camera committed so far, in order.
    pub fn commits(&self) -> Vec<CameraState> {
        lock(&self.inner).log.commits.clone()
    }

    pub fn fit_count(&self) -> usize {
        lock(&self.inner).log.fits
    }

    pub fn refresh_count(&self) -> usize {
        lock(&self.inner).log.refreshes
    }

    pub fn clear_log(&self) {
        let mut inner = lock(&self.inner);
        inner.log.commits.clear();
        inner.log.fits = 0;
        inner.log.refreshes = 0;
    }

    /// Make the next commit fail as a transient host error.
    pub fn fail_next_commit(&self) {
        lock(&self.inner).log.fail_next_commit = true;
    }

    pub fn resize(&self, width: u32, height: u32) {
        lock(&self.inner).size = (width, height);
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.bus).len()
    }

    /// Free navigation by the user: the camera moves without going through
    /// the session.
    pub fn user_navigate(&self, camera: CameraState) {
        lock(&self.inner).camera = camera.clone();
        lock(&self.bus).emit(&camera);
    }

    fn reframe(previous: &CameraState, next: &CameraState) -> CameraState {
        let mut framed = next.clone();
        let lens_changed = (previous.fov - next.fov).abs() > 1e-12;
        if previous.projection != next.projection || lens_changed {
            let view = previous.target - previous.eye;
            let scale = (previous.fov / 2.0).tan() / (next.fov / 2.0).tan();
            framed.eye = next.target - view * scale;
            debug!("Viewport reframed eye after lens/type change (scale {:.3})", scale);
        }
        framed
    }
}

impl Viewport for MemoryViewport {
    fn camera(&self) -> CameraResult<CameraState> {
        Ok(lock(&self.inner).camera.clone())
    }

    fn set_camera(&mut self, camera: &CameraState) -> CameraResult<()> {
        let committed = {
            let mut inner = lock(&self.inner);
            if std::mem::take(&mut inner.log.fail_next_commit) {
                return Err(CameraError::host("viewport rejected camera"));
            }
            let framed = Self::reframe(&inner.camera, camera);
            inner.camera = framed.clone();
            inner.log.commits.push(camera.clone());
            framed
        };
        lock(&self.bus).emit(&committed);
        Ok(())
    }

    fn refresh(&mut self) -> CameraResult<()> {
        lock(&self.inner).log.refreshes += 1;
        Ok(())
    }

    fn fit(&mut self) -> CameraResult<()> {
        lock(&self.inner).log.fits += 1;
        Ok(())
    }

    fn size(&self) -> (u32, u32) {
        lock(&self.inner).size
    }

    fn subscribe_camera_changed(&mut self, handler: CameraChangedHandler) -> SubscriptionId {
        lock(&self.bus).subscribe(handler)
    }

    fn unsubscribe_camera_changed(&mut self, id: SubscriptionId) {
        lock(&self.bus).unsubscribe(id);
    }
}

struct DocumentInner {
    active: bool,
    up: Vector3,
    bounding_box: Option<BoundingBox>,
    named_views: Vec<NamedView>,
}

/// Simulated design. Clones share the same named views.
#[derive(Clone)]
pub struct MemoryDocument {
    inner: Arc<Mutex<DocumentInner>>,
}

impl MemoryDocument {
    /// Active design whose front view has the given up vector.
    pub fn new(up: Vector3) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DocumentInner {
                active: true,
                up,
                bounding_box: Some(BoundingBox::new(point(-50.0, -50.0, 0.0), point(50.0, 50.0, 100.0))),
                named_views: Vec::new(),
            })),
        }
    }

    /// Document without any active design.
    pub fn without_model() -> Self {
        let doc = Self::new(glm::vec3(0.0, 0.0, 1.0));
        {
            let mut inner = lock(&doc.inner);
            inner.active = false;
            inner.bounding_box = None;
        }
        doc
    }

    pub fn with_bounding_box(self, bounding_box: Option<BoundingBox>) -> Self {
        lock(&self.inner).bounding_box = bounding_box;
        self
    }

    pub fn with_named_view(self, name: &str, camera: CameraState) -> Self {
        lock(&self.inner).named_views.push(NamedView {
            name: name.to_string(),
            camera,
        });
        self
    }

    pub fn up(&self) -> Vector3 {
        lock(&self.inner).up
    }
}

impl Document for MemoryDocument {
    fn has_active_model(&self) -> bool {
        lock(&self.inner).active
    }

    fn bounding_box(&self) -> Option<BoundingBox> {
        lock(&self.inner).bounding_box
    }

    fn named_views(&self) -> Vec<NamedView> {
        lock(&self.inner).named_views.clone()
    }

    fn front_view(&self) -> Option<CameraState> {
        let inner = lock(&self.inner);
        if !inner.active {
            return None;
        }
        // Front view looks at the origin from the front, with the document up.
        let up = inner.up;
        let helper = if up.x.abs() < 0.9 {
            glm::vec3(1.0, 0.0, 0.0)
        } else {
            glm::vec3(0.0, 1.0, 0.0)
        };
        let forward = glm::normalize(&glm::cross(&up, &helper));
        Some(CameraState::new(
            forward * -100.0,
            point(0.0, 0.0, 0.0),
            up,
            crate::math::FUSION_DEFAULT_FOV_DEG,
            ProjectionType::Orthographic,
        ))
    }

    fn add_named_view(&mut self, name: &str, camera: &CameraState) -> CameraResult<()> {
        let mut inner = lock(&self.inner);
        if inner.named_views.iter().any(|v| v.name == name) {
            return Err(CameraError::invalid(format!("A named view called '{}' already exists.", name)));
        }
        inner.named_views.push(NamedView {
            name: name.to_string(),
            camera: camera.clone(),
        });
        info!("Added named view '{}'", name);
        Ok(())
    }

    fn remove_named_view(&mut self, name: &str) -> CameraResult<()> {
        let mut inner = lock(&self.inner);
        let before = inner.named_views.len();
        inner.named_views.retain(|v| v.name != name);
        if inner.named_views.len() == before {
            return Err(CameraError::host(format!("no named view '{}'", name)));
        }
        Ok(())
    }
}

/// UI channel that keeps every message it is sent.
#[derive(Clone, Default)]
pub struct RecordingUi {
    sent: Arc<Mutex<Vec<UiMessage>>>,
    closed: Arc<Mutex<bool>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<UiMessage> {
        lock(&self.sent).clone()
    }

    pub fn take(&self) -> Vec<UiMessage> {
        std::mem::take(&mut *lock(&self.sent))
    }

    /// Simulate the palette going away.
    pub fn close(&self) {
        *lock(&self.closed) = true;
    }
}

impl UiChannel for RecordingUi {
    fn send(&mut self, message: &UiMessage) -> bool {
        if *lock(&self.closed) {
            return false;
        }
        lock(&self.sent).push(message.clone());
        true
    }
}
