// Host application boundary: the live viewport camera, the active document and
// the UI palette channel.

pub mod memory;
pub mod messages;

pub use memory::{MemoryDocument, MemoryViewport, RecordingUi};
pub use messages::{NamedViewEntry, UiEvent, UiMessage};

use crate::camera::CameraState;
use crate::error::CameraResult;
use crate::math::BoundingBox;

/// Identifies a camera-changed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type CameraChangedHandler = Box<dyn FnMut(&CameraState) + Send>;

/// The host viewport. It owns the live camera; every read and write goes
/// through it on the thread that owns the session.
pub trait Viewport {
    fn camera(&self) -> CameraResult<CameraState>;

    /// Commit a full camera to the viewport.
    fn set_camera(&mut self, camera: &CameraState) -> CameraResult<()>;

    fn refresh(&mut self) -> CameraResult<()>;

    /// Frame the whole model.
    fn fit(&mut self) -> CameraResult<()>;

    /// Viewport size in pixels.
    fn size(&self) -> (u32, u32);

    fn subscribe_camera_changed(&mut self, handler: CameraChangedHandler) -> SubscriptionId;

    fn unsubscribe_camera_changed(&mut self, id: SubscriptionId);
}

/// A saved camera snapshot in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedView {
    pub name: String,
    pub camera: CameraState,
}

/// The active design.
pub trait Document {
    fn has_active_model(&self) -> bool;

    /// Root component bounds, if there is any geometry.
    fn bounding_box(&self) -> Option<BoundingBox>;

    /// Named views in document order.
    fn named_views(&self) -> Vec<NamedView>;

    /// The built-in front view; its up vector defines the document up.
    fn front_view(&self) -> Option<CameraState>;

    fn add_named_view(&mut self, name: &str, camera: &CameraState) -> CameraResult<()>;

    fn remove_named_view(&mut self, name: &str) -> CameraResult<()>;

    fn named_view_by_index(&self, index: usize) -> Option<NamedView> {
        self.named_views().into_iter().nth(index)
    }

    fn named_view_by_name(&self, name: &str) -> Option<NamedView> {
        self.named_views().into_iter().find(|v| v.name == name)
    }
}

/// Outgoing channel to the palette. Returns false when the palette is gone.
pub trait UiChannel {
    fn send(&mut self, message: &UiMessage) -> bool;
}

/// Fan-out of camera-changed notifications to independent subscribers.
#[derive(Default)]
pub struct CameraChangedBus {
    next_id: u64,
    handlers: Vec<(SubscriptionId, CameraChangedHandler)>,
}

impl CameraChangedBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: CameraChangedHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, handler));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(h, _)| *h != id);
        self.handlers.len() != before
    }

    pub fn emit(&mut self, camera: &CameraState) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(camera);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn subscribers_are_independent() {
        let mut bus = CameraChangedBus::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));

        let a2 = a.clone();
        let first = bus.subscribe(Box::new(move |_| {
            a2.fetch_add(1, Ordering::SeqCst);
        }));
        let b2 = b.clone();
        bus.subscribe(Box::new(move |_| {
            b2.fetch_add(1, Ordering::SeqCst);
        }));

        bus.emit(&CameraState::default());
        assert!(bus.unsubscribe(first));
        assert!(!bus.unsubscribe(first));
        bus.emit(&CameraState::default());

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 2);
        assert_eq!(bus.len(), 1);
    }
}
