// Per-session context: owns the host handles and every controller, and routes
// palette events and scheduler ticks to them on the thread owning the camera.

use std::time::Instant;

use log::{debug, error, info, warn};

use crate::camera::{CameraApplier, CameraController, CameraState, PendingBuffer, gather_telemetry};
use crate::error::{CameraError, CameraResult};
use crate::eye_level::EyeLevelController;
use crate::host::messages::{GridKind, selection_point};
use crate::host::{Document, UiChannel, UiEvent, UiMessage, Viewport};
use crate::settings::{Preferences, PrefsStore, TuningSettings};
use crate::views::ViewController;

/// Periodic work driven by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Fast tick: telemetry push.
    Telemetry,
    /// Slow tick: named views, viewport size and eye-level drift.
    Poll,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventResponse {
    pub camera_changed: bool,
    pub exit: bool,
}

impl EventResponse {
    fn changed(camera_changed: bool) -> Self {
        Self {
            camera_changed,
            exit: false,
        }
    }
}

/// Remembers the last viewport size sent to the palette.
#[derive(Debug, Default)]
pub struct ViewportSizeTracker {
    last: Option<(u32, u32)>,
}

impl ViewportSizeTracker {
    /// The new size if it differs from the last one observed.
    pub fn observe(&mut self, size: (u32, u32)) -> Option<(u32, u32)> {
        if self.last == Some(size) {
            return None;
        }
        self.last = Some(size);
        Some(size)
    }
}

fn deliver(ui: &mut dyn UiChannel, message: &UiMessage) {
    if !ui.send(message) {
        debug!("Palette closed, dropped {:?}", message);
    }
}

fn send_telemetry(
    ui: &mut dyn UiChannel,
    camera: &CameraState,
    document: Option<&dyn Document>,
    controller: &CameraController,
) {
    if !document.is_some_and(|d| d.has_active_model()) {
        return;
    }
    match gather_telemetry(camera, document, &controller.distance_bounds()) {
        Ok(snapshot) => deliver(ui, &UiMessage::UpdateCameraData(Box::new(snapshot))),
        Err(e) => debug!("Telemetry skipped: {}", e),
    }
}

/// Prefix shown to the user when an explicit action fails on the host side.
/// Slider and tick failures stay in the log.
fn failure_message(event: &UiEvent) -> Option<&'static str> {
    match event {
        UiEvent::SetEye { .. } => Some("Failed to set eye"),
        UiEvent::SetTarget { .. } => Some("Failed to set target"),
        UiEvent::SaveView { .. } => Some("Failed to save named view"),
        UiEvent::PasteView => Some("Failed to paste camera view"),
        _ => None,
    }
}

pub struct Session {
    viewport: Box<dyn Viewport>,
    document: Option<Box<dyn Document>>,
    ui: Box<dyn UiChannel>,
    store: PrefsStore,
    prefs: Preferences,
    tuning: TuningSettings,
    applier: CameraApplier,
    camera: CameraController,
    eye_level: EyeLevelController,
    views: ViewController,
    viewport_size: ViewportSizeTracker,
    pending: PendingBuffer,
    closed: bool,
}

impl Session {
    /// Open a session with preferences and tuning read from `store`.
    pub fn open(
        viewport: Box<dyn Viewport>,
        document: Option<Box<dyn Document>>,
        ui: Box<dyn UiChannel>,
        store: PrefsStore,
    ) -> Self {
        let prefs = store.load_preferences();
        let tuning = store.load_tuning();
        Self::with_settings(viewport, document, ui, store, prefs, tuning)
    }

    pub fn with_settings(
        viewport: Box<dyn Viewport>,
        document: Option<Box<dyn Document>>,
        ui: Box<dyn UiChannel>,
        store: PrefsStore,
        prefs: Preferences,
        tuning: TuningSettings,
    ) -> Self {
        let mut session = Self {
            viewport,
            document,
            ui,
            store,
            prefs,
            applier: CameraApplier::new(tuning.settle_delay()),
            camera: CameraController::new(&tuning),
            eye_level: EyeLevelController::new(&tuning),
            views: ViewController::new(),
            viewport_size: ViewportSizeTracker::default(),
            pending: PendingBuffer::new(),
            tuning,
            closed: false,
        };
        session.start();
        session
    }

    fn start(&mut self) {
        if let Err(e) = self.camera.record_initial_state(self.viewport.as_ref()) {
            warn!("Could not record initial camera: {}", e);
        }
        self.camera.update_distance_bounds(self.document.as_deref());
        self.views.attach(self.viewport.as_mut());
        self.eye_level.restore(&self.prefs, self.viewport.as_mut());
        info!(
            "Camera session opened (eye level lock {})",
            if self.eye_level.is_locked() { "on" } else { "off" }
        );

        self.send(&UiMessage::EyeLevelLockStatus {
            enabled: self.eye_level.is_locked(),
        });
        self.resend_all();
    }

    /// Prefs, camera mode, telemetry and the named-view list.
    fn resend_all(&mut self) {
        self.send(&UiMessage::Preferences(self.prefs.clone()));
        self.send_camera_mode();
        self.push_telemetry();
        self.views.invalidate_list();
        self.send_named_views_if_changed();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    pub fn tuning(&self) -> &TuningSettings {
        &self.tuning
    }

    pub fn camera_controller(&self) -> &CameraController {
        &self.camera
    }

    pub fn eye_level(&self) -> &EyeLevelController {
        &self.eye_level
    }

    pub fn views(&self) -> &ViewController {
        &self.views
    }

    /// Buffer shared with the event intake; see `SessionHandle`.
    pub fn pending(&self) -> PendingBuffer {
        self.pending.clone()
    }

    pub fn is_applying(&self) -> bool {
        self.applier.is_busy()
    }

    fn send(&mut self, message: &UiMessage) {
        deliver(self.ui.as_mut(), message);
    }

    fn send_camera_mode(&mut self) {
        match self.viewport.camera() {
            Ok(camera) => self.send(&UiMessage::camera_mode(camera.projection)),
            Err(e) => debug!("Camera mode not sent: {}", e),
        }
    }

    pub fn push_telemetry(&mut self) {
        match self.viewport.camera() {
            Ok(camera) => send_telemetry(self.ui.as_mut(), &camera, self.document.as_deref(), &self.camera),
            Err(e) => debug!("Telemetry skipped: {}", e),
        }
    }

    fn send_named_views_if_changed(&mut self) {
        if let Some(named_views) = self.views.poll_named_views(self.document.as_deref()) {
            debug!("Sending {} named views", named_views.len());
            self.send(&UiMessage::PopulateNamedViews { named_views });
        }
    }

    fn send_dropdown_reset_if_requested(&mut self) {
        if self.views.take_reset_request() {
            self.send(&UiMessage::ResetNamedViewDropdown {});
        }
    }

    fn persist_prefs(&self) {
        if let Err(e) = self.store.store_preferences(&self.prefs) {
            error!("Failed to save preferences: {}", e);
        }
    }

    /// Handle one palette event synchronously.
    ///
    /// Slider edits go through the pending buffer and are flushed right away.
    pub fn handle_event(&mut self, event: UiEvent) -> EventResponse {
        if self.closed {
            debug!("Session closed, ignoring {:?}", event);
            return EventResponse::default();
        }
        if let Some(change) = event.property_change() {
            self.pending.push(change);
            return EventResponse::changed(self.flush());
        }

        let failure = failure_message(&event);
        let response = match self.dispatch(event) {
            Ok(response) => response,
            Err(e) => {
                self.report(&e);
                if let Some(prefix) = failure.filter(|_| !e.is_user_facing()) {
                    self.send(&UiMessage::ShowMessage {
                        message: format!("{}: {}", prefix, e),
                    });
                }
                EventResponse::default()
            }
        };
        if response.camera_changed {
            self.push_telemetry();
        }
        if response.exit {
            self.close();
        }
        response
    }

    fn report(&mut self, e: &CameraError) {
        match e {
            CameraError::ApplyInProgress => warn!("{}", e),
            CameraError::NoActiveModel => warn!("{}", e),
            _ => error!("Camera operation failed: {}", e),
        }
        if e.is_user_facing() {
            self.send(&UiMessage::ShowMessage { message: e.to_string() });
        }
    }

    fn dispatch(&mut self, event: UiEvent) -> CameraResult<EventResponse> {
        let response = match event {
            UiEvent::SetEyeLevel { eye_level, snap } => {
                let document = self.document.as_deref();
                let ui = self.ui.as_mut();
                let camera = &self.camera;
                let moved = self.eye_level.handle_set_eye_level(
                    eye_level,
                    snap,
                    self.viewport.as_mut(),
                    document,
                    &mut self.applier,
                    |step| send_telemetry(&mut *ui, step, document, camera),
                )?;
                EventResponse::changed(moved)
            }
            UiEvent::ToggleEyeLevelLock { enabled, eye_level } => {
                self.eye_level
                    .toggle_lock(enabled, eye_level, self.viewport.as_mut(), &mut self.prefs);
                self.persist_prefs();
                self.send(&UiMessage::EyeLevelLockStatus { enabled });
                EventResponse::default()
            }
            UiEvent::SetEye { point } => {
                self.camera
                    .set_eye_to_point(selection_point(point), self.viewport.as_mut(), self.document.as_deref())?;
                EventResponse::changed(true)
            }
            UiEvent::SetTarget { point } => {
                self.camera
                    .set_target_to_point(selection_point(point), self.viewport.as_mut(), self.document.as_deref())?;
                EventResponse::changed(true)
            }
            UiEvent::FusionDefault => {
                self.camera.apply_default_lens(self.viewport.as_mut(), &mut self.applier)?;
                EventResponse::changed(true)
            }
            UiEvent::FitToView => {
                self.camera.fit(self.viewport.as_mut())?;
                EventResponse::changed(true)
            }
            UiEvent::ResetView => {
                let reset = self.camera.reset(self.viewport.as_mut(), &mut self.applier)?;
                if reset {
                    self.send_camera_mode();
                }
                EventResponse::changed(reset)
            }
            UiEvent::UpdateCameraData => EventResponse::changed(true),
            UiEvent::PauseTelemetry => {
                self.camera.set_telemetry_paused(true);
                EventResponse::default()
            }
            UiEvent::ResumeTelemetry => {
                self.camera.set_telemetry_paused(false);
                EventResponse::changed(true)
            }
            UiEvent::NamedViewSelected { index } => {
                self.views.apply_named_view(
                    index,
                    self.viewport.as_mut(),
                    self.document.as_deref(),
                    &mut self.applier,
                )?;
                self.send_camera_mode();
                EventResponse::changed(true)
            }
            UiEvent::SaveView { name } => {
                let saved =
                    self.views
                        .save_named_view(name.as_deref(), self.viewport.as_ref(), self.document.as_deref_mut())?;
                info!("Saved named view '{}'", saved);
                self.send_named_views_if_changed();
                EventResponse::default()
            }
            UiEvent::CopyView => {
                self.views.copy_view(self.viewport.as_ref(), self.document.as_deref())?;
                EventResponse::default()
            }
            UiEvent::PasteView => {
                self.views.paste_view(
                    self.viewport.as_mut(),
                    self.document.as_deref(),
                    &mut self.applier,
                    self.eye_level.is_locked(),
                )?;
                self.send_camera_mode();
                EventResponse::changed(true)
            }
            UiEvent::AspectRatioChanged { aspect_ratio } => {
                self.prefs.aspect_ratio = aspect_ratio;
                self.persist_prefs();
                EventResponse::default()
            }
            UiEvent::SetGridOverlay { kind, enabled } => {
                match kind {
                    GridKind::Halves => self.prefs.grid_halves = enabled,
                    GridKind::Thirds => self.prefs.grid_thirds = enabled,
                    GridKind::Quarters => self.prefs.grid_quarters = enabled,
                }
                self.persist_prefs();
                EventResponse::default()
            }
            UiEvent::DarkModeChanged { dark_mode } => {
                self.prefs.dark_mode = dark_mode;
                self.persist_prefs();
                EventResponse::default()
            }
            UiEvent::ClosePalette => EventResponse {
                camera_changed: false,
                exit: true,
            },
            // Slider edits are routed through the pending buffer before dispatch.
            other => {
                warn!("Unrouted palette event {:?}", other);
                EventResponse::default()
            }
        };
        Ok(response)
    }

    /// Apply whatever the pending buffer holds. Returns true if the camera was
    /// written.
    pub fn flush(&mut self) -> bool {
        if self.closed {
            return false;
        }
        let pending = self.pending.take();
        if pending.is_empty() {
            return false;
        }
        let changes_projection = pending.projection.is_some();
        let result = self.camera.apply_pending(
            pending,
            self.viewport.as_mut(),
            self.document.as_deref(),
            &mut self.applier,
            self.eye_level.is_locked(),
        );
        match result {
            Ok(()) => {
                if changes_projection {
                    self.send_camera_mode();
                }
                self.push_telemetry();
                true
            }
            Err(e) => {
                self.report(&e);
                false
            }
        }
    }

    /// Run one scheduler tick. Skipped while a camera apply is in flight.
    pub fn on_tick(&mut self, tick: Tick, now: Instant) {
        if self.closed {
            return;
        }
        if self.applier.is_busy() {
            debug!("Camera apply in progress, skipping {:?} tick", tick);
            return;
        }
        self.send_dropdown_reset_if_requested();
        match tick {
            Tick::Telemetry => {
                if !self.camera.is_telemetry_paused() {
                    self.push_telemetry();
                }
            }
            Tick::Poll => {
                self.send_named_views_if_changed();
                if let Some((width, height)) = self.viewport_size.observe(self.viewport.size()) {
                    self.send(&UiMessage::ViewportSize { width, height });
                }
                self.correct_eye_level(now);
            }
        }
    }

    fn correct_eye_level(&mut self, now: Instant) {
        let document = self.document.as_deref();
        let ui = self.ui.as_mut();
        let camera = &self.camera;
        let result = self.eye_level.check_passive_correction(
            now,
            self.viewport.as_mut(),
            document,
            &mut self.applier,
            |step| send_telemetry(&mut *ui, step, document, camera),
        );
        if let Err(e) = result {
            self.report(&e);
        }
    }

    /// Switch to another document (or none). Bounds, the named-view cache and
    /// the palette are refreshed.
    pub fn set_document(&mut self, document: Option<Box<dyn Document>>) {
        self.document = document;
        let bounds = self.camera.update_distance_bounds(self.document.as_deref());
        debug!(
            "Document switched, distance bounds {:.3}..{:.3}",
            bounds.min_distance, bounds.max_distance
        );
        self.resend_all();
    }

    /// Drop host subscriptions. A persisted eye-level lock stays persisted.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.views.detach(self.viewport.as_mut());
        self.eye_level.detach(self.viewport.as_mut());
        self.closed = true;
        info!("Camera session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
