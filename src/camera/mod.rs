pub mod apply;
pub mod controller;
pub mod payload;
pub mod state;
pub mod telemetry;

pub use apply::{ApplyMode, ApplyPhase, ApplyStatus, CameraApplier};
pub use controller::{CameraController, PendingBuffer};
pub use payload::{
    CameraPayload, CanonicalCamera, LensChange, PendingUpdate, PropertyChange, build_payload,
    build_payload_from_canonical,
};
pub use state::{CameraState, InitialState, ProjectionType, Xyz};
pub use telemetry::{TelemetrySnapshot, gather_telemetry};
