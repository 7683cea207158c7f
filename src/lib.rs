pub mod camera;
pub mod error;
pub mod eye_level;
pub mod host;
pub mod math;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod views;

pub use error::{CameraError, CameraResult};
pub use scheduler::{Scheduler, SessionHandle};
pub use session::{Session, Tick};

/// Application name used for the platform config directory.
pub const CONFY_APP_NAME: &str = "camera-tools";
