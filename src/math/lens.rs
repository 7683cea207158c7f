// Pinhole lens conversions between horizontal field of view and focal length.

/// Full-frame 35mm sensor width.
pub const DEFAULT_SENSOR_WIDTH_MM: f64 = 36.0;

/// Fusion's stock perspective angle.
pub const FUSION_DEFAULT_FOV_DEG: f64 = 22.62;

/// f = w / (2 tan(fov / 2))
pub fn fov_to_focal_length(fov_deg: f64, sensor_width: f64) -> f64 {
    sensor_width / (2.0 * (fov_deg.to_radians() / 2.0).tan())
}

/// fov = 2 atan(w / 2f)
pub fn focal_length_to_fov(focal_length: f64, sensor_width: f64) -> f64 {
    (2.0 * (sensor_width / (2.0 * focal_length)).atan()).to_degrees()
}
