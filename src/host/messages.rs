// Palette wire format: `{"action": ..., "data": ...}` in both directions.

use serde::{Deserialize, Serialize};

use crate::camera::{PropertyChange, ProjectionType, TelemetrySnapshot};
use crate::math::Point3;
use crate::settings::Preferences;

/// Value of a slider edit. The palette sends either `{"value": n}` or the
/// property's own key.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Slider<T> {
    #[serde(
        alias = "distance",
        alias = "azimuth",
        alias = "inclination",
        alias = "fov",
        alias = "focalLength",
        alias = "dolly",
        alias = "pan",
        alias = "tilt",
        alias = "cameraType"
    )]
    pub value: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GridKind {
    Halves,
    Thirds,
    Quarters,
}

/// Inbound palette action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum UiEvent {
    CameraTypeChanged(Slider<ProjectionType>),
    DistanceChanged(Slider<f64>),
    AzimuthChanged(Slider<f64>),
    InclinationChanged(Slider<f64>),
    FovChanged(Slider<f64>),
    FocalLengthChanged(Slider<f64>),
    DollyChanged(Slider<f64>),
    PanChanged(Slider<f64>),
    TiltChanged(Slider<f64>),
    #[serde(rename_all = "camelCase")]
    SetEyeLevel {
        eye_level: f64,
        #[serde(default)]
        snap: bool,
    },
    #[serde(rename_all = "camelCase")]
    ToggleEyeLevelLock {
        enabled: bool,
        #[serde(default)]
        eye_level: f64,
    },
    /// Selected construction point, if any.
    SetEye {
        #[serde(default)]
        point: Option<[f64; 3]>,
    },
    SetTarget {
        #[serde(default)]
        point: Option<[f64; 3]>,
    },
    FusionDefault,
    FitToView,
    ResetView,
    UpdateCameraData,
    PauseTelemetry,
    ResumeTelemetry,
    NamedViewSelected {
        index: usize,
    },
    SaveView {
        #[serde(default)]
        name: Option<String>,
    },
    CopyView,
    PasteView,
    #[serde(rename_all = "camelCase")]
    AspectRatioChanged {
        aspect_ratio: String,
    },
    SetGridOverlay {
        #[serde(rename = "type")]
        kind: GridKind,
        enabled: bool,
    },
    #[serde(rename_all = "camelCase")]
    DarkModeChanged {
        dark_mode: bool,
    },
    ClosePalette,
}

impl UiEvent {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Slider edits that go through the coalescing pending buffer.
    pub fn property_change(&self) -> Option<PropertyChange> {
        let change = match self {
            UiEvent::CameraTypeChanged(s) => PropertyChange::Projection(s.value),
            UiEvent::DistanceChanged(s) => PropertyChange::Distance(s.value),
            UiEvent::AzimuthChanged(s) => PropertyChange::Azimuth(s.value),
            UiEvent::InclinationChanged(s) => PropertyChange::Inclination(s.value),
            UiEvent::FovChanged(s) => PropertyChange::Fov(s.value),
            UiEvent::FocalLengthChanged(s) => PropertyChange::FocalLength(s.value),
            UiEvent::DollyChanged(s) => PropertyChange::Dolly(s.value),
            UiEvent::PanChanged(s) => PropertyChange::Pan(s.value),
            UiEvent::TiltChanged(s) => PropertyChange::Tilt(s.value),
            _ => return None,
        };
        Some(change)
    }
}

pub fn selection_point(point: Option<[f64; 3]>) -> Option<Point3> {
    point.map(|[x, y, z]| crate::math::point(x, y, z))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedViewEntry {
    pub index: usize,
    pub name: String,
}

/// Outbound palette message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum UiMessage {
    UpdateCameraData(Box<TelemetrySnapshot>),
    #[serde(rename_all = "camelCase")]
    UpdateCameraMode {
        camera_mode: String,
    },
    #[serde(rename_all = "camelCase")]
    PopulateNamedViews {
        named_views: Vec<NamedViewEntry>,
    },
    ResetNamedViewDropdown {},
    EyeLevelLockStatus {
        enabled: bool,
    },
    #[serde(rename = "sendPrefs")]
    Preferences(Preferences),
    ViewportSize {
        width: u32,
        height: u32,
    },
    ShowMessage {
        message: String,
    },
}

impl UiMessage {
    pub fn camera_mode(projection: ProjectionType) -> Self {
        UiMessage::UpdateCameraMode {
            camera_mode: projection.label().to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slider_accepts_value_or_property_key() {
        let a = UiEvent::from_json(r#"{"action":"distanceChanged","data":{"value":12.5}}"#).unwrap();
        let b = UiEvent::from_json(r#"{"action":"distanceChanged","data":{"distance":12.5}}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.property_change(), Some(PropertyChange::Distance(12.5)));
    }

    #[test]
    fn camera_type_is_numeric() {
        let event = UiEvent::from_json(r#"{"action":"cameraTypeChanged","data":{"cameraType":0}}"#).unwrap();
        assert_eq!(
            event.property_change(),
            Some(PropertyChange::Projection(ProjectionType::Orthographic))
        );
    }

    #[test]
    fn unit_and_struct_actions_parse() {
        assert_eq!(UiEvent::from_json(r#"{"action":"copyView"}"#).unwrap(), UiEvent::CopyView);
        let lock = UiEvent::from_json(r#"{"action":"toggleEyeLevelLock","data":{"enabled":true,"eyeLevel":50}}"#).unwrap();
        assert_eq!(
            lock,
            UiEvent::ToggleEyeLevelLock {
                enabled: true,
                eye_level: 50.0
            }
        );
        let grid = UiEvent::from_json(r#"{"action":"setGridOverlay","data":{"type":"thirds","enabled":true}}"#).unwrap();
        assert_eq!(
            grid,
            UiEvent::SetGridOverlay {
                kind: GridKind::Thirds,
                enabled: true
            }
        );
        assert!(lock.property_change().is_none());
    }

    #[test]
    fn unknown_action_is_an_error() {
        assert!(UiEvent::from_json(r#"{"action":"htmlTest","data":{}}"#).is_err());
    }

    #[test]
    fn outbound_messages_use_action_and_data() {
        let value = serde_json::to_value(UiMessage::camera_mode(ProjectionType::Orthographic)).unwrap();
        assert_eq!(
            value,
            json!({"action": "updateCameraMode", "data": {"cameraMode": "Orthographic"}})
        );
        let value = serde_json::to_value(UiMessage::ResetNamedViewDropdown {}).unwrap();
        assert_eq!(value, json!({"action": "resetNamedViewDropdown", "data": {}}));
    }
}
