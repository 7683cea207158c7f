use std::time::Duration;

use nalgebra_glm as glm;

use camera_tools::camera::{CameraState, ProjectionType};
use camera_tools::host::{MemoryDocument, MemoryViewport, RecordingUi, UiMessage, Viewport};
use camera_tools::math::point;
use camera_tools::settings::{Preferences, PrefsStore, TuningSettings};
use camera_tools::{Scheduler, Session};

fn open(viewport: &MemoryViewport, ui: &RecordingUi, dir: &tempfile::TempDir) -> Session {
    Session::with_settings(
        Box::new(viewport.clone()),
        Some(Box::new(MemoryDocument::new(glm::vec3(0.0, 0.0, 1.0)))),
        Box::new(ui.clone()),
        PrefsStore::Directory(dir.path().to_path_buf()),
        Preferences::default(),
        TuningSettings {
            animate_eye_level: false,
            sanitize_settle_ms: 0,
            ..TuningSettings::default()
        },
    )
}

#[tokio::test(start_paused = true)]
async fn palette_json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let viewport = MemoryViewport::new(CameraState::new(
        point(0.0, -100.0, 40.0),
        point(0.0, 0.0, 40.0),
        glm::vec3(0.0, 0.0, 1.0),
        40.0,
        ProjectionType::Perspective,
    ));
    let ui = RecordingUi::new();
    let mut session = open(&viewport, &ui, &dir);
    ui.take();

    let mut scheduler = Scheduler::new(&session);
    scheduler.start_tickers();
    let handle = scheduler.handle();

    let script = [
        r#"{"action":"distanceChanged","data":{"distance":150}}"#,
        r#"{"action":"distanceChanged","data":{"value":200}}"#,
        r#"{"action":"saveView","data":{"name":"Wide"}}"#,
        r#"{"action":"toggleEyeLevelLock","data":{"enabled":true,"eyeLevel":40}}"#,
    ];
    for json in script {
        assert!(handle.submit_json(json).unwrap());
    }
    assert!(handle.submit_json(r#"{"action":"nope"}"#).is_err());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.submit_json(r#"{"action":"closePalette"}"#).unwrap();
    });
    scheduler.run(&mut session).await;

    let live = viewport.camera().unwrap();
    assert!((glm::distance(&live.eye, &live.target) - 200.0).abs() < 1e-9);
    assert!(session.prefs().eye_level_locked);
    assert!(session.is_closed());
    assert_eq!(viewport.subscriber_count(), 0);

    let messages = ui.take();
    assert!(messages.contains(&UiMessage::EyeLevelLockStatus { enabled: true }));
    assert!(messages.iter().any(|m| matches!(
        m,
        UiMessage::PopulateNamedViews { named_views } if named_views.len() == 1 && named_views[0].name == "Wide"
    )));
}
