use std::time::Duration;

use anyhow::Context;
use log::{info, warn};
use nalgebra_glm as glm;

use camera_tools::camera::CameraState;
use camera_tools::host::messages::Slider;
use camera_tools::host::{MemoryDocument, MemoryViewport, UiChannel, UiEvent, UiMessage};
use camera_tools::settings::PrefsStore;
use camera_tools::{Scheduler, Session};

/// Palette stand-in that logs every outbound message.
struct LogUi;

impl UiChannel for LogUi {
    fn send(&mut self, message: &UiMessage) -> bool {
        match message.to_json() {
            Ok(json) => info!("-> {}", json),
            Err(e) => warn!("Could not encode {:?}: {}", message, e),
        }
        true
    }
}

fn load_script(path: &str) -> anyhow::Result<Vec<UiEvent>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading event script {}", path))?;
    let events = serde_json::from_str(&text).with_context(|| format!("parsing event script {}", path))?;
    Ok(events)
}

fn demo_script() -> Vec<UiEvent> {
    vec![
        UiEvent::UpdateCameraData,
        UiEvent::DistanceChanged(Slider { value: 120.0 }),
        UiEvent::AzimuthChanged(Slider { value: -45.0 }),
        UiEvent::FovChanged(Slider { value: 35.0 }),
        UiEvent::SaveView { name: None },
        UiEvent::CopyView,
        UiEvent::SetEyeLevel {
            eye_level: 30.0,
            snap: true,
        },
        UiEvent::FusionDefault,
        UiEvent::PasteView,
        UiEvent::NamedViewSelected { index: 0 },
        UiEvent::ResetView,
    ]
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Optional JSON array of palette events to replay
    let args: Vec<String> = std::env::args().collect();
    let script = match args.get(1) {
        Some(path) => load_script(path)?,
        None => demo_script(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

    let viewport = MemoryViewport::new(CameraState::default());
    let document = MemoryDocument::new(glm::vec3(0.0, 0.0, 1.0));
    let mut session = Session::open(
        Box::new(viewport),
        Some(Box::new(document)),
        Box::new(LogUi),
        PrefsStore::AppConfig,
    );

    runtime.block_on(async {
        let mut scheduler = Scheduler::new(&session);
        scheduler.start_tickers();
        let handle = scheduler.handle();

        tokio::spawn(async move {
            for event in script {
                if !handle.submit(event) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
            handle.shutdown();
        });

        scheduler.run(&mut session).await;
    });

    Ok(())
}
