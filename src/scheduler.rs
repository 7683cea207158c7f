// Two periodic tickers and a task queue drained on the thread owning the
// session. Tickers never touch the camera; they only post work.

use std::time::Duration;

use log::{debug, info};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::camera::PendingBuffer;
use crate::error::CameraResult;
use crate::host::UiEvent;
use crate::session::{Session, Tick};

#[derive(Debug)]
pub enum Task {
    Ui(UiEvent),
    /// Apply the pending buffer.
    Flush,
    Tick(Tick),
    Shutdown,
}

/// Cloneable intake for palette events.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tasks: UnboundedSender<Task>,
    pending: PendingBuffer,
}

impl SessionHandle {
    /// Queue a palette event. Slider edits are merged into the pending buffer
    /// and only the first edit into an empty buffer queues a flush.
    ///
    /// Returns false once the scheduler has stopped.
    pub fn submit(&self, event: UiEvent) -> bool {
        if let Some(change) = event.property_change() {
            if !self.pending.push(change) {
                return !self.tasks.is_closed();
            }
            return self.tasks.send(Task::Flush).is_ok();
        }
        self.tasks.send(Task::Ui(event)).is_ok()
    }

    pub fn submit_json(&self, json: &str) -> CameraResult<bool> {
        Ok(self.submit(UiEvent::from_json(json)?))
    }

    pub fn shutdown(&self) {
        let _ = self.tasks.send(Task::Shutdown);
    }
}

pub struct Scheduler {
    tasks_tx: UnboundedSender<Task>,
    tasks_rx: UnboundedReceiver<Task>,
    pending: PendingBuffer,
    telemetry_period: Duration,
    poll_period: Duration,
    tickers: Vec<JoinHandle<()>>,
}

fn spawn_ticker(tasks: UnboundedSender<Task>, period: Duration, tick: Tick) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            if tasks.send(Task::Tick(tick)).is_err() {
                break;
            }
        }
    })
}

impl Scheduler {
    pub fn new(session: &Session) -> Self {
        let (tasks_tx, tasks_rx) = mpsc::unbounded_channel();
        Self {
            tasks_tx,
            tasks_rx,
            pending: session.pending(),
            telemetry_period: session.tuning().telemetry_period(),
            poll_period: session.tuning().poll_period(),
            tickers: Vec::new(),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            tasks: self.tasks_tx.clone(),
            pending: self.pending.clone(),
        }
    }

    /// Spawn the telemetry and poll tickers. Must be called inside a tokio runtime.
    pub fn start_tickers(&mut self) {
        if !self.tickers.is_empty() {
            return;
        }
        debug!(
            "Starting tickers: telemetry every {:?}, poll every {:?}",
            self.telemetry_period, self.poll_period
        );
        self.tickers
            .push(spawn_ticker(self.tasks_tx.clone(), self.telemetry_period, Tick::Telemetry));
        self.tickers
            .push(spawn_ticker(self.tasks_tx.clone(), self.poll_period, Tick::Poll));
    }

    /// Drain tasks into `session` until shutdown, palette close or every
    /// handle is gone.
    pub async fn run(self, session: &mut Session) {
        let Scheduler {
            tasks_tx,
            mut tasks_rx,
            tickers,
            ..
        } = self;
        drop(tasks_tx);

        while let Some(task) = tasks_rx.recv().await {
            match task {
                Task::Ui(event) => {
                    session.handle_event(event);
                }
                Task::Flush => {
                    session.flush();
                }
                Task::Tick(tick) => session.on_tick(tick, time::Instant::now().into_std()),
                Task::Shutdown => break,
            }
            if session.is_closed() {
                break;
            }
        }

        for ticker in tickers {
            ticker.abort();
        }
        tasks_rx.close();
        session.close();
        info!("Scheduler stopped");
    }
}
