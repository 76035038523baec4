//! Polling session: owns one attached face and drives it at a fixed cadence.
//!
//! ```text
//! InputSession<Probing> ──begin()──► InputSession<Running> ──run()──► watch<InputSnapshot>
//! ```
//!
//! The face is passed in by value, so there is no global peripheral instance;
//! whoever owns the session owns the hardware.

use std::time::Duration;

use chrono::{DateTime, Local};
use statum::{machine, state};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_POLL_INTERVAL_MS;
use crate::face::{FaceEvent, FaceKind, Faces, Gamepad, PollableInput};
use crate::link::BoxedLink;

#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub poll_interval_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// What one poll produced, as published to subscribers.
#[derive(Clone, Debug)]
pub struct InputSnapshot {
    pub kind: FaceKind,
    /// Number of polls so far; 0 before the first one.
    pub sequence: u64,
    pub available: bool,
    pub raw: u8,
    pub event: Option<FaceEvent>,
    pub timestamp: DateTime<Local>,
}

impl InputSnapshot {
    fn initial(kind: FaceKind) -> Self {
        Self {
            kind,
            sequence: 0,
            available: false,
            raw: 0,
            event: None,
            timestamp: Local::now(),
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum SessionState {
    Probing,
    Running,
}

#[machine]
#[derive(Debug)]
pub struct InputSession<S: SessionState> {
    faces: Faces<BoxedLink>,
    settings: SessionSettings,
    snapshot_sender: watch::Sender<InputSnapshot>,
    sequence: u64,
}

impl<S: SessionState> InputSession<S> {
    pub fn subscribe(&self) -> watch::Receiver<InputSnapshot> {
        self.snapshot_sender.subscribe()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn kind(&self) -> FaceKind {
        self.faces.kind()
    }

    pub fn faces(&self) -> &Faces<BoxedLink> {
        &self.faces
    }

    /// Gamepad timing can be changed in any state.
    pub fn gamepad_mut(&mut self) -> Option<&mut Gamepad<BoxedLink>> {
        self.faces.as_gamepad_mut()
    }
}

impl InputSession<Probing> {
    pub fn create(faces: Faces<BoxedLink>, settings: Option<SessionSettings>) -> Self {
        let settings = settings.unwrap_or_default();
        info!(
            "Creating {} session polling every {}ms",
            faces.kind(),
            settings.poll_interval_ms
        );
        let (snapshot_sender, _) = watch::channel(InputSnapshot::initial(faces.kind()));
        Self::new(faces, settings, snapshot_sender, 0)
    }

    /// Probes the peripheral. On failure the session is handed back unchanged
    /// so the caller can decide whether to probe again.
    pub fn begin(mut self) -> Result<InputSession<Running>, Self> {
        if !self.faces.begin() {
            warn!("{} not found", self.faces.kind());
            return Err(self);
        }
        info!("{} session running", self.faces.kind());
        Ok(self.transition())
    }
}

impl InputSession<Running> {
    /// One poll; the snapshot is also published to subscribers.
    pub fn poll(&mut self) -> InputSnapshot {
        self.faces.update();
        self.sequence += 1;

        let snapshot = InputSnapshot {
            kind: self.faces.kind(),
            sequence: self.sequence,
            available: self.faces.available(),
            raw: self.faces.raw(),
            event: self.faces.event(),
            timestamp: Local::now(),
        };
        if let Some(event) = snapshot.event {
            debug!("Poll {}: {:?}", snapshot.sequence, event);
        }
        self.snapshot_sender.send_replace(snapshot.clone());
        snapshot
    }

    /// Polls on the configured cadence until `cancel` fires, then hands the
    /// face back.
    pub async fn run(mut self, cancel: CancellationToken) -> Faces<BoxedLink> {
        let period = Duration::from_millis(self.settings.poll_interval_ms.max(1));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Polling loop started");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.poll();
                }
            }
        }
        info!("Polling loop stopped after {} polls", self.sequence);
        self.faces
    }
}
