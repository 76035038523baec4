//! OS game controller backend.
//!
//! gilrs delivers press/release events on its own schedule, so a worker thread
//! folds them into a full [`Buttons`] snapshot and parks the latest one in a
//! [`SampleSlot`] for the next poll to pick up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use gilrs::{Button, Event, EventType, Gilrs};
use statum::{machine, state};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{LinkError, PeripheralLink, SampleKind, SampleSlot};
use crate::face::Buttons;

const IDLE_SLEEP: Duration = Duration::from_millis(1);

#[state]
#[derive(Debug, Clone)]
pub enum BackendState {
    Starting,
    Forwarding,
}

#[machine]
#[derive(Debug)]
struct GilrsBackend<S: BackendState> {
    gilrs: Gilrs,
    pressed: Buttons,
    slot: SampleSlot<u8>,
    connected: Arc<AtomicBool>,
}

impl GilrsBackend<Starting> {
    fn create(slot: SampleSlot<u8>, connected: Arc<AtomicBool>) -> Result<Self, LinkError> {
        let gilrs = Gilrs::new().map_err(|e| {
            error!("Failed to initialize gilrs: {}", e);
            LinkError::Backend(e.to_string())
        })?;
        Ok(Self::new(gilrs, Buttons::empty(), slot, connected))
    }

    fn initialize(self) -> GilrsBackend<Forwarding> {
        let mut found = false;
        for (id, gamepad) in self.gilrs.gamepads() {
            info!("Found gamepad [{}] {}", id, gamepad.name());
            found = true;
        }
        if !found {
            warn!("No gamepad connected, waiting for one");
        }
        self.connected.store(found, Ordering::Release);
        self.transition()
    }
}

impl GilrsBackend<Forwarding> {
    fn run(mut self, cancel: CancellationToken) {
        info!("Gamepad backend forwarding events");
        while !cancel.is_cancelled() {
            while let Some(Event { event, .. }) = self.gilrs.next_event() {
                self.apply(event);
            }
            thread::sleep(IDLE_SLEEP);
        }
        info!("Gamepad backend stopped");
    }

    fn apply(&mut self, event: EventType) {
        match event {
            EventType::ButtonPressed(button, _) => {
                if let Some(mapped) = map_button(button) {
                    self.pressed.insert(mapped);
                    self.publish();
                }
            }
            EventType::ButtonReleased(button, _) => {
                if let Some(mapped) = map_button(button) {
                    self.pressed.remove(mapped);
                    self.publish();
                }
            }
            EventType::Connected => {
                info!("Gamepad connected");
                self.connected.store(true, Ordering::Release);
            }
            EventType::Disconnected => {
                warn!("Gamepad disconnected");
                self.connected.store(false, Ordering::Release);
                self.pressed = Buttons::empty();
                self.publish();
            }
            _ => {}
        }
    }

    fn publish(&self) {
        debug!("Gamepad snapshot {:#04x}", self.pressed.bits());
        self.slot.offer(self.pressed.bits());
    }
}

fn map_button(button: Button) -> Option<Buttons> {
    match button {
        Button::DPadUp => Some(Buttons::UP),
        Button::DPadDown => Some(Buttons::DOWN),
        Button::DPadLeft => Some(Buttons::LEFT),
        Button::DPadRight => Some(Buttons::RIGHT),
        Button::South => Some(Buttons::A),
        Button::East => Some(Buttons::B),
        Button::Select => Some(Buttons::SELECT),
        Button::Start => Some(Buttons::START),
        _ => None,
    }
}

/// [`PeripheralLink`] backed by the first OS game controller gilrs reports.
#[derive(Debug)]
pub struct GilrsLink {
    slot: SampleSlot<u8>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl GilrsLink {
    /// Starts the backend thread; it stops when `cancel` fires or the link is
    /// dropped.
    pub fn spawn(cancel: CancellationToken) -> Result<Self, LinkError> {
        let slot = SampleSlot::new();
        let connected = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker_slot = slot.clone();
        let worker_connected = Arc::clone(&connected);
        let worker_cancel = cancel.clone();
        let worker = thread::Builder::new()
            .name("faces-gilrs".to_string())
            .spawn(move || {
                let backend = match GilrsBackend::create(worker_slot, worker_connected) {
                    Ok(backend) => backend,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let forwarding = backend.initialize();
                let _ = ready_tx.send(Ok(()));
                forwarding.run(worker_cancel);
            })
            .map_err(|e| LinkError::Backend(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|e| LinkError::Disconnected(e.to_string()))??;

        Ok(Self {
            slot,
            connected,
            cancel,
            worker: Some(worker),
        })
    }
}

impl PeripheralLink for GilrsLink {
    fn probe(&mut self) -> Result<bool, LinkError> {
        Ok(self.connected.load(Ordering::Acquire))
    }

    fn poll_byte(&mut self) -> Result<Option<u8>, LinkError> {
        Err(LinkError::Unsupported(SampleKind::Byte))
    }

    fn poll_bitmask(&mut self) -> Result<Option<u8>, LinkError> {
        if self.worker.as_ref().is_some_and(JoinHandle::is_finished) {
            return Err(LinkError::Disconnected("gamepad backend exited".to_string()));
        }
        Ok(self.slot.take())
    }

    fn drain(&mut self, _kind: SampleKind) -> usize {
        usize::from(self.slot.take().is_some())
    }
}

impl Drop for GilrsLink {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Gamepad backend thread panicked");
            }
        }
    }
}
