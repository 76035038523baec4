//! Decoders for the three Faces peripherals.
//!
//! Every face owns a [`Face`] poller plus its own derived state:
//!
//! 1. [`keyboard`] - bytes to keys, CR+LF merged into one Enter
//! 2. [`calculator`] - bytes to digits and function codes
//! 3. [`gamepad`] - button snapshots to edges, holds and software repeat
//!
//! [`Faces`] wraps the three so an application can hold "whichever face is
//! attached" without dynamic dispatch.

pub mod calculator;
pub mod gamepad;
pub mod keyboard;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::link::{PeripheralLink, RawSample, SampleKind};

pub use calculator::{CalcFunction, CalcInput, Calculator, FUNCTION_BIT};
pub use gamepad::{Button, ButtonTiming, Buttons, Gamepad, GamepadReport, UnknownButton};
pub use keyboard::{Key, Keyboard, SpecialKey};

/// Probes for any Faces peripheral and discards whatever it had queued.
///
/// The type of face cannot be told from the probe alone.
pub fn exists<L: PeripheralLink>(link: &mut L, kind: SampleKind) -> bool {
    match link.probe() {
        Ok(true) => {
            let dropped = link.drain(kind);
            if dropped > 0 {
                debug!("Dismissed {} stale samples", dropped);
            }
            true
        }
        Ok(false) => {
            warn!("Faces peripheral not found");
            false
        }
        Err(e) => {
            warn!("Faces probe failed: {}", e);
            false
        }
    }
}

/// Lifecycle of a [`Face`]. Never goes backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Began,
    Polling,
}

/// Common surface of every face.
pub trait PollableInput {
    /// One-time probe; true once the peripheral has answered.
    fn begin(&mut self) -> bool;

    /// Exactly one poll of the peripheral.
    fn update(&mut self);

    /// Did this poll produce a usable sample?
    fn available(&self) -> bool;

    /// Payload of the most recent usable sample.
    fn raw(&self) -> u8;
}

/// Base poller shared by the decoders: availability, raw payload, lifecycle.
#[derive(Debug)]
pub struct Face<L> {
    link: L,
    kind: SampleKind,
    lifecycle: Lifecycle,
    available: bool,
    raw: u8,
    // Set while polls keep failing, so the warning is logged once per outage.
    link_failing: bool,
}

impl<L: PeripheralLink> Face<L> {
    pub fn new(link: L, kind: SampleKind) -> Self {
        Self {
            link,
            kind,
            lifecycle: Lifecycle::Uninitialized,
            available: false,
            raw: 0,
            link_failing: false,
        }
    }

    pub fn begin(&mut self) -> bool {
        if self.lifecycle != Lifecycle::Uninitialized {
            return true;
        }
        if !exists(&mut self.link, self.kind) {
            return false;
        }
        info!("Faces peripheral found, polling {:?} samples", self.kind);
        self.lifecycle = Lifecycle::Began;
        true
    }

    pub fn update(&mut self) {
        self.available = false;
        if self.lifecycle == Lifecycle::Uninitialized {
            return;
        }
        self.lifecycle = Lifecycle::Polling;

        match self.link.poll(self.kind) {
            Ok(sample) => {
                if self.link_failing {
                    info!("Link recovered");
                    self.link_failing = false;
                }
                if let Some(sample) = sample {
                    trace!("Sample {:?}", sample);
                    self.raw = sample.payload();
                    self.available = true;
                }
            }
            Err(e) if self.link_failing => debug!("Poll still failing: {}", e),
            Err(e) => {
                warn!("Poll failed: {}", e);
                self.link_failing = true;
            }
        }
    }

    /// True while the link keeps returning errors.
    pub fn is_link_failing(&self) -> bool {
        self.link_failing
    }

    pub fn available(&self) -> bool {
        self.available
    }

    pub fn raw(&self) -> u8 {
        self.raw
    }

    /// The sample of this poll, if one arrived.
    pub fn sample(&self) -> Option<RawSample> {
        if !self.available {
            return None;
        }
        Some(match self.kind {
            SampleKind::Byte => RawSample::Byte(self.raw),
            SampleKind::Bitmask => RawSample::Bitmask(self.raw),
        })
    }

    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn has_begun(&self) -> bool {
        self.lifecycle != Lifecycle::Uninitialized
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_link(self) -> L {
        self.link
    }

    pub(crate) fn set_raw(&mut self, raw: u8) {
        self.raw = raw;
    }

    pub(crate) fn mark_unavailable(&mut self) {
        self.available = false;
    }
}

/// Which peripheral is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceKind {
    #[default]
    Keyboard,
    Calculator,
    Gamepad,
}

impl FaceKind {
    pub fn sample_kind(self) -> SampleKind {
        match self {
            FaceKind::Keyboard | FaceKind::Calculator => SampleKind::Byte,
            FaceKind::Gamepad => SampleKind::Bitmask,
        }
    }
}

impl fmt::Display for FaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaceKind::Keyboard => "keyboard",
            FaceKind::Calculator => "calculator",
            FaceKind::Gamepad => "gamepad",
        };
        f.write_str(name)
    }
}

/// Semantic result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceEvent {
    Key(Key),
    Calculator(CalcInput),
    Gamepad(GamepadReport),
}

/// Whichever face is attached, each variant owning its own buffers.
#[derive(Debug)]
pub enum Faces<L> {
    Keyboard(Keyboard<L>),
    Calculator(Calculator<L>),
    Gamepad(Gamepad<L>),
}

impl<L: PeripheralLink> Faces<L> {
    pub fn new(kind: FaceKind, link: L) -> Self {
        match kind {
            FaceKind::Keyboard => Faces::Keyboard(Keyboard::new(link)),
            FaceKind::Calculator => Faces::Calculator(Calculator::new(link)),
            FaceKind::Gamepad => Faces::Gamepad(Gamepad::new(link)),
        }
    }

    pub fn kind(&self) -> FaceKind {
        match self {
            Faces::Keyboard(_) => FaceKind::Keyboard,
            Faces::Calculator(_) => FaceKind::Calculator,
            Faces::Gamepad(_) => FaceKind::Gamepad,
        }
    }

    /// Decoded event of the latest poll, if it produced one.
    pub fn event(&self) -> Option<FaceEvent> {
        match self {
            Faces::Keyboard(kbd) => kbd.key().map(FaceEvent::Key),
            Faces::Calculator(calc) => calc.input().map(FaceEvent::Calculator),
            Faces::Gamepad(pad) => {
                let report = pad.report();
                (pad.available() || report.has_activity()).then_some(FaceEvent::Gamepad(report))
            }
        }
    }

    pub fn as_gamepad_mut(&mut self) -> Option<&mut Gamepad<L>> {
        match self {
            Faces::Gamepad(pad) => Some(pad),
            _ => None,
        }
    }
}

impl<L: PeripheralLink> PollableInput for Faces<L> {
    fn begin(&mut self) -> bool {
        match self {
            Faces::Keyboard(kbd) => kbd.begin(),
            Faces::Calculator(calc) => calc.begin(),
            Faces::Gamepad(pad) => pad.begin(),
        }
    }

    fn update(&mut self) {
        match self {
            Faces::Keyboard(kbd) => kbd.update(),
            Faces::Calculator(calc) => calc.update(),
            Faces::Gamepad(pad) => pad.update(),
        }
    }

    fn available(&self) -> bool {
        match self {
            Faces::Keyboard(kbd) => kbd.available(),
            Faces::Calculator(calc) => calc.available(),
            Faces::Gamepad(pad) => pad.available(),
        }
    }

    fn raw(&self) -> u8 {
        match self {
            Faces::Keyboard(kbd) => kbd.raw(),
            Faces::Calculator(calc) => calc.raw(),
            Faces::Gamepad(pad) => pad.raw(),
        }
    }
}
