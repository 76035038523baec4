//! Gamepad face: edge, hold and software-repeat tracking over an 8-button
//! snapshot.
//!
//! Per button the state runs `Idle -> Pressed -> Held`, back to `Idle` on
//! release. Hold and repeat are timed independently against the poll clock,
//! so both can be set for the same button on the same poll.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use tracing::{debug, trace};

use super::{Face, PollableInput};
use crate::link::{PeripheralLink, SampleKind};

/// Press duration after which a button counts as held.
pub const DEFAULT_HOLD_MS: u64 = 100;
/// Interval between software repeat pulses.
pub const DEFAULT_REPEAT_MS: u64 = 10;

bitflags::bitflags! {
    /// Button bitmask, set bit = pressed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u8 {
        const UP = 0x01;
        const DOWN = 0x02;
        const LEFT = 0x04;
        const RIGHT = 0x08;
        const A = 0x10;
        const B = 0x20;
        const SELECT = 0x40;
        const START = 0x80;

        const CROSS = Self::UP.bits() | Self::DOWN.bits() | Self::LEFT.bits() | Self::RIGHT.bits();
        const BUTTON = Self::A.bits() | Self::B.bits();
        const SYSTEM = Self::SELECT.bits() | Self::START.bits();
        const ALL = Self::CROSS.bits() | Self::BUTTON.bits() | Self::SYSTEM.bits();
    }
}

/// A single button, used to address per-button timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    Select,
    Start,
}

impl Button {
    pub const COUNT: usize = 8;

    /// Bit order, lowest bit first.
    pub const ALL: [Button; Button::COUNT] = [
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn mask(self) -> Buttons {
        match self {
            Button::Up => Buttons::UP,
            Button::Down => Buttons::DOWN,
            Button::Left => Buttons::LEFT,
            Button::Right => Buttons::RIGHT,
            Button::A => Buttons::A,
            Button::B => Buttons::B,
            Button::Select => Buttons::SELECT,
            Button::Start => Buttons::START,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Button::Up => "up",
            Button::Down => "down",
            Button::Left => "left",
            Button::Right => "right",
            Button::A => "a",
            Button::B => "b",
            Button::Select => "select",
            Button::Start => "start",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown button name: {0}")]
pub struct UnknownButton(pub String);

impl FromStr for Button {
    type Err = UnknownButton;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Button::ALL
            .into_iter()
            .find(|button| button.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownButton(s.to_string()))
    }
}

/// Timing of one button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonTiming {
    pub hold_ms: u64,
    pub repeat_ms: u64,
    pub repeat: bool,
}

impl ButtonTiming {
    /// Defaults: repeat on for the action buttons, off for the rest.
    pub fn default_for(button: Button) -> Self {
        Self {
            hold_ms: DEFAULT_HOLD_MS,
            repeat_ms: DEFAULT_REPEAT_MS,
            repeat: Buttons::BUTTON.contains(button.mask()),
        }
    }
}

/// Everything a gamepad derived on one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GamepadReport {
    pub now: Buttons,
    pub last: Buttons,
    pub edge: Buttons,
    pub release_edge: Buttons,
    pub hold: Buttons,
    pub hold_edge: Buttons,
    pub repeat: Buttons,
}

impl GamepadReport {
    /// True if anything other than steady pressing happened.
    pub fn has_activity(&self) -> bool {
        !(self.edge | self.release_edge | self.hold_edge | self.repeat).is_empty()
    }
}

#[derive(Debug)]
pub struct Gamepad<L> {
    face: Face<L>,
    epoch: Instant,

    now: Buttons,
    last: Buttons,
    edge: Buttons,
    release_edge: Buttons,
    hold: Buttons,
    hold_edge: Buttons,
    repeat: Buttons,

    timing: [ButtonTiming; Button::COUNT],
    // Poll time (ms) at which the current press started.
    hold_start: [Option<u64>; Button::COUNT],
    // Poll time (ms) of the press or of the last repeat pulse.
    repeat_start: [Option<u64>; Button::COUNT],
}

impl<L: PeripheralLink> Gamepad<L> {
    pub fn new(link: L) -> Self {
        Self {
            face: Face::new(link, SampleKind::Bitmask),
            epoch: Instant::now(),
            now: Buttons::empty(),
            last: Buttons::empty(),
            edge: Buttons::empty(),
            release_edge: Buttons::empty(),
            hold: Buttons::empty(),
            hold_edge: Buttons::empty(),
            repeat: Buttons::empty(),
            timing: Button::ALL.map(ButtonTiming::default_for),
            hold_start: [None; Button::COUNT],
            repeat_start: [None; Button::COUNT],
        }
    }

    /// One poll stamped with `now_ms`, a monotonic millisecond reading.
    pub fn update_at(&mut self, now_ms: u64) {
        self.last = self.now;

        self.face.update();
        if self.face.available() {
            self.now = Buttons::from_bits_retain(self.face.raw());
            trace!("{:#04x} at {}ms", self.now.bits(), now_ms);
        }

        let changed = self.last ^ self.now;
        self.edge = changed & self.now;
        self.release_edge = changed.difference(self.now);

        let previous_hold = self.hold;
        let mut hold = Buttons::empty();
        let mut repeat = Buttons::empty();

        for button in Button::ALL {
            let i = button.index();
            let bit = button.mask();

            if !self.now.contains(bit) {
                self.hold_start[i] = None;
                self.repeat_start[i] = None;
                continue;
            }

            if self.edge.contains(bit) || self.hold_start[i].is_none() {
                self.hold_start[i] = Some(now_ms);
                self.repeat_start[i] = Some(now_ms);
            }

            let timing = self.timing[i];
            let held_for = now_ms.saturating_sub(self.hold_start[i].unwrap_or(now_ms));
            if previous_hold.contains(bit) || held_for >= timing.hold_ms {
                hold |= bit;
            }

            if timing.repeat {
                let since_pulse = now_ms.saturating_sub(self.repeat_start[i].unwrap_or(now_ms));
                if since_pulse >= timing.repeat_ms {
                    repeat |= bit;
                    self.repeat_start[i] = Some(now_ms);
                }
            }
        }

        self.hold = hold;
        self.hold_edge = hold.difference(previous_hold);
        self.repeat = repeat;
    }

    /// Is any button in `mask` pressed?
    pub fn is_pressed(&self, mask: Buttons) -> bool {
        self.now.intersects(mask)
    }

    /// Was any button in `mask` pressed this poll?
    pub fn was_pressed(&self, mask: Buttons) -> bool {
        self.edge.intersects(mask)
    }

    /// Are all buttons in `mask` up?
    pub fn is_released(&self, mask: Buttons) -> bool {
        !self.now.intersects(mask)
    }

    /// Was any button in `mask` released this poll?
    pub fn was_released(&self, mask: Buttons) -> bool {
        self.release_edge.intersects(mask)
    }

    /// Is any button in `mask` held past its threshold?
    pub fn is_holding(&self, mask: Buttons) -> bool {
        self.hold.intersects(mask)
    }

    /// Did any button in `mask` become held this poll?
    pub fn was_hold(&self, mask: Buttons) -> bool {
        self.hold_edge.intersects(mask)
    }

    /// Did any button in `mask` emit a repeat pulse this poll?
    pub fn was_repeated(&self, mask: Buttons) -> bool {
        self.repeat.intersects(mask)
    }

    pub fn now(&self) -> Buttons {
        self.now
    }

    pub fn last(&self) -> Buttons {
        self.last
    }

    pub fn edge(&self) -> Buttons {
        self.edge
    }

    pub fn release_edge(&self) -> Buttons {
        self.release_edge
    }

    pub fn hold(&self) -> Buttons {
        self.hold
    }

    pub fn hold_edge(&self) -> Buttons {
        self.hold_edge
    }

    pub fn repeat(&self) -> Buttons {
        self.repeat
    }

    pub fn report(&self) -> GamepadReport {
        GamepadReport {
            now: self.now,
            last: self.last,
            edge: self.edge,
            release_edge: self.release_edge,
            hold: self.hold,
            hold_edge: self.hold_edge,
            repeat: self.repeat,
        }
    }

    pub fn timing(&self, button: Button) -> ButtonTiming {
        self.timing[button.index()]
    }

    pub fn hold_threshold(&self, button: Button) -> u64 {
        self.timing[button.index()].hold_ms
    }

    pub fn repeat_threshold(&self, button: Button) -> u64 {
        self.timing[button.index()].repeat_ms
    }

    pub fn is_repeat_enabled(&self, button: Button) -> bool {
        self.timing[button.index()].repeat
    }

    pub fn set_hold_threshold(&mut self, button: Button, ms: u64) {
        self.reset_button(button);
        self.timing[button.index()].hold_ms = ms;
    }

    pub fn set_hold_threshold_all(&mut self, ms: u64) {
        for button in Button::ALL {
            self.set_hold_threshold(button, ms);
        }
    }

    pub fn set_repeat_threshold(&mut self, button: Button, ms: u64) {
        self.reset_button(button);
        self.timing[button.index()].repeat_ms = ms;
    }

    pub fn set_repeat_threshold_all(&mut self, ms: u64) {
        for button in Button::ALL {
            self.set_repeat_threshold(button, ms);
        }
    }

    /// Turns software repeat on or off for one button. Timers are kept.
    pub fn enable_repeat(&mut self, button: Button, enable: bool) {
        self.timing[button.index()].repeat = enable;
        if !enable {
            self.repeat.remove(button.mask());
        }
    }

    /// Replaces all timing of one button.
    pub fn set_timing(&mut self, button: Button, timing: ButtonTiming) {
        self.reset_button(button);
        self.timing[button.index()] = timing;
    }

    // Stale timers must not leak into the new threshold.
    fn reset_button(&mut self, button: Button) {
        let bit = button.mask();
        self.now.remove(bit);
        self.edge.remove(bit);
        self.release_edge.remove(bit);
        self.hold.remove(bit);
        self.hold_edge.remove(bit);
        self.repeat.remove(bit);
        self.hold_start[button.index()] = None;
        self.repeat_start[button.index()] = None;
        debug!("Timing of {} changed, state cleared", button);
    }

    pub fn face(&self) -> &Face<L> {
        &self.face
    }

    pub fn link(&self) -> &L {
        self.face.link()
    }

    pub fn link_mut(&mut self) -> &mut L {
        self.face.link_mut()
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl<L: PeripheralLink> PollableInput for Gamepad<L> {
    fn begin(&mut self) -> bool {
        self.face.begin()
    }

    fn update(&mut self) {
        let now_ms = self.elapsed_ms();
        self.update_at(now_ms);
    }

    fn available(&self) -> bool {
        self.face.available()
    }

    fn raw(&self) -> u8 {
        self.face.raw()
    }
}
