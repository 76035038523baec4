//! Calculator face.
//!
//! Digits come through as their value 0-9. Function keys are reported as
//! codes with [`FUNCTION_BIT`] set. Anything else on the wire is dropped.

use tracing::{trace, warn};

use super::{Face, PollableInput};
use crate::link::{PeripheralLink, SampleKind};

/// Set on every function code, clear on digits.
pub const FUNCTION_BIT: u8 = 0x80;

/// Function keys. Names follow the key caps; what they do is up to the
/// application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CalcFunction {
    /// [AC]
    AllClear = FUNCTION_BIT,
    /// long press on [AC]
    ClearEntry,
    /// [M]
    MemoryInput,
    /// [%]
    Percent,
    Add,
    Sub,
    Mul,
    Div,
    /// [+/-]
    Sign,
    /// [.]
    Point,
    /// [=]
    Equals,
    /// long press on [=]
    MemoryRecall,
}

impl CalcFunction {
    pub const ALL: [CalcFunction; 12] = [
        CalcFunction::AllClear,
        CalcFunction::ClearEntry,
        CalcFunction::MemoryInput,
        CalcFunction::Percent,
        CalcFunction::Add,
        CalcFunction::Sub,
        CalcFunction::Mul,
        CalcFunction::Div,
        CalcFunction::Sign,
        CalcFunction::Point,
        CalcFunction::Equals,
        CalcFunction::MemoryRecall,
    ];

    /// Byte the face sends for this key.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            b'A' => Some(CalcFunction::AllClear),
            0x08 => Some(CalcFunction::ClearEntry),
            b'M' => Some(CalcFunction::MemoryInput),
            b'%' => Some(CalcFunction::Percent),
            b'+' => Some(CalcFunction::Add),
            b'-' => Some(CalcFunction::Sub),
            b'*' => Some(CalcFunction::Mul),
            b'/' => Some(CalcFunction::Div),
            b'`' => Some(CalcFunction::Sign),
            b'.' => Some(CalcFunction::Point),
            b'=' => Some(CalcFunction::Equals),
            0x0D => Some(CalcFunction::MemoryRecall),
            _ => None,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.code() == code)
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Decoded calculator key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalcInput {
    Digit(u8),
    Function(CalcFunction),
}

impl CalcInput {
    /// None for bytes outside both tables.
    pub fn decode(raw: u8) -> Option<Self> {
        if raw.is_ascii_digit() {
            return Some(CalcInput::Digit(raw - b'0'));
        }
        CalcFunction::from_raw(raw).map(CalcInput::Function)
    }

    /// Digit value or function code.
    pub fn code(self) -> u8 {
        match self {
            CalcInput::Digit(value) => value,
            CalcInput::Function(function) => function.code(),
        }
    }

    pub fn is_function(self) -> bool {
        matches!(self, CalcInput::Function(_))
    }
}

#[derive(Debug)]
pub struct Calculator<L> {
    face: Face<L>,
    now: u8,
    input: Option<CalcInput>,
}

impl<L: PeripheralLink> Calculator<L> {
    pub fn new(link: L) -> Self {
        Self {
            face: Face::new(link, SampleKind::Byte),
            now: 0,
            input: None,
        }
    }

    /// Last decoded value: 0-9, or a function code with [`FUNCTION_BIT`] set.
    pub fn now(&self) -> u8 {
        self.now
    }

    pub fn is_function(&self) -> bool {
        self.now & FUNCTION_BIT != 0
    }

    /// Key decoded by the latest poll.
    pub fn input(&self) -> Option<CalcInput> {
        self.input
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
}

impl<L: PeripheralLink> PollableInput for Calculator<L> {
    fn begin(&mut self) -> bool {
        self.face.begin()
    }

    fn update(&mut self) {
        self.input = None;
        let previous = self.face.raw();
        self.face.update();
        if !self.face.available() {
            return;
        }

        let raw = self.face.raw();
        match CalcInput::decode(raw) {
            Some(input) => {
                self.now = input.code();
                self.input = Some(input);
                trace!("{:#04x} / {:#04x}", raw, self.now);
            }
            None => {
                warn!("Illegal calculator byte {:#04x} dropped", raw);
                self.face.set_raw(previous);
                self.face.mark_unavailable();
            }
        }
    }

    fn available(&self) -> bool {
        self.face.available()
    }

    fn raw(&self) -> u8 {
        self.face.raw()
    }
}
