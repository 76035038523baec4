//! Transport boundary for Faces peripherals.
//!
//! A [`PeripheralLink`] is whatever hands raw samples to the decoders: a bus
//! register read, an OS input backend, or an in-memory script. The decoders in
//! [`crate::face`] never talk to hardware directly.
//!
//! ```text
//! I2C / OS backend ──► PeripheralLink ──► Face ──► Keyboard | Calculator | Gamepad
//!                      (RawSample)
//! ```

pub mod i2c;
pub mod scripted;
pub mod slot;

#[cfg(feature = "gilrs")]
pub mod gilrs;

use std::fmt;

pub use i2c::{I2cLink, I2cSettings};
pub use scripted::ScriptedLink;
pub use slot::SampleSlot;

#[cfg(feature = "gilrs")]
pub use self::gilrs::GilrsLink;

/// Upper bound on samples thrown away while draining, so a link that never
/// reports "empty" cannot stall `begin()`.
pub const MAX_DRAIN: usize = 64;

/// Shape of the sample a face asks its link for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    /// One byte per event (keyboard, calculator).
    Byte,
    /// Full button snapshot, set bit = pressed (gamepad).
    Bitmask,
}

/// Raw payload obtained from one poll of a peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawSample {
    Byte(u8),
    Bitmask(u8),
}

impl RawSample {
    pub fn kind(&self) -> SampleKind {
        match self {
            RawSample::Byte(_) => SampleKind::Byte,
            RawSample::Bitmask(_) => SampleKind::Bitmask,
        }
    }

    pub fn payload(&self) -> u8 {
        match *self {
            RawSample::Byte(value) | RawSample::Bitmask(value) => value,
        }
    }
}

// Link errors
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("I2C transfer failed: {0}")]
    I2c(#[from] rppal::i2c::Error),

    #[error("GPIO access failed: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("Link does not provide {0:?} samples")]
    Unsupported(SampleKind),

    #[error("Link disconnected: {0}")]
    Disconnected(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Platform transport consumed by the faces.
///
/// `Ok(None)` from a poll means "nothing new this poll"; it is not an error.
pub trait PeripheralLink: fmt::Debug {
    /// True if the peripheral answers.
    fn probe(&mut self) -> Result<bool, LinkError>;

    /// Next byte of a byte-stream peripheral.
    fn poll_byte(&mut self) -> Result<Option<u8>, LinkError>;

    /// Next full button snapshot of the multi-button peripheral.
    fn poll_bitmask(&mut self) -> Result<Option<u8>, LinkError>;

    /// Reads one sample of the requested shape.
    fn poll(&mut self, kind: SampleKind) -> Result<Option<RawSample>, LinkError> {
        Ok(match kind {
            SampleKind::Byte => self.poll_byte()?.map(RawSample::Byte),
            SampleKind::Bitmask => self.poll_bitmask()?.map(RawSample::Bitmask),
        })
    }

    /// Throws away anything queued before the session started and returns how
    /// many samples were dropped.
    fn drain(&mut self, kind: SampleKind) -> usize {
        let mut dropped = 0;
        while dropped < MAX_DRAIN {
            match self.poll(kind) {
                Ok(Some(_)) => dropped += 1,
                _ => break,
            }
        }
        dropped
    }
}

impl<L: PeripheralLink + ?Sized> PeripheralLink for Box<L> {
    fn probe(&mut self) -> Result<bool, LinkError> {
        (**self).probe()
    }

    fn poll_byte(&mut self) -> Result<Option<u8>, LinkError> {
        (**self).poll_byte()
    }

    fn poll_bitmask(&mut self) -> Result<Option<u8>, LinkError> {
        (**self).poll_bitmask()
    }

    fn poll(&mut self, kind: SampleKind) -> Result<Option<RawSample>, LinkError> {
        (**self).poll(kind)
    }

    fn drain(&mut self, kind: SampleKind) -> usize {
        (**self).drain(kind)
    }
}

/// Owned, sendable link used where the backend is chosen at runtime.
pub type BoxedLink = Box<dyn PeripheralLink + Send>;
