//! Input decoding for M5Stack Faces style peripherals.
//!
//! A polled raw signal (one byte, or one button bitmask) from a keyboard,
//! calculator or gamepad face is turned into debounced, stateful events:
//!
//! 1. [`link`] - transports that produce raw samples
//! 2. [`face`] - per-peripheral decoders and the gamepad state engine
//! 3. [`session`] - fixed-cadence polling loop publishing snapshots
//! 4. [`config`] - TOML configuration
//!
//! ```no_run
//! use faces_input::prelude::*;
//!
//! let mut pad = Gamepad::new(ScriptedLink::new());
//! if pad.begin() {
//!     pad.set_hold_threshold(Button::Left, 1000);
//!     pad.update();
//!     if pad.was_pressed(Buttons::A) {
//!         println!("A");
//!     }
//! }
//! ```

pub mod config;
pub mod face;
pub mod link;
pub mod session;

pub mod prelude {
    pub use crate::config::{FacesConfig, GamepadConfig, LinkBackend};
    pub use crate::face::{
        Button, Buttons, CalcFunction, CalcInput, Calculator, FaceEvent, FaceKind, Faces,
        Gamepad, Key, Keyboard, PollableInput, SpecialKey,
    };
    pub use crate::link::{BoxedLink, PeripheralLink, RawSample, ScriptedLink};
    pub use crate::session::{InputSession, InputSnapshot, SessionSettings};
}
