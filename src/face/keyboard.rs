//! Keyboard face.
//!
//! Printable bytes arrive as-is, navigation keys as codes above 0x7E. Enter is
//! sent as a CR/LF pair and reported here as a single line feed.

use tracing::{debug, trace};

use super::{Face, PollableInput};
use crate::link::{PeripheralLink, SampleKind};

pub const CR: u8 = 0x0D;
pub const LF: u8 = 0x0A;

/// Navigation and editing keys (Fn / sym layer of the face).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SpecialKey {
    /// sym + BS
    Delete = 0x7F,
    /// Fn + K
    Up = 0xB7,
    /// Fn + L
    Insert = 0xB8,
    /// Fn + X
    Home = 0xBB,
    /// Fn + C
    End = 0xBC,
    /// Fn + V
    PageUp = 0xBD,
    /// Fn + B
    PageDown = 0xBE,
    /// Fn + N
    Left = 0xBF,
    /// Fn + M
    Down = 0xC0,
    /// Fn + $
    Right = 0xC1,
}

impl SpecialKey {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x7F => Some(SpecialKey::Delete),
            0xB7 => Some(SpecialKey::Up),
            0xB8 => Some(SpecialKey::Insert),
            0xBB => Some(SpecialKey::Home),
            0xBC => Some(SpecialKey::End),
            0xBD => Some(SpecialKey::PageUp),
            0xBE => Some(SpecialKey::PageDown),
            0xBF => Some(SpecialKey::Left),
            0xC0 => Some(SpecialKey::Down),
            0xC1 => Some(SpecialKey::Right),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// One logical key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Anything below the special range, passed through unchanged.
    Char(char),
    /// Line feed; CR/LF pairs collapse into one of these.
    Enter,
    Special(SpecialKey),
    /// High byte with no entry in the special table.
    Other(u8),
}

impl Key {
    pub fn from_byte(byte: u8) -> Self {
        if byte == LF {
            return Key::Enter;
        }
        if let Some(special) = SpecialKey::from_byte(byte) {
            return Key::Special(special);
        }
        if byte < 0x7F {
            Key::Char(char::from(byte))
        } else {
            Key::Other(byte)
        }
    }
}

#[derive(Debug)]
pub struct Keyboard<L> {
    face: Face<L>,
    // Other half of a line terminator, swallowed if it shows up next poll.
    pending_partner: Option<u8>,
    key: Option<Key>,
}

impl<L: PeripheralLink> Keyboard<L> {
    pub fn new(link: L) -> Self {
        Self {
            face: Face::new(link, SampleKind::Byte),
            pending_partner: None,
            key: None,
        }
    }

    /// Key decoded by the latest poll.
    pub fn key(&self) -> Option<Key> {
        self.key
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

impl<L: PeripheralLink> PollableInput for Keyboard<L> {
    fn begin(&mut self) -> bool {
        self.face.begin()
    }

    fn update(&mut self) {
        let partner = self.pending_partner.take();
        self.key = None;

        self.face.update();
        if !self.face.available() {
            return;
        }

        let raw = self.face.raw();
        if partner == Some(raw) {
            debug!("Merged line terminator {:#04x}", raw);
            self.face.mark_unavailable();
            return;
        }

        match raw {
            CR => {
                self.pending_partner = Some(LF);
                self.face.set_raw(LF);
            }
            LF => self.pending_partner = Some(CR),
            _ => {}
        }

        let key = Key::from_byte(self.face.raw());
        trace!("Key {:#04x} -> {:?}", raw, key);
        self.key = Some(key);
    }

    fn available(&self) -> bool {
        self.face.available()
    }

    fn raw(&self) -> u8 {
        self.face.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::ScriptedLink;

    fn keyboard() -> Keyboard<ScriptedLink> {
        let mut kbd = Keyboard::new(ScriptedLink::new());
        assert!(kbd.begin());
        kbd
    }

    fn collect(kbd: &mut Keyboard<ScriptedLink>, polls: usize) -> Vec<Key> {
        let mut keys = Vec::new();
        for _ in 0..polls {
            kbd.update();
            if kbd.available() {
                keys.extend(kbd.key());
            }
        }
        keys
    }

    #[test]
    fn test_cr_lf_is_one_line_feed() {
        let mut kbd = keyboard();
        kbd.link_mut().push_bytes(&[CR, LF]);

        kbd.update();
        assert!(kbd.available());
        assert_eq!(kbd.raw(), LF);
        assert_eq!(kbd.key(), Some(Key::Enter));

        kbd.update();
        assert!(!kbd.available());
        assert_eq!(kbd.key(), None);
    }

    #[test]
    fn test_lf_cr_is_one_line_feed() {
        let mut kbd = keyboard();
        kbd.link_mut().push_bytes(&[LF, CR]);

        assert_eq!(collect(&mut kbd, 2), vec![Key::Enter]);
    }

    #[test]
    fn test_two_enters_give_two_line_feeds() {
        let mut kbd = keyboard();
        kbd.link_mut().push_bytes(&[CR, LF, CR, LF]);

        assert_eq!(collect(&mut kbd, 4), vec![Key::Enter, Key::Enter]);
    }

    #[test]
    fn test_merge_window_is_one_poll() {
        let mut kbd = keyboard();
        kbd.link_mut().push_byte(CR).push_idle().push_byte(LF);

        assert_eq!(collect(&mut kbd, 3), vec![Key::Enter, Key::Enter]);
    }

    #[test]
    fn test_lone_cr_reports_line_feed() {
        let mut kbd = keyboard();
        kbd.link_mut().push_bytes(&[CR, b'a']);

        assert_eq!(collect(&mut kbd, 2), vec![Key::Enter, Key::Char('a')]);
    }

    #[test]
    fn test_printable_bytes_pass_through() {
        let mut kbd = keyboard();
        kbd.link_mut().push_bytes(b"Hi!");

        assert_eq!(
            collect(&mut kbd, 3),
            vec![Key::Char('H'), Key::Char('i'), Key::Char('!')]
        );
        assert_eq!(kbd.raw(), b'!');
    }

    #[test]
    fn test_special_codes() {
        let mut kbd = keyboard();
        kbd.link_mut().push_bytes(&[0x7F, 0xB7, 0xC1, 0xC5]);

        assert_eq!(
            collect(&mut kbd, 4),
            vec![
                Key::Special(SpecialKey::Delete),
                Key::Special(SpecialKey::Up),
                Key::Special(SpecialKey::Right),
                Key::Other(0xC5),
            ]
        );
    }

    #[test]
    fn test_special_table_round_trips_codes() {
        for code in [0x7F, 0xB7, 0xB8, 0xBB, 0xBC, 0xBD, 0xBE, 0xBF, 0xC0, 0xC1] {
            let key = SpecialKey::from_byte(code).expect("code in table");
            assert_eq!(key.code(), code);
        }
        assert_eq!(SpecialKey::from_byte(0xB9), None);
    }
}
