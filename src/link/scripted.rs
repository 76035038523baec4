//! In-memory link that replays a fixed script of polls.
//!
//! Used by the demo binary when no hardware is attached and by the tests.

use std::collections::VecDeque;

use tracing::debug;

use super::{LinkError, PeripheralLink, SampleKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Byte(u8),
    Bitmask(u8),
    Idle,
}

/// Script-driven [`PeripheralLink`]. Each poll consumes one step; an empty
/// script behaves like an idle bus.
#[derive(Debug, Clone)]
pub struct ScriptedLink {
    present: bool,
    steps: VecDeque<Step>,
    probes: usize,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self {
            present: true,
            steps: VecDeque::new(),
            probes: 0,
        }
    }

    /// A link whose peripheral never answers the probe.
    pub fn absent() -> Self {
        Self {
            present: false,
            ..Self::new()
        }
    }

    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }

    pub fn push_byte(&mut self, value: u8) -> &mut Self {
        self.steps.push_back(Step::Byte(value));
        self
    }

    pub fn push_bytes(&mut self, values: &[u8]) -> &mut Self {
        self.steps.extend(values.iter().copied().map(Step::Byte));
        self
    }

    pub fn push_bitmask(&mut self, mask: u8) -> &mut Self {
        self.steps.push_back(Step::Bitmask(mask));
        self
    }

    /// One poll with nothing to report.
    pub fn push_idle(&mut self) -> &mut Self {
        self.steps.push_back(Step::Idle);
        self
    }

    /// Steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    /// How many times the peripheral has been probed.
    pub fn probe_count(&self) -> usize {
        self.probes
    }

    fn next(&mut self, kind: SampleKind) -> Result<Option<u8>, LinkError> {
        match (self.steps.front().copied(), kind) {
            (None, _) => Ok(None),
            (Some(Step::Idle), _) => {
                self.steps.pop_front();
                Ok(None)
            }
            (Some(Step::Byte(value)), SampleKind::Byte)
            | (Some(Step::Bitmask(value)), SampleKind::Bitmask) => {
                self.steps.pop_front();
                Ok(Some(value))
            }
            (Some(_), SampleKind::Byte) => Err(LinkError::Unsupported(SampleKind::Byte)),
            (Some(_), SampleKind::Bitmask) => Err(LinkError::Unsupported(SampleKind::Bitmask)),
        }
    }
}

impl Default for ScriptedLink {
    fn default() -> Self {
        Self::new()
    }
}

impl PeripheralLink for ScriptedLink {
    fn probe(&mut self) -> Result<bool, LinkError> {
        self.probes += 1;
        debug!("Scripted probe #{} -> {}", self.probes, self.present);
        Ok(self.present)
    }

    fn poll_byte(&mut self) -> Result<Option<u8>, LinkError> {
        self.next(SampleKind::Byte)
    }

    fn poll_bitmask(&mut self) -> Result<Option<u8>, LinkError> {
        self.next(SampleKind::Bitmask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_are_consumed_in_order() {
        let mut link = ScriptedLink::new();
        link.push_byte(b'1').push_idle().push_byte(b'2');

        assert_eq!(link.poll_byte().unwrap(), Some(b'1'));
        assert_eq!(link.poll_byte().unwrap(), None);
        assert_eq!(link.poll_byte().unwrap(), Some(b'2'));
        assert_eq!(link.poll_byte().unwrap(), None);
    }

    #[test]
    fn test_mismatched_kind_is_rejected_without_consuming() {
        let mut link = ScriptedLink::new();
        link.push_bitmask(0x01);

        assert!(matches!(
            link.poll_byte(),
            Err(LinkError::Unsupported(SampleKind::Byte))
        ));
        assert_eq!(link.remaining(), 1);
        assert_eq!(link.poll_bitmask().unwrap(), Some(0x01));
    }

    #[test]
    fn test_absent_link_fails_probe() {
        let mut link = ScriptedLink::absent();
        assert!(!link.probe().unwrap());
        assert_eq!(link.probe_count(), 1);
    }
}
