//! Raw capture events, internal key events, and the conversions between them.

use crate::vcode::Vcode;
use serde::{Deserialize, Serialize};

/// One event as received from (or sent to) the capture collaborator.
///
/// `state` bits: bit0 = release, bit1 = extended (0xE0 prefix), bits2-5 =
/// escape-sequence markers (the Pause key's 0xE1 sequence sets bit2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawEvent {
    pub code: u8,
    pub state: u8,
}

impl RawEvent {
    #[must_use]
    pub const fn is_release(self) -> bool {
        self.state & 0b0001 != 0
    }

    #[must_use]
    pub const fn is_extended(self) -> bool {
        self.state & 0b0010 != 0
    }

    /// The E1-escape marker bit, set on the `LCtrl` half of the raw Pause
    /// sequence (`state` > 3).
    #[must_use]
    pub const fn is_escape(self) -> bool {
        self.state > 0b0011
    }
}

/// An internal key event: which vcode, and whether it is a press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub vcode: Vcode,
    pub is_down: bool,
}

impl KeyEvent {
    #[must_use]
    pub const fn down(vcode: Vcode) -> Self {
        KeyEvent { vcode, is_down: true }
    }

    #[must_use]
    pub const fn up(vcode: Vcode) -> Self {
        KeyEvent { vcode, is_down: false }
    }

    #[must_use]
    pub const fn make_break(vcode: Vcode) -> [KeyEvent; 2] {
        [KeyEvent::down(vcode), KeyEvent::up(vcode)]
    }
}

impl From<RawEvent> for KeyEvent {
    fn from(raw: RawEvent) -> Self {
        KeyEvent {
            vcode: Vcode::from_scancode(raw.code, raw.is_extended()),
            is_down: !raw.is_release(),
        }
    }
}

/// Encode a [`KeyEvent`] as the raw wire form the capture collaborator
/// expects. Only meaningful for scancode-aliased vcodes — synthetic vcodes
/// are handled by the control-opcode path and never reach this conversion.
#[must_use]
pub fn key_event_to_raw(ev: KeyEvent) -> RawEvent {
    let mut state = 0u8;
    if !ev.is_down {
        state |= 0b0001;
    }
    if ev.vcode.is_extended() {
        state |= 0b0010;
    }
    RawEvent {
        code: ev.vcode.as_scancode().unwrap_or(0),
        state,
    }
}

/// XOR mask used to obfuscate macro vcodes recorded as a "secret sequence".
/// Self-inverse: `deobfuscate(obfuscate(v)) == v`. This is scrambling for
/// casual clipboard/memory inspection, not cryptography.
const OBFUSCATION_MASK: u16 = 0b0101_0101_0101_0101;

#[must_use]
pub fn obfuscate_vcode(v: Vcode) -> Vcode {
    Vcode(v.0 ^ OBFUSCATION_MASK)
}

#[must_use]
pub fn deobfuscate_vcode(v: Vcode) -> Vcode {
    Vcode(v.0 ^ OBFUSCATION_MASK)
}
