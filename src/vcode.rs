//! Scancodes, virtual codes, and the synthetic vcode registry.
//!
//! Two overlapping integer spaces: [`Scancode`] (hardware, 0x01-0x7F) and
//! [`Vcode`] (a superset: 0x00-0xFF aliases a scancode, with bit 0x80 marking
//! an "extended" 0xE0-prefixed key; 0x100 and above are synthetic tokens that
//! never reach the OS injector).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hardware scancode, 0x01-0x7F.
pub type Scancode = u8;

/// Internal virtual key code. 0x00-0xFF aliases a [`Scancode`] (bit 0x80 =
/// extended); 0x100+ is a synthetic token (modifier role, deadkey slot, or
/// control opcode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vcode(pub u16);

impl Vcode {
    /// The "do nothing" code. Never forwarded to the OS injector.
    pub const NOP: Vcode = Vcode(0);

    /// Bit that marks an extended (0xE0-prefixed) key within the 0x00-0xFF
    /// scancode-aliased range.
    pub const EXTENDED_BIT: u16 = 0x80;

    /// First vcode in the synthetic (non-scancode-aliased) range.
    pub const SYNTHETIC_BASE: u16 = 0x100;

    #[must_use]
    pub const fn synthetic(self) -> bool {
        self.0 >= Self::SYNTHETIC_BASE
    }

    /// The scancode this vcode aliases, if it is in the 0x00-0xFF range.
    /// Masks off the extended bit: `LCtrl` and `RCtrl` share one hardware
    /// scancode, distinguished only by the out-of-band E0 prefix.
    #[must_use]
    pub const fn as_scancode(self) -> Option<Scancode> {
        if self.0 < Self::SYNTHETIC_BASE {
            Some((self.0 & 0x7F) as Scancode)
        } else {
            None
        }
    }

    /// Index into the 256-entry `keys_down_sent`/`keys_down_temp_released`
    /// arrays, if this vcode is in the scancode-aliased range. Unlike
    /// [`Vcode::as_scancode`] this keeps the extended bit, so `LCtrl` and
    /// `RCtrl` occupy distinct slots.
    #[must_use]
    pub const fn as_index(self) -> Option<usize> {
        if self.0 < Self::SYNTHETIC_BASE {
            Some(self.0 as usize)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn is_extended(self) -> bool {
        !self.synthetic() && (self.0 & Self::EXTENDED_BIT) != 0
    }

    #[must_use]
    pub const fn from_scancode(sc: Scancode, extended: bool) -> Vcode {
        let base = sc as u16;
        Vcode(if extended { base | Self::EXTENDED_BIT } else { base })
    }
}

impl From<Scancode> for Vcode {
    fn from(sc: Scancode) -> Self {
        Vcode(sc as u16)
    }
}

impl Default for Vcode {
    fn default() -> Self {
        Vcode::NOP
    }
}

impl fmt::Display for Vcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Upper bound on the dense arrays (`RewireTable`, `AlphaMap`) indexed by
/// vcode/scancode.
pub const MAX_VCODES: usize = 0x200;

/// Maximum number of concurrently-recorded macro slots, index 0 is the
/// "hard" ESC+J/K/L/; macro; 1..N are named slots addressable from combos.
pub const MAX_NUM_MACROS: usize = 16;

/// Cap on a single macro recording; recording auto-stops a couple of
/// events short of this to leave room for the TEMPRELEASE/RESTORE wrap.
pub const MAX_MACRO_LENGTH: usize = 4096;

macro_rules! scancodes {
    ($($name:ident = $val:expr),* $(,)?) => {
        $(pub const $name: Scancode = $val;)*
    };
}

// Physical key scancodes, non-extended unless noted. Values follow the
// standard PS/2 Set-1 layout as produced by Windows' low-level keyboard
// capture primitives.
scancodes! {
    SC_ESCAPE = 0x01,
    SC_1 = 0x02, SC_2 = 0x03, SC_3 = 0x04, SC_4 = 0x05, SC_5 = 0x06,
    SC_6 = 0x07, SC_7 = 0x08, SC_8 = 0x09, SC_9 = 0x0A, SC_0 = 0x0B,
    SC_MINUS = 0x0C, SC_EQUALS = 0x0D, SC_BACK = 0x0E, SC_TAB = 0x0F,
    SC_Q = 0x10, SC_W = 0x11, SC_E = 0x12, SC_R = 0x13, SC_T = 0x14,
    SC_Y = 0x15, SC_U = 0x16, SC_I = 0x17, SC_O = 0x18, SC_P = 0x19,
    SC_LBRACKET = 0x1A, SC_RBRACKET = 0x1B, SC_ENTER = 0x1C, SC_LCTRL = 0x1D,
    SC_A = 0x1E, SC_S = 0x1F, SC_D = 0x20, SC_F = 0x21, SC_G = 0x22,
    SC_H = 0x23, SC_J = 0x24, SC_K = 0x25, SC_L = 0x26, SC_SEMI = 0x27,
    SC_APOSTROPHE = 0x28, SC_GRAVE = 0x29, SC_LSHIFT = 0x2A, SC_BACKSLASH = 0x2B,
    SC_Z = 0x2C, SC_X = 0x2D, SC_C = 0x2E, SC_V = 0x2F, SC_B = 0x30,
    SC_N = 0x31, SC_M = 0x32, SC_COMMA = 0x33, SC_DOT = 0x34, SC_SLASH = 0x35,
    SC_RSHIFT = 0x36, SC_NUMPAD_MUL = 0x37, SC_LALT = 0x38, SC_SPACE = 0x39,
    SC_CAPS = 0x3A,
    SC_F1 = 0x3B, SC_F2 = 0x3C, SC_F3 = 0x3D, SC_F4 = 0x3E, SC_F5 = 0x3F,
    SC_F6 = 0x40, SC_F7 = 0x41, SC_F8 = 0x42, SC_F9 = 0x43, SC_F10 = 0x44,
    SC_NUMLOCK = 0x45, SC_SCRLOCK = 0x46,
    SC_NUMPAD7 = 0x47, SC_NUMPAD8 = 0x48, SC_NUMPAD9 = 0x49, SC_NUMPAD_MINUS = 0x4A,
    SC_NUMPAD4 = 0x4B, SC_NUMPAD5 = 0x4C, SC_NUMPAD6 = 0x4D, SC_NUMPAD_PLUS = 0x4E,
    SC_NUMPAD1 = 0x4F, SC_NUMPAD2 = 0x50, SC_NUMPAD3 = 0x51, SC_NUMPAD0 = 0x52,
    SC_NUMPAD_PERIOD = 0x53,
    SC_ALTPRINT = 0x54,
    SC_F11 = 0x57, SC_F12 = 0x58,
}

/// Extended (0xE0-prefixed) scancodes. The `is_extended` bit is set on the
/// matching [`Vcode`] — see [`Vcode::from_scancode`].
pub const SC_RCTRL: Scancode = SC_LCTRL;
pub const SC_RALT: Scancode = SC_LALT;
pub const SC_LWIN: Scancode = 0x5B;
pub const SC_RWIN: Scancode = 0x5C;
pub const SC_PRINT: Scancode = SC_NUMPAD_MUL;
pub const SC_BREAK: Scancode = SC_SCRLOCK;
pub const SC_NUMPAD_DIVIDE: Scancode = SC_SLASH;
pub const SC_ARROWUP: Scancode = SC_NUMPAD8;
pub const SC_ARROWDOWN: Scancode = SC_NUMPAD2;
pub const SC_ARROWLEFT: Scancode = SC_NUMPAD4;
pub const SC_ARROWRIGHT: Scancode = SC_NUMPAD6;
pub const SC_HOME: Scancode = SC_NUMPAD7;
pub const SC_END: Scancode = SC_NUMPAD1;
pub const SC_INSERT: Scancode = SC_NUMPAD0;
pub const SC_DELETE: Scancode = SC_NUMPAD_PERIOD;

/// Vcode constants for the physical modifier keys (scancode-aliased, with
/// the extended bit baked in where the key is E0-prefixed).
pub const VC_LCTRL: Vcode = Vcode(SC_LCTRL as u16);
pub const VC_RCTRL: Vcode = Vcode(SC_RCTRL as u16 | Vcode::EXTENDED_BIT);
pub const VC_LSHIFT: Vcode = Vcode(SC_LSHIFT as u16);
pub const VC_RSHIFT: Vcode = Vcode(SC_RSHIFT as u16);
pub const VC_LALT: Vcode = Vcode(SC_LALT as u16);
pub const VC_RALT: Vcode = Vcode(SC_RALT as u16 | Vcode::EXTENDED_BIT);
pub const VC_LWIN: Vcode = Vcode(SC_LWIN as u16 | Vcode::EXTENDED_BIT);
pub const VC_RWIN: Vcode = Vcode(SC_RWIN as u16 | Vcode::EXTENDED_BIT);

/// Synthetic vcodes (0x100+). Stable across releases — pinned by
/// `tests::synthetic_vcodes_are_stable`.
macro_rules! synthetic {
    ($($name:ident = $offset:expr),* $(,)?) => {
        $(pub const $name: Vcode = Vcode(Vcode::SYNTHETIC_BASE + $offset);)*
    };
}

synthetic! {
    VC_MOD5 = 0x00, VC_MOD6 = 0x01, VC_MOD7 = 0x02, VC_MOD8 = 0x03,
    VC_MOD9 = 0x04, VC_MOD10 = 0x05, VC_MOD11 = 0x06, VC_MOD12 = 0x07,
    VC_PAUSE = 0x10,
    VC_CAPSON = 0x11,
    VC_CAPSOFF = 0x12,
    VC_CONFIGSWITCH = 0x13,
    VC_CONFIGPREVIOUS = 0x14,
    VC_SLEEP = 0x15,
    VC_DEADKEY = 0x16,
    VC_RECORDMACRO = 0x17,
    VC_RECORDSECRETMACRO = 0x18,
    VC_PLAYMACRO = 0x19,
    VC_OBFUSCATED_SEQUENCE_START = 0x1A,
    VC_TEMPRELEASEKEYS = 0x1B,
    VC_TEMPRESTOREKEYS = 0x1C,
    VC_AHK_HOTKEY1 = 0x1D,
    VC_AHK_HOTKEY2 = 0x1E,
}

/// `MOD1..MOD4` are rewire-config-facing aliases for the four left-hand
/// physical modifiers; they carry the same vcode (and therefore the same
/// modifier bit) as their physical counterpart. `MOD5..MOD12` are genuine
/// synthetic modifier roles with no physical key of their own.
pub const VC_MOD1: Vcode = VC_LCTRL;
pub const VC_MOD2: Vcode = VC_LSHIFT;
pub const VC_MOD3: Vcode = VC_LALT;
pub const VC_MOD4: Vcode = VC_LWIN;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_vcodes_are_stable() {
        assert_eq!(VC_MOD5.0, 0x100);
        assert_eq!(VC_PAUSE.0, 0x110);
        assert_eq!(VC_TEMPRESTOREKEYS.0, 0x11C);
        assert_eq!(VC_AHK_HOTKEY2.0, 0x11E);
    }

    #[test]
    fn vcode_extended_roundtrip() {
        let v = Vcode::from_scancode(SC_LWIN, true);
        assert!(v.is_extended());
        assert_eq!(v.as_scancode(), Some(SC_LWIN));
        assert!(!v.synthetic());
    }

    #[test]
    fn synthetic_vcode_has_no_scancode() {
        assert_eq!(VC_PAUSE.as_scancode(), None);
        assert!(VC_PAUSE.synthetic());
    }

    #[test]
    fn mod1_aliases_lctrl() {
        assert_eq!(VC_MOD1, VC_LCTRL);
    }
}
