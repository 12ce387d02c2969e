//! The 16-bit modifier bitmask and the pure function mapping a vcode to its
//! owned bit.

use crate::vcode::{
    Vcode, VC_LALT, VC_LCTRL, VC_LSHIFT, VC_LWIN, VC_MOD10, VC_MOD11, VC_MOD12, VC_MOD5, VC_MOD6,
    VC_MOD7, VC_MOD8, VC_MOD9, VC_RALT, VC_RCTRL, VC_RSHIFT, VC_RWIN,
};
use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// A 16-bit bitmask tracking which modifier roles are currently down
/// (`mod_down`) or were completed as a tap (`mod_tapped`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModMask(pub u16);

impl ModMask {
    pub const EMPTY: ModMask = ModMask(0);

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn contains(self, bit: ModMask) -> bool {
        self.0 & bit.0 == bit.0
    }

    #[must_use]
    pub const fn intersects(self, bit: ModMask) -> bool {
        self.0 & bit.0 != 0
    }
}

impl BitOr for ModMask {
    type Output = ModMask;
    fn bitor(self, rhs: Self) -> ModMask {
        ModMask(self.0 | rhs.0)
    }
}
impl BitOrAssign for ModMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
impl BitAnd for ModMask {
    type Output = ModMask;
    fn bitand(self, rhs: Self) -> ModMask {
        ModMask(self.0 & rhs.0)
    }
}
impl BitAndAssign for ModMask {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}
impl Not for ModMask {
    type Output = ModMask;
    fn not(self) -> ModMask {
        ModMask(!self.0)
    }
}

/// Pure function: the bit a given vcode owns in `mod_down`/`mod_tapped`, or
/// [`ModMask::EMPTY`] if the vcode is not a recognized modifier role.
///
/// `MOD1..MOD4` are not listed separately — they are vcode aliases of
/// `LCtrl`/`LShift`/`LAlt`/`LWin` (see [`crate::vcode`]) and therefore map to
/// the same bit as their physical counterpart.
#[must_use]
pub fn bit_of(vcode: Vcode) -> ModMask {
    let bit = match vcode {
        VC_LCTRL => 0,
        VC_LSHIFT => 1,
        VC_LALT => 2,
        VC_LWIN => 3,
        VC_RCTRL => 4,
        VC_RSHIFT => 5,
        VC_RALT => 6,
        VC_RWIN => 7,
        VC_MOD5 => 8,
        VC_MOD6 => 9,
        VC_MOD7 => 10,
        VC_MOD8 => 11,
        VC_MOD9 => 12,
        VC_MOD10 => 13,
        VC_MOD11 => 14,
        VC_MOD12 => 15,
        _ => return ModMask::EMPTY,
    };
    ModMask(1 << bit)
}

#[must_use]
pub fn is_modifier(vcode: Vcode) -> bool {
    !bit_of(vcode).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcode::{SC_A, VC_LCTRL, VC_LSHIFT};

    #[test]
    fn physical_modifiers_get_distinct_bits() {
        assert_ne!(bit_of(VC_LCTRL), bit_of(VC_LSHIFT));
        assert!(!bit_of(VC_LCTRL).is_empty());
    }

    #[test]
    fn non_modifier_has_no_bit() {
        assert_eq!(bit_of(Vcode::from(SC_A)), ModMask::EMPTY);
        assert!(!is_modifier(Vcode::from(SC_A)));
    }

    #[test]
    fn combinable_bits() {
        let both = bit_of(VC_LCTRL) | bit_of(VC_LSHIFT);
        assert!(both.contains(bit_of(VC_LCTRL)));
        assert!(both.contains(bit_of(VC_LSHIFT)));
        assert!(!both.contains(bit_of(crate::vcode::VC_LALT)));
    }

    #[test]
    fn bits_span_exactly_16() {
        let all = [
            VC_LCTRL,
            VC_LSHIFT,
            VC_LALT,
            VC_LWIN,
            VC_RCTRL,
            VC_RSHIFT,
            VC_RALT,
            VC_RWIN,
            VC_MOD5,
            VC_MOD6,
            VC_MOD7,
            VC_MOD8,
            VC_MOD9,
            VC_MOD10,
            VC_MOD11,
            VC_MOD12,
        ];
        let mut acc = ModMask::EMPTY;
        for v in all {
            let b = bit_of(v);
            assert!(!acc.intersects(b), "bit collision for {v:?}");
            acc |= b;
        }
        assert_eq!(acc.0, 0xFFFF);
    }
}
