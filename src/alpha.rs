//! Alpha-layout swap: a dense per-vcode remap applied after combo
//! matching, with an optional modifier gate and a dedicated Z/Y flip.

use crate::modmask::{bit_of, is_modifier, ModMask};
use crate::vcode::{Vcode, SC_Y, SC_Z, VC_LCTRL, VC_LWIN};

#[derive(Debug, Clone)]
pub struct AlphaMap {
    table: Vec<Option<Vcode>>,
    /// When set, alpha mapping is skipped entirely while LCtrl or LWin is
    /// held — lets a user keep Ctrl/Win shortcuts on the physical layout
    /// even under a swapped alpha layer.
    pub lctrl_or_lwin_blocks: bool,
    /// Swap SC_Y and SC_Z after the table lookup (QWERTY/QWERTZ convenience).
    pub flip_y_z: bool,
}

impl Default for AlphaMap {
    fn default() -> Self {
        AlphaMap {
            table: vec![None; crate::vcode::MAX_VCODES],
            lctrl_or_lwin_blocks: false,
            flip_y_z: false,
        }
    }
}

impl AlphaMap {
    #[must_use]
    pub fn new() -> Self {
        AlphaMap::default()
    }

    pub fn set(&mut self, from: Vcode, to: Vcode) {
        self.table[from.0 as usize] = Some(to);
    }

    /// Applies the alpha swap to `vcode`, given the current `mod_down` state.
    #[must_use]
    pub fn apply(&self, vcode: Vcode, mod_down: ModMask) -> Vcode {
        if is_modifier(vcode) {
            return vcode;
        }
        if self.lctrl_or_lwin_blocks && mod_down.intersects(bit_of(VC_LCTRL) | bit_of(VC_LWIN)) {
            return vcode;
        }

        let mapped = self.table.get(vcode.0 as usize).copied().flatten().unwrap_or(vcode);
        self.flip(mapped)
    }

    fn flip(&self, vcode: Vcode) -> Vcode {
        if !self.flip_y_z {
            return vcode;
        }
        match vcode.as_scancode() {
            Some(sc) if sc == SC_Y => Vcode::from_scancode(SC_Z, vcode.is_extended()),
            Some(sc) if sc == SC_Z => Vcode::from_scancode(SC_Y, vcode.is_extended()),
            _ => vcode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcode::SC_A;

    #[test]
    fn identity_when_unmapped() {
        let map = AlphaMap::new();
        assert_eq!(map.apply(Vcode::from(SC_A), ModMask::EMPTY), Vcode::from(SC_A));
    }

    #[test]
    fn table_lookup_applies() {
        let mut map = AlphaMap::new();
        map.set(Vcode::from(SC_A), Vcode::from(0x40));
        assert_eq!(map.apply(Vcode::from(SC_A), ModMask::EMPTY), Vcode::from(0x40));
    }

    #[test]
    fn modifiers_pass_through_untouched() {
        let mut map = AlphaMap::new();
        map.set(VC_LCTRL, Vcode::from(0x40));
        assert_eq!(map.apply(VC_LCTRL, ModMask::EMPTY), VC_LCTRL);
    }

    #[test]
    fn lctrl_blocks_when_enabled() {
        let mut map = AlphaMap::new();
        map.lctrl_or_lwin_blocks = true;
        map.set(Vcode::from(SC_A), Vcode::from(0x40));
        let held = bit_of(VC_LCTRL);
        assert_eq!(map.apply(Vcode::from(SC_A), held), Vcode::from(SC_A));
    }

    #[test]
    fn y_z_flip() {
        let mut map = AlphaMap::new();
        map.flip_y_z = true;
        assert_eq!(map.apply(Vcode::from(SC_Y), ModMask::EMPTY), Vcode::from(SC_Z));
        assert_eq!(map.apply(Vcode::from(SC_Z), ModMask::EMPTY), Vcode::from(SC_Y));
    }
}
