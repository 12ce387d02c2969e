//! Combo matching: modifier-predicated multi-key output sequences.

use crate::event::KeyEvent;
use crate::modmask::ModMask;
use crate::vcode::Vcode;

/// One declared combo. `deadkey` is the active-deadkey vcode the combo
/// requires (`Vcode::NOP` for "no deadkey armed"); the remaining `mod_*`
/// fields predicate on the modifier bitmasks.
#[derive(Debug, Clone)]
pub struct Combo {
    pub trigger_vcode: Vcode,
    pub deadkey: Vcode,
    pub mod_and: ModMask,
    pub mod_or: ModMask,
    pub mod_not: ModMask,
    pub mod_tap: ModMask,
    pub output: Vec<KeyEvent>,
}

impl Combo {
    fn predicate_matches(&self, mod_down: ModMask, mod_tapped: ModMask) -> bool {
        (mod_down.contains(self.mod_and))
            && (self.mod_or.is_empty() || mod_down.intersects(self.mod_or))
            && !mod_down.intersects(self.mod_not)
            && mod_tapped.contains(self.mod_tap)
    }

    fn matches(&self, vcode: Vcode, active_deadkey: Vcode, mod_down: ModMask, mod_tapped: ModMask) -> bool {
        self.trigger_vcode == vcode
            && self.deadkey == active_deadkey
            && self.predicate_matches(mod_down, mod_tapped)
    }
}

/// Ordered list of combos; declaration order is match priority.
#[derive(Debug, Clone, Default)]
pub struct ComboTable {
    combos: Vec<Combo>,
}

impl ComboTable {
    #[must_use]
    pub fn new() -> Self {
        ComboTable::default()
    }

    pub fn push(&mut self, combo: Combo) {
        self.combos.push(combo);
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Combo> {
        self.combos.iter()
    }

    /// First-match-wins lookup. Only called on downstrokes by the caller.
    #[must_use]
    pub fn find_match(
        &self,
        vcode: Vcode,
        active_deadkey: Vcode,
        mod_down: ModMask,
        mod_tapped: ModMask,
    ) -> Option<&Combo> {
        self.combos
            .iter()
            .find(|c| c.matches(vcode, active_deadkey, mod_down, mod_tapped))
    }
}
