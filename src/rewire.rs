//! Per-scancode rewrite table and the tap/tap-hold-aware rewire state
//! machine.

use crate::event::KeyEvent;
use crate::modmask::{bit_of, ModMask};
use crate::tap::TapFlags;
use crate::vcode::{Scancode, Vcode};

/// One scancode's rewrite record. `out` absent means pass the scancode
/// through unchanged (vcode == scancode, non-extended).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewireEntry {
    pub out: Option<Vcode>,
    pub if_tapped: Option<Vcode>,
    pub if_tap_held: Option<Vcode>,
}

/// Dense table indexed by scancode (0x00-0x7F).
#[derive(Debug, Clone)]
pub struct RewireTable {
    entries: [RewireEntry; 0x80],
}

impl Default for RewireTable {
    fn default() -> Self {
        RewireTable { entries: [RewireEntry::default(); 0x80] }
    }
}

impl RewireTable {
    #[must_use]
    pub fn new() -> Self {
        RewireTable::default()
    }

    pub fn set(&mut self, scancode: Scancode, entry: RewireEntry) {
        self.entries[(scancode & 0x7F) as usize] = entry;
    }

    #[must_use]
    pub fn get(&self, scancode: Scancode) -> RewireEntry {
        self.entries[(scancode & 0x7F) as usize]
    }
}

/// Outcome of running one raw event through the rewire state machine.
#[derive(Debug, Clone, Default)]
pub struct RewireOutcome {
    pub vcode: Vcode,
    pub is_modifier: bool,
    /// Extra events the rewire stage injects into the result sequence
    /// ahead of whatever combo/alpha stages produce (if-tapped and
    /// tap-hold make/break pairs).
    pub extra_events: Vec<KeyEvent>,
    /// Set when the event was fully absorbed here (autorepeat suppression):
    /// nothing further should be emitted for it.
    pub suppressed: bool,
    /// A tap-hold was requested while one was already active. Logged and
    /// ignored by the caller; never propagated as an error.
    pub tap_hold_collision: bool,
}

/// Resolves the rewire/tap/tap-hold outcome for one physical-key event.
///
/// `tap_and_hold_scancode` and the modifier bitmasks are mutated in place,
/// threading a single piece of persistent state through every event.
pub fn rewire(
    table: &RewireTable,
    scancode: Scancode,
    default_vcode: Vcode,
    is_down: bool,
    tap: TapFlags,
    tap_and_hold_scancode: &mut Option<Scancode>,
    mod_down: &mut ModMask,
    mod_tapped: &mut ModMask,
) -> RewireOutcome {
    let mut outcome = RewireOutcome::default();

    if *tap_and_hold_scancode == Some(scancode) && is_down {
        outcome.vcode = Vcode::NOP;
        outcome.suppressed = true;
        return outcome;
    }

    let entry = table.get(scancode);
    let mut vcode = entry.out.unwrap_or(default_vcode);

    if tap.tapped {
        if let Some(if_tapped) = entry.if_tapped {
            *mod_tapped = ModMask::EMPTY;
            outcome.extra_events.push(KeyEvent::up(vcode));
            if bit_of(vcode) != ModMask::EMPTY {
                *mod_down &= !bit_of(vcode);
            }
            outcome.extra_events.push(KeyEvent::down(if_tapped));
            outcome.extra_events.push(KeyEvent::up(if_tapped));
            vcode = if_tapped;
        }
    }

    if tap.tap_hold_make {
        if let Some(if_tap_held) = entry.if_tap_held {
            if tap_and_hold_scancode.is_none() {
                *tap_and_hold_scancode = Some(scancode);
                if if_tap_held.0 <= 0xFF {
                    outcome.extra_events.push(KeyEvent::down(if_tap_held));
                }
                let clear = bit_of(entry.out.unwrap_or(default_vcode))
                    | entry.if_tapped.map_or(ModMask::EMPTY, bit_of);
                *mod_tapped &= !clear;
                vcode = if_tap_held;
            } else {
                outcome.tap_hold_collision = true;
            }
        }
    }

    if !is_down && *tap_and_hold_scancode == Some(scancode) {
        *tap_and_hold_scancode = None;
        if let Some(if_tap_held) = entry.if_tap_held {
            if if_tap_held.0 <= 0xFF {
                outcome.extra_events.push(KeyEvent::up(if_tap_held));
            }
            vcode = if_tap_held;
        }
    }

    outcome.vcode = vcode;
    outcome.is_modifier = bit_of(vcode) != ModMask::EMPTY;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcode::{SC_CAPS, SC_ESCAPE, VC_LCTRL};

    fn entry_tapped_to(v: Vcode) -> RewireEntry {
        RewireEntry { out: Some(VC_LCTRL), if_tapped: Some(v), if_tap_held: None }
    }

    #[test]
    fn passthrough_when_no_entry() {
        let table = RewireTable::new();
        let mut hold = None;
        let mut down = ModMask::EMPTY;
        let mut tapped = ModMask::EMPTY;
        let out = rewire(&table, SC_CAPS, Vcode::from(SC_CAPS), true, TapFlags::default(), &mut hold, &mut down, &mut tapped);
        assert_eq!(out.vcode, Vcode::from(SC_CAPS));
    }

    #[test]
    fn autorepeat_suppressed_during_hold() {
        let table = RewireTable::new();
        let mut hold = Some(SC_CAPS);
        let mut down = ModMask::EMPTY;
        let mut tapped = ModMask::EMPTY;
        let out = rewire(&table, SC_CAPS, Vcode::from(SC_CAPS), true, TapFlags::default(), &mut hold, &mut down, &mut tapped);
        assert!(out.suppressed);
        assert_eq!(out.vcode, Vcode::NOP);
    }

    #[test]
    fn if_tapped_rewrites_and_clears_mod_tapped() {
        let escape = Vcode::from(SC_ESCAPE);
        let mut table = RewireTable::new();
        table.set(SC_CAPS, entry_tapped_to(escape));
        let mut hold = None;
        let mut down = bit_of(VC_LCTRL);
        let mut tapped = bit_of(VC_LCTRL);
        let flags = TapFlags { tapped: true, slow_tap: false, tap_hold_make: false };
        let out = rewire(&table, SC_CAPS, Vcode::from(SC_CAPS), false, flags, &mut hold, &mut down, &mut tapped);
        assert_eq!(out.vcode, escape);
        assert_eq!(tapped, ModMask::EMPTY);
        assert!(down.is_empty());
    }

    #[test]
    fn tap_hold_make_then_break() {
        let mut table = RewireTable::new();
        table.set(SC_CAPS, RewireEntry { out: None, if_tapped: None, if_tap_held: Some(VC_LCTRL) });
        let mut hold = None;
        let mut down = ModMask::EMPTY;
        let mut tapped = ModMask::EMPTY;
        let flags = TapFlags { tapped: false, slow_tap: false, tap_hold_make: true };
        let make = rewire(&table, SC_CAPS, Vcode::from(SC_CAPS), true, flags, &mut hold, &mut down, &mut tapped);
        assert_eq!(hold, Some(SC_CAPS));
        assert_eq!(make.vcode, VC_LCTRL);

        let brk = rewire(&table, SC_CAPS, Vcode::from(SC_CAPS), false, TapFlags::default(), &mut hold, &mut down, &mut tapped);
        assert_eq!(hold, None);
        assert_eq!(brk.vcode, VC_LCTRL);
    }

    #[test]
    fn second_tap_hold_is_collision() {
        let mut table = RewireTable::new();
        table.set(SC_CAPS, RewireEntry { out: None, if_tapped: None, if_tap_held: Some(VC_LCTRL) });
        table.set(0x20, RewireEntry { out: None, if_tapped: None, if_tap_held: Some(VC_LCTRL) });
        let mut hold = Some(SC_CAPS);
        let mut down = ModMask::EMPTY;
        let mut tapped = ModMask::EMPTY;
        let flags = TapFlags { tapped: false, slow_tap: false, tap_hold_make: true };
        let out = rewire(&table, 0x20, Vcode::from(0x20u8), true, flags, &mut hold, &mut down, &mut tapped);
        assert!(out.tap_hold_collision);
        assert_eq!(hold, Some(SC_CAPS));
    }
}
