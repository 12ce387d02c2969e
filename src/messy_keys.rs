//! Messy-key canonicalization: normalizes the OS-specific
//! multi-stroke encodings of Pause/Break/SysRq/NumLock into either a drop
//! or a retargeted vcode.

use crate::event::RawEvent;
use crate::vcode::{
    Vcode, SC_ALTPRINT, SC_BREAK, SC_CAPS, SC_NUMLOCK, SC_PRINT, SC_SCRLOCK, VC_PAUSE,
};

/// What the gate stage should do with the event after canonicalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessyOutcome {
    /// Continue processing with this (possibly retargeted) vcode.
    Continue(Vcode),
    /// Drop the event entirely; nothing further happens for it this tick.
    Drop,
}

/// Inputs the messy-key canonicalizer needs beyond the raw event itself.
#[derive(Debug, Clone, Copy)]
pub struct MessyKeyContext {
    pub translate_messy_keys: bool,
    pub protect_console: bool,
    pub is_engine_window_foreground: bool,
    pub lctrl_down: bool,
    /// Set when `prev1` carried the E1 escape bit (the dropped LCtrl half
    /// of an unmodified Pause sequence).
    pub prev1_was_e1_lctrl: bool,
}

/// Runs the gate against one already-rewired-to-scancode vcode. `vcode` here is
/// the plain scancode-aliased vcode before the rewire table is consulted —
/// messy-key canonicalization runs ahead of rewire in the gate stage.
#[must_use]
pub fn canonicalize(raw: RawEvent, vcode: Vcode, ctx: MessyKeyContext) -> MessyOutcome {
    let mut vcode = vcode;

    if vcode == Vcode::from(SC_ALTPRINT) {
        if ctx.translate_messy_keys {
            vcode = Vcode::from(SC_PRINT);
        }
        return MessyOutcome::Continue(vcode);
    }

    if ctx.protect_console
        && vcode == Vcode::from(SC_NUMLOCK)
        && ctx.lctrl_down
        && ctx.is_engine_window_foreground
    {
        return MessyOutcome::Drop;
    }

    if ctx.protect_console
        && vcode == Vcode::from(SC_SCRLOCK)
        && ctx.lctrl_down
        && ctx.is_engine_window_foreground
    {
        return MessyOutcome::Drop;
    }

    if vcode == Vcode::from(SC_BREAK) {
        if ctx.protect_console && ctx.lctrl_down && ctx.is_engine_window_foreground {
            return MessyOutcome::Drop;
        }
        if ctx.translate_messy_keys {
            vcode = VC_PAUSE;
        }
        return MessyOutcome::Continue(vcode);
    }

    if ctx.translate_messy_keys && raw.is_escape() {
        // E1-prefixed: only LCtrl is expected here; its Vcode is dropped on
        // its own, the pairing NumLock is retargeted below via prev1.
        return MessyOutcome::Drop;
    }

    if ctx.translate_messy_keys && vcode == Vcode::from(SC_NUMLOCK) && ctx.prev1_was_e1_lctrl {
        return MessyOutcome::Continue(VC_PAUSE);
    }

    MessyOutcome::Continue(vcode)
}

/// Which lock-key LED, if any, this vcode drives — used by the gate's
/// LED-resync step.
#[must_use]
pub fn led_for_vcode(vcode: Vcode) -> Option<crate::collaborators::LedIndicator> {
    use crate::collaborators::LedIndicator;
    match vcode.as_scancode() {
        Some(sc) if sc == crate::vcode::SC_NUMLOCK => Some(LedIndicator::NumLock),
        Some(sc) if sc == SC_SCRLOCK => Some(LedIndicator::ScrollLock),
        Some(sc) if sc == SC_CAPS => Some(LedIndicator::CapsLock),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> MessyKeyContext {
        MessyKeyContext {
            translate_messy_keys: true,
            protect_console: true,
            is_engine_window_foreground: true,
            lctrl_down: true,
            prev1_was_e1_lctrl: false,
        }
    }

    #[test]
    fn altprint_translates_to_print() {
        let out = canonicalize(RawEvent::default(), Vcode::from(SC_ALTPRINT), ctx());
        assert_eq!(out, MessyOutcome::Continue(Vcode::from(SC_PRINT)));
    }

    #[test]
    fn ctrl_numlock_dropped_when_foreground() {
        let out = canonicalize(RawEvent::default(), Vcode::from(SC_NUMLOCK), ctx());
        assert_eq!(out, MessyOutcome::Drop);
    }

    #[test]
    fn ctrl_pause_break_dropped_when_foreground() {
        let out = canonicalize(RawEvent::default(), Vcode::from(SC_BREAK), ctx());
        assert_eq!(out, MessyOutcome::Drop);
    }

    #[test]
    fn break_translates_to_pause_when_not_foreground() {
        let mut c = ctx();
        c.is_engine_window_foreground = false;
        let out = canonicalize(RawEvent::default(), Vcode::from(SC_BREAK), c);
        assert_eq!(out, MessyOutcome::Continue(VC_PAUSE));
    }

    #[test]
    fn e1_lctrl_half_dropped() {
        let raw = RawEvent { code: crate::vcode::SC_LCTRL, state: 0b0100 };
        let out = canonicalize(raw, Vcode::from(crate::vcode::SC_LCTRL), ctx());
        assert_eq!(out, MessyOutcome::Drop);
    }

    #[test]
    fn numlock_after_e1_lctrl_becomes_pause() {
        let mut c = ctx();
        c.prev1_was_e1_lctrl = true;
        let out = canonicalize(RawEvent::default(), Vcode::from(SC_NUMLOCK), c);
        assert_eq!(out, MessyOutcome::Continue(VC_PAUSE));
    }
}
