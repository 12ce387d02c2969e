//! Macro recorder: start/stop trimming and the TEMPRELEASE/RESTORE
//! wrap applied when a recording stops.

use crate::event::{obfuscate_vcode, KeyEvent};
use crate::vcode::{VC_TEMPRELEASEKEYS, VC_TEMPRESTOREKEYS};

/// Appends `ev` to an in-progress recording, obfuscating the vcode first
/// when `secret` is set. Shares `send_vkey_event`'s write-through tap: the
/// caller invokes this for every event emitted while `recording_macro` is
/// `Some`.
pub fn record_event(buffer: &mut Vec<KeyEvent>, ev: KeyEvent, secret: bool) {
    let ev = if secret { KeyEvent { vcode: obfuscate_vcode(ev.vcode), ..ev } } else { ev };
    buffer.push(ev);
}

/// Finalizes a stopped recording: trims the trailing down-strokes left by
/// the shortcut that ended recording, trims the leading up-strokes left by
/// releasing the shortcut that started it, then wraps the remaining body
/// in `[TEMPRELEASEKEYS, ...body, TEMPRESTOREKEYS]` so replay doesn't fight
/// whichever keys are still physically held from the starting shortcut.
#[must_use]
pub fn finalize(mut body: Vec<KeyEvent>) -> Vec<KeyEvent> {
    while matches!(body.last(), Some(ev) if ev.is_down) {
        body.pop();
    }
    while matches!(body.first(), Some(ev) if !ev.is_down) {
        body.remove(0);
    }

    let mut wrapped = Vec::with_capacity(body.len() + 2);
    wrapped.push(KeyEvent::down(VC_TEMPRELEASEKEYS));
    wrapped.extend(body);
    wrapped.push(KeyEvent::down(VC_TEMPRESTOREKEYS));
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcode::{Vcode, VC_PAUSE};

    fn sc(n: u16) -> Vcode {
        Vcode(n)
    }

    #[test]
    fn trims_trailing_downs_and_leading_ups() {
        let body = vec![
            KeyEvent::up(sc(0x1E)),     // leading up from releasing the starter shortcut
            KeyEvent::down(sc(0x20)),
            KeyEvent::up(sc(0x20)),
            KeyEvent::down(sc(0x25)),   // trailing down from the stopper keypress
        ];
        let finalized = finalize(body);
        assert_eq!(
            finalized,
            vec![
                KeyEvent::down(VC_TEMPRELEASEKEYS),
                KeyEvent::down(sc(0x20)),
                KeyEvent::up(sc(0x20)),
                KeyEvent::down(VC_TEMPRESTOREKEYS),
            ]
        );
    }

    #[test]
    fn empty_body_still_gets_wrapped() {
        let finalized = finalize(vec![]);
        assert_eq!(finalized, vec![KeyEvent::down(VC_TEMPRELEASEKEYS), KeyEvent::down(VC_TEMPRESTOREKEYS)]);
    }

    #[test]
    fn secret_recording_obfuscates_vcode() {
        let mut buffer = Vec::new();
        record_event(&mut buffer, KeyEvent::down(VC_PAUSE), true);
        assert_ne!(buffer[0].vcode, VC_PAUSE);
    }

    #[test]
    fn non_secret_recording_leaves_vcode_untouched() {
        let mut buffer = Vec::new();
        record_event(&mut buffer, KeyEvent::down(VC_PAUSE), false);
        assert_eq!(buffer[0].vcode, VC_PAUSE);
    }
}
