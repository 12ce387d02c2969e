//! Tap detection: a pure function of the last three raw events for a single
//! physical key.

use crate::event::RawEvent;

/// The classification produced for the current event, derived only from
/// `prev2`, `prev1`, and `current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TapFlags {
    pub tapped: bool,
    pub slow_tap: bool,
    pub tap_hold_make: bool,
}

/// Rolling history of the last two raw events plus the current one. The tap
/// detector never looks further back than this.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventHistory {
    pub prev2: Option<RawEvent>,
    pub prev1: Option<RawEvent>,
}

impl EventHistory {
    #[must_use]
    pub fn new() -> Self {
        EventHistory::default()
    }

    /// Classify `current` against the held history, then shift the window.
    pub fn push(&mut self, current: RawEvent) -> TapFlags {
        let flags = classify(self.prev2, self.prev1, current);
        self.prev2 = self.prev1;
        self.prev1 = Some(current);
        flags
    }
}

fn same_key(a: RawEvent, b: RawEvent) -> bool {
    a.code == b.code && a.is_extended() == b.is_extended()
}

/// Pure classification of a down-up-down (or down-down-up) triple for one
/// physical key. `prev2`/`prev1` are `None` before enough history exists, in
/// which case no flag can be set.
#[must_use]
pub fn classify(prev2: Option<RawEvent>, prev1: Option<RawEvent>, current: RawEvent) -> TapFlags {
    let mut flags = TapFlags::default();

    let Some(p1) = prev1 else {
        return flags;
    };

    let tapped = current.is_release() && same_key(current, p1) && !p1.is_release();
    if tapped {
        if let Some(p2) = prev2 {
            if same_key(current, p2) && !p2.is_release() {
                flags.slow_tap = true;
            }
        }
        flags.tapped = !flags.slow_tap;
    }

    if let Some(p2) = prev2 {
        let all_same = same_key(current, p1) && same_key(p1, p2);
        if all_same && !current.is_release() && p1.is_release() && !p2.is_release() {
            flags.tap_hold_make = true;
        }
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcode::SC_CAPS;

    fn down(code: u8) -> RawEvent {
        RawEvent { code, state: 0 }
    }
    fn up(code: u8) -> RawEvent {
        RawEvent { code, state: 0b0001 }
    }

    #[test]
    fn plain_tap() {
        let flags = classify(None, Some(down(SC_CAPS)), up(SC_CAPS));
        assert!(flags.tapped);
        assert!(!flags.slow_tap);
        assert!(!flags.tap_hold_make);
    }

    #[test]
    fn autorepeat_before_release_is_slow_tap() {
        // {CAPS,down}, {CAPS,down} (autorepeat), {CAPS,up}
        let flags = classify(Some(down(SC_CAPS)), Some(down(SC_CAPS)), up(SC_CAPS));
        assert!(!flags.tapped);
        assert!(flags.slow_tap);
    }

    #[test]
    fn tap_hold_make_sequence() {
        // {CAPS,down}, {CAPS,up}, {CAPS,down} (held past repeat threshold)
        let flags = classify(Some(down(SC_CAPS)), Some(up(SC_CAPS)), down(SC_CAPS));
        assert!(flags.tap_hold_make);
        assert!(!flags.tapped);
    }

    #[test]
    fn unrelated_key_breaks_sequence() {
        let flags = classify(Some(down(SC_CAPS)), Some(up(SC_CAPS)), down(0x20));
        assert!(!flags.tap_hold_make);
    }

    #[test]
    fn history_rolls_forward() {
        let mut hist = EventHistory::new();
        assert!(!hist.push(down(SC_CAPS)).tapped);
        assert!(hist.push(up(SC_CAPS)).tapped);
    }

    #[test]
    fn identical_triples_are_deterministic() {
        let a = classify(Some(down(SC_CAPS)), Some(up(SC_CAPS)), down(SC_CAPS));
        let b = classify(Some(down(SC_CAPS)), Some(up(SC_CAPS)), down(SC_CAPS));
        assert_eq!(a, b);
    }
}
