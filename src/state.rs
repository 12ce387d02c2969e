//! Explicit context structs threaded through the pipeline, replacing a bag
//! of global mutable state with owned, passable data.

use crate::error::ErrorLog;
use crate::event::KeyEvent;
use crate::modmask::ModMask;
use crate::vcode::{Scancode, Vcode, MAX_NUM_MACROS};

/// Process-lifetime state: which config is active, device identity,
/// outstanding-key bookkeeping, and macro storage.
#[derive(Debug, Clone)]
pub struct GlobalState {
    pub on: bool,
    pub active_config: u8,
    pub previous_config: u8,
    pub active_config_name: String,
    pub real_escape_down: bool,
    pub device_id: Option<String>,
    pub is_apple: bool,
    /// Every scancode actually emitted-but-not-yet-released, for clean
    /// teardown on `reset()`.
    pub keys_down_sent: [bool; 256],
    /// Snapshot of `keys_down_sent` taken during TEMPRELEASE, restored by
    /// TEMPRESTORE.
    pub keys_down_temp_released: [bool; 256],
    /// `None` when idle; `Some(0)` for the "hard" ESC+J macro; `Some(1..N)`
    /// for named slots.
    pub recording_macro: Option<u8>,
    pub recorded_macros: Vec<Vec<KeyEvent>>,
    pub secret_playback: bool,
    pub secret_recording: bool,
    pub error_log: ErrorLog,
}

impl Default for GlobalState {
    fn default() -> Self {
        GlobalState {
            on: true,
            active_config: 1,
            previous_config: 1,
            active_config_name: String::new(),
            real_escape_down: false,
            device_id: None,
            is_apple: false,
            keys_down_sent: [false; 256],
            keys_down_temp_released: [false; 256],
            recording_macro: None,
            recorded_macros: vec![Vec::new(); MAX_NUM_MACROS],
            secret_playback: false,
            secret_recording: false,
            error_log: ErrorLog::new(),
        }
    }
}

impl GlobalState {
    /// Parity counter over `keys_down_sent`, used by the state-violation
    /// drift check.
    #[must_use]
    pub fn down_count(&self) -> usize {
        self.keys_down_sent.iter().filter(|b| **b).count()
    }
}

/// Per-tap-sequence state: the armed deadkey, the modifier bitmasks, and
/// the single in-flight tap-hold scancode.
#[derive(Debug, Clone, Default)]
pub struct ModifierState {
    pub active_deadkey: Vcode,
    pub mod_down: ModMask,
    pub mod_tapped: ModMask,
    pub mods_temp_altered: Vec<KeyEvent>,
    pub tap_and_hold_scancode: Option<Scancode>,
}

/// Cleared at the start of every tick.
#[derive(Debug, Clone, Default)]
pub struct LoopState {
    pub raw_scancode: Scancode,
    pub vcode: Vcode,
    pub is_down: bool,
    pub is_modifier: bool,
    pub tapped: bool,
    pub tapped_slow: bool,
    pub tap_hold_make: bool,
    pub result_sequence: Vec<KeyEvent>,
}

impl LoopState {
    pub fn reset(&mut self) {
        *self = LoopState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_state_starts_with_no_keys_down() {
        let state = GlobalState::default();
        assert_eq!(state.down_count(), 0);
        assert_eq!(state.recorded_macros.len(), MAX_NUM_MACROS);
    }

    #[test]
    fn loop_state_reset_clears_sequence() {
        let mut loop_state = LoopState::default();
        loop_state.result_sequence.push(KeyEvent::down(Vcode::NOP));
        loop_state.reset();
        assert!(loop_state.result_sequence.is_empty());
    }
}
