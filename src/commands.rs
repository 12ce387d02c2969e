//! The ESC+key command surface, produced while ESC is held.

use crate::vcode::{Scancode, SC_0, SC_1, SC_2, SC_3, SC_4, SC_5, SC_6, SC_7, SC_8, SC_9};
use crate::vcode::{
    SC_A, SC_B, SC_BACK, SC_C, SC_COMMA, SC_D, SC_DOT, SC_E, SC_H, SC_I, SC_J, SC_K, SC_L, SC_Q,
    SC_R, SC_S, SC_SEMI, SC_SLASH, SC_T, SC_W, SC_X, SC_Y, SC_Z,
};

/// One ESC+key command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Exit,
    SwitchConfig(u8),
    Reset,
    ReloadConfig,
    DumpConfig,
    Status,
    ToggleDebug,
    ErrorLog,
    Help,
    KeyLabelTable,
    ToggleTray,
    ToggleAppleAltWin,
    ToggleYZ,
    DelayDec,
    DelayInc,
    MacroRecordStart,
    MacroRecordStop,
    MacroPlay,
    MacroCopyClipboard,
    StartHelper,
    StopHelper,
    DebugBuildExit,
    BetaSlot,
}

/// Maps the unwired hardware scancode held while ESC is down to the
/// command it invokes, or `None` if the key has no assigned command.
#[must_use]
pub fn command_for_scancode(scancode: Scancode) -> Option<Command> {
    Some(match scancode {
        SC_X => Command::Exit,
        SC_0 => Command::SwitchConfig(0),
        SC_1 => Command::SwitchConfig(1),
        SC_2 => Command::SwitchConfig(2),
        SC_3 => Command::SwitchConfig(3),
        SC_4 => Command::SwitchConfig(4),
        SC_5 => Command::SwitchConfig(5),
        SC_6 => Command::SwitchConfig(6),
        SC_7 => Command::SwitchConfig(7),
        SC_8 => Command::SwitchConfig(8),
        SC_9 => Command::SwitchConfig(9),
        SC_BACK => Command::Reset,
        SC_R => Command::ReloadConfig,
        SC_I => Command::DumpConfig,
        SC_S => Command::Status,
        SC_D => Command::ToggleDebug,
        SC_E => Command::ErrorLog,
        SC_H => Command::Help,
        SC_C => Command::KeyLabelTable,
        SC_T => Command::ToggleTray,
        SC_W => Command::ToggleAppleAltWin,
        SC_Z => Command::ToggleYZ,
        SC_COMMA => Command::DelayDec,
        SC_DOT => Command::DelayInc,
        SC_J => Command::MacroRecordStart,
        SC_K => Command::MacroRecordStop,
        SC_L => Command::MacroPlay,
        SC_SEMI => Command::MacroCopyClipboard,
        SC_A => Command::StartHelper,
        SC_Y => Command::StopHelper,
        SC_Q => Command::DebugBuildExit,
        SC_B => Command::BetaSlot,
        _ => return None,
    })
}

/// What `Engine::run_command` returns: whether the main loop should keep
/// running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Exit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_key_maps_to_exit() {
        assert_eq!(command_for_scancode(SC_X), Some(Command::Exit));
    }

    #[test]
    fn digit_keys_map_to_switch_config() {
        assert_eq!(command_for_scancode(SC_3), Some(Command::SwitchConfig(3)));
    }

    #[test]
    fn unassigned_key_has_no_command() {
        assert_eq!(command_for_scancode(crate::vcode::SC_F1), None);
    }
}
