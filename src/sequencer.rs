//! Output sequencer: plays a `result_sequence` of `KeyEvent`s,
//! dispatching embedded control opcodes along the way.

use crate::error::EngineError;
use crate::event::{KeyEvent, RawEvent};
use crate::vcode::{
    Vcode, VC_CONFIGSWITCH, VC_DEADKEY, VC_OBFUSCATED_SEQUENCE_START, VC_PLAYMACRO,
    VC_RECORDMACRO, VC_RECORDSECRETMACRO, VC_SLEEP, VC_TEMPRELEASEKEYS, VC_TEMPRESTOREKEYS,
};
use crate::vcode::{SC_LCTRL, SC_NUMLOCK, VC_PAUSE};

/// Control opcodes a sequence may embed, classified from a vcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opcode {
    Sleep,
    Deadkey,
    ConfigSwitch,
    RecordMacro,
    RecordSecretMacro,
    PlayMacro,
    TempReleaseKeys,
    TempRestoreKeys,
    ObfuscatedSequenceStart,
}

fn classify(vcode: Vcode) -> Option<Opcode> {
    Some(match vcode {
        v if v == VC_SLEEP => Opcode::Sleep,
        v if v == VC_DEADKEY => Opcode::Deadkey,
        v if v == VC_CONFIGSWITCH => Opcode::ConfigSwitch,
        v if v == VC_RECORDMACRO => Opcode::RecordMacro,
        v if v == VC_RECORDSECRETMACRO => Opcode::RecordSecretMacro,
        v if v == VC_PLAYMACRO => Opcode::PlayMacro,
        v if v == VC_TEMPRELEASEKEYS => Opcode::TempReleaseKeys,
        v if v == VC_TEMPRESTOREKEYS => Opcode::TempRestoreKeys,
        v if v == VC_OBFUSCATED_SEQUENCE_START => Opcode::ObfuscatedSequenceStart,
        _ => return None,
    })
}

fn takes_parameter(opcode: Opcode) -> bool {
    matches!(
        opcode,
        Opcode::Sleep
            | Opcode::Deadkey
            | Opcode::ConfigSwitch
            | Opcode::RecordMacro
            | Opcode::RecordSecretMacro
            | Opcode::PlayMacro
    )
}

/// Everything the sequencer needs from the engine to carry out an opcode or
/// inject an ordinary event. Implemented by [`crate::engine::Engine`]; kept
/// as a trait so the playback algorithm here stays table-driven and free
/// of direct engine state access.
pub trait SequencerHost {
    /// Injects one ordinary (non-opcode) key event.
    fn emit(&mut self, vcode: Vcode, is_down: bool) -> Result<(), EngineError>;
    fn sleep(&mut self, ms: u32);
    fn normal_delay_ms(&self) -> u32;
    fn ahk_hotkey_delay_ms(&self) -> u32;
    fn set_deadkey(&mut self, vcode: Vcode);
    fn switch_config(&mut self, n: u8);
    fn start_recording(&mut self, slot: u8, secret: bool) -> Result<(), EngineError>;
    fn play_macro(&mut self, slot: u8) -> Result<(), EngineError>;
    fn temp_release_keys(&mut self) -> Result<(), EngineError>;
    fn temp_restore_keys(&mut self) -> Result<(), EngineError>;
    fn begin_obfuscated_playback(&mut self);
    fn record_error(&mut self, err: EngineError);
    fn is_ahk_hotkey(&self, vcode: Vcode) -> bool;
}

/// Plays `sequence` against `host`, returning `Err` only for a fatal
/// [`EngineError::Driver`] from an injection; every other failure is
/// recorded on `host` and playback continues with the next event.
pub fn play(sequence: &[KeyEvent], host: &mut dyn SequencerHost) -> Result<(), EngineError> {
    let mut i = 0;
    while i < sequence.len() {
        let ev = sequence[i];

        if let Some(opcode) = classify(ev.vcode) {
            if takes_parameter(opcode) {
                i += 1;
                let Some(param) = sequence.get(i) else {
                    host.record_error(EngineError::StateViolation(
                        "sequence ended with an unfinished opcode parameter".into(),
                    ));
                    break;
                };
                apply_parametric_opcode(opcode, param.vcode.0, host);
            } else {
                apply_bare_opcode(opcode, host);
            }
            i += 1;
            continue;
        }

        host.emit(ev.vcode, ev.is_down)?;
        let delay = if host.is_ahk_hotkey(ev.vcode) {
            host.ahk_hotkey_delay_ms()
        } else {
            host.normal_delay_ms()
        };
        host.sleep(delay);
        i += 1;
    }
    Ok(())
}

fn apply_parametric_opcode(opcode: Opcode, param: u16, host: &mut dyn SequencerHost) {
    match opcode {
        Opcode::Sleep => host.sleep(u32::from(param)),
        Opcode::Deadkey => host.set_deadkey(Vcode(param)),
        Opcode::ConfigSwitch => host.switch_config(param as u8),
        Opcode::RecordMacro => {
            if let Err(e) = host.start_recording(param as u8, false) {
                host.record_error(e);
            }
        }
        Opcode::RecordSecretMacro => {
            if let Err(e) = host.start_recording(param as u8, true) {
                host.record_error(e);
            }
        }
        Opcode::PlayMacro => {
            if let Err(e) = host.play_macro(param as u8) {
                host.record_error(e);
            }
        }
        Opcode::TempReleaseKeys | Opcode::TempRestoreKeys | Opcode::ObfuscatedSequenceStart => {
            unreachable!("bare-only opcode routed through parametric path")
        }
    }
}

fn apply_bare_opcode(opcode: Opcode, host: &mut dyn SequencerHost) {
    match opcode {
        Opcode::TempReleaseKeys => {
            if let Err(e) = host.temp_release_keys() {
                host.record_error(e);
            }
        }
        Opcode::TempRestoreKeys => {
            if let Err(e) = host.temp_restore_keys() {
                host.record_error(e);
            }
        }
        Opcode::ObfuscatedSequenceStart => host.begin_obfuscated_playback(),
        _ => unreachable!("parametric opcode routed through bare path"),
    }
}

/// The exact four-event Pause sequence. Bit 2 of `state` marks the
/// E1 escape.
#[must_use]
pub fn pause_sequence() -> [RawEvent; 4] {
    [
        RawEvent { code: SC_LCTRL, state: 0b100 },
        RawEvent { code: SC_NUMLOCK, state: 0b000 },
        RawEvent { code: SC_LCTRL, state: 0b101 },
        RawEvent { code: SC_NUMLOCK, state: 0b001 },
    ]
}

/// True for the synthetic `PAUSE` vcode and anything above the scancode-
/// aliased range — these never reach `send_vkey_event`'s "ordinary event"
/// path; a downstroke dispatches to the control-opcode handler instead.
#[must_use]
pub fn is_control_vcode(vcode: Vcode) -> bool {
    vcode.0 > 0xFF || vcode == VC_PAUSE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct MockHost {
        emitted: Vec<(Vcode, bool)>,
        sleeps: Vec<u32>,
        deadkey: Option<Vcode>,
        config_switches: Vec<u8>,
        temp_released: bool,
        temp_restored: bool,
        obfuscated: bool,
        errors: RefCell<Vec<EngineError>>,
    }

    impl SequencerHost for MockHost {
        fn emit(&mut self, vcode: Vcode, is_down: bool) -> Result<(), EngineError> {
            self.emitted.push((vcode, is_down));
            Ok(())
        }
        fn sleep(&mut self, ms: u32) {
            self.sleeps.push(ms);
        }
        fn normal_delay_ms(&self) -> u32 {
            5
        }
        fn ahk_hotkey_delay_ms(&self) -> u32 {
            50
        }
        fn set_deadkey(&mut self, vcode: Vcode) {
            self.deadkey = Some(vcode);
        }
        fn switch_config(&mut self, n: u8) {
            self.config_switches.push(n);
        }
        fn start_recording(&mut self, _slot: u8, _secret: bool) -> Result<(), EngineError> {
            Ok(())
        }
        fn play_macro(&mut self, _slot: u8) -> Result<(), EngineError> {
            Ok(())
        }
        fn temp_release_keys(&mut self) -> Result<(), EngineError> {
            self.temp_released = true;
            Ok(())
        }
        fn temp_restore_keys(&mut self) -> Result<(), EngineError> {
            self.temp_restored = true;
            Ok(())
        }
        fn begin_obfuscated_playback(&mut self) {
            self.obfuscated = true;
        }
        fn record_error(&mut self, err: EngineError) {
            self.errors.borrow_mut().push(err);
        }
        fn is_ahk_hotkey(&self, _vcode: Vcode) -> bool {
            false
        }
    }

    #[test]
    fn ordinary_events_emit_and_sleep() {
        let mut host = MockHost::default();
        let seq = [KeyEvent::down(Vcode::from(0x1E)), KeyEvent::up(Vcode::from(0x1E))];
        play(&seq, &mut host).unwrap();
        assert_eq!(host.emitted.len(), 2);
        assert_eq!(host.sleeps, vec![5, 5]);
    }

    #[test]
    fn sleep_opcode_consumes_its_parameter() {
        let mut host = MockHost::default();
        let seq = [KeyEvent::down(VC_SLEEP), KeyEvent::down(Vcode(250))];
        play(&seq, &mut host).unwrap();
        assert!(host.emitted.is_empty());
        assert_eq!(host.sleeps, vec![250]);
    }

    #[test]
    fn deadkey_opcode_sets_deadkey() {
        let mut host = MockHost::default();
        let seq = [KeyEvent::down(VC_DEADKEY), KeyEvent::down(Vcode(0x42))];
        play(&seq, &mut host).unwrap();
        assert_eq!(host.deadkey, Some(Vcode(0x42)));
    }

    #[test]
    fn temp_release_and_restore_bracket_body() {
        let mut host = MockHost::default();
        let seq = [
            KeyEvent::down(VC_TEMPRELEASEKEYS),
            KeyEvent::down(Vcode::from(0x1E)),
            KeyEvent::up(Vcode::from(0x1E)),
            KeyEvent::down(VC_TEMPRESTOREKEYS),
        ];
        play(&seq, &mut host).unwrap();
        assert!(host.temp_released);
        assert!(host.temp_restored);
        assert_eq!(host.emitted.len(), 2);
    }

    #[test]
    fn unfinished_parameter_is_recorded_not_propagated() {
        let mut host = MockHost::default();
        let seq = [KeyEvent::down(VC_SLEEP)];
        let result = play(&seq, &mut host);
        assert!(result.is_ok());
        assert_eq!(host.errors.borrow().len(), 1);
    }

    #[test]
    fn pause_sequence_matches_spec() {
        let seq = pause_sequence();
        assert_eq!(seq[0], RawEvent { code: SC_LCTRL, state: 0b100 });
        assert_eq!(seq[3], RawEvent { code: SC_NUMLOCK, state: 0b001 });
    }
}
