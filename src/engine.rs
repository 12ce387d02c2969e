//! The top-level pipeline: wires capture, gate, tap/rewire, modifiers,
//! combo, alpha, and the output sequencer into a single-threaded,
//! one-event-at-a-time dispatch loop.

use crate::alpha::AlphaMap;
use crate::collaborators::{CaptureDriver, ConfigSource, DeviceId, LedIndicator, OsServices};
use crate::combo::ComboTable;
use crate::commands::{command_for_scancode, Command, CommandOutcome};
use crate::config::{self, Config, ConfigWarning, Globals, Options};
use crate::error::EngineError;
use crate::event::{deobfuscate_vcode, KeyEvent, RawEvent};
use crate::messy_keys::{self, MessyKeyContext, MessyOutcome};
use crate::modmask::{bit_of, ModMask};
use crate::rewire::RewireTable;
use crate::sequencer::{self, SequencerHost};
use crate::state::{GlobalState, LoopState, ModifierState};
use crate::tap::EventHistory;
use crate::vcode::{
    Vcode, MAX_NUM_MACROS, SC_ESCAPE, SC_LALT, SC_LWIN, SC_RWIN, VC_AHK_HOTKEY1, VC_AHK_HOTKEY2,
    VC_PAUSE,
};

/// Bound on nested `PLAYMACRO` invocations (a macro whose body itself plays
/// another macro), so a cyclic macro definition can't recurse unbounded.
const MAX_MACRO_PLAYBACK_DEPTH: u32 = 8;

/// What one turn of the dispatch loop (`process_raw_event`) resolved to, in
/// place of overloading an error variant for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Keep reading events.
    Continue,
    /// `ESC+X`/`ESC+Q` was invoked; `reset()` has already run. The caller
    /// should stop the dispatch loop and exit with status 0.
    Exit,
}

/// Bundles every collaborator the engine needs. Constructed once by the
/// embedding binary.
pub struct Engine {
    global: GlobalState,
    modifiers: ModifierState,
    loop_state: LoopState,
    history: EventHistory,
    rewire_table: RewireTable,
    combo_table: ComboTable,
    alpha_map: AlphaMap,
    options: Options,
    globals: Globals,
    capture: Box<dyn CaptureDriver>,
    os: Box<dyn OsServices>,
    config_source: Box<dyn ConfigSource>,
    /// Tracks whether `history.prev1` carried the E1 escape bit, for the
    /// Pause-sequence pairing in the messy-key gate.
    prev1_was_e1_lctrl: bool,
    /// Nesting depth of the current `PLAYMACRO` chain; bounds recursion per
    /// `MAX_MACRO_PLAYBACK_DEPTH`.
    macro_playback_depth: u32,
}

impl Engine {
    pub fn new(
        capture: Box<dyn CaptureDriver>,
        os: Box<dyn OsServices>,
        config_source: Box<dyn ConfigSource>,
    ) -> Self {
        Engine {
            global: GlobalState::default(),
            modifiers: ModifierState::default(),
            loop_state: LoopState::default(),
            history: EventHistory::new(),
            rewire_table: RewireTable::new(),
            combo_table: ComboTable::new(),
            alpha_map: AlphaMap::new(),
            options: Options::default(),
            globals: Globals::default(),
            capture,
            os,
            config_source,
            prev1_was_e1_lctrl: false,
            macro_playback_depth: 0,
        }
    }

    #[must_use]
    pub fn error_log(&self) -> String {
        self.global.error_log.as_str()
    }

    /// Read-only introspection for the `ESC+S` status surface and for
    /// driving tests: which modifiers are currently down.
    #[must_use]
    pub fn mod_down(&self) -> ModMask {
        self.modifiers.mod_down
    }

    /// Modifiers completed as a tap since the last non-modifier event.
    #[must_use]
    pub fn mod_tapped(&self) -> ModMask {
        self.modifiers.mod_tapped
    }

    /// The deadkey currently armed, or `Vcode::NOP` if none.
    #[must_use]
    pub fn active_deadkey(&self) -> Vcode {
        self.modifiers.active_deadkey
    }

    /// Whether the engine is passing events through untouched (`ESC+O`).
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.global.on
    }

    #[must_use]
    pub fn active_config(&self) -> u8 {
        self.global.active_config
    }

    /// Whether `vcode` is currently held down from this engine's own
    /// injection, i.e. whether `reset()` would emit a release for it.
    #[must_use]
    pub fn is_key_down_sent(&self, vcode: Vcode) -> bool {
        vcode.as_index().is_some_and(|idx| self.global.keys_down_sent[idx])
    }

    /// Drives the capture & dispatch loop: blocks for a device, then
    /// processes exactly one raw event per iteration, strictly serial,
    /// until a fatal driver error or an `ESC+X`/`ESC+Q` exit request.
    /// Raises the process' scheduling priority once up front so injected
    /// events don't starve downstream consumers.
    pub fn run(&mut self) -> Result<(), EngineError> {
        self.os.raise_process_priority();
        loop {
            let device = self.capture.wait().map_err(|e| {
                self.global.error_log.record(&e);
                e
            })?;
            loop {
                let raw = self.capture.receive(&device).map_err(|e| {
                    self.global.error_log.record(&e);
                    e
                })?;
                let Some(raw) = raw else { break };
                if self.process_raw_event(device.clone(), raw)? == LoopOutcome::Exit {
                    return Ok(());
                }
            }
        }
    }

    /// Replaces the active rewire/combo/alpha tables wholesale: a full
    /// reset-then-rebuild rather than patching the previous tables in place.
    pub fn load_config(&mut self, cfg: Config) -> Vec<ConfigWarning> {
        let (rewire_table, combo_table, alpha_map, warnings) = config::build(&cfg);
        self.rewire_table = rewire_table;
        self.combo_table = combo_table;
        self.alpha_map = alpha_map;
        self.options = cfg.options;
        self.globals = cfg.globals;
        for w in &warnings {
            self.global.error_log.record(&EngineError::ConfigConflict(w.to_string()));
        }
        warnings
    }

    /// Releases everything outstanding, clears transient state,
    /// preserves the active config identity and recorded macros, and
    /// resyncs the three lock-key LEDs to baseline.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        for sc in 0u16..256 {
            if self.global.keys_down_sent[sc as usize] {
                self.inject_raw(Vcode(sc), false)?;
            }
        }
        self.modifiers = ModifierState::default();
        self.loop_state = LoopState::default();
        self.history = EventHistory::new();

        self.os.set_led(LedIndicator::NumLock, true);
        self.os.set_led(LedIndicator::CapsLock, false);
        self.os.set_led(LedIndicator::ScrollLock, false);
        Ok(())
    }

    /// One full turn of the main loop: read one raw event from `device`
    /// and run it through the pipeline. Returns `Err` only for a fatal
    /// `Driver` error, in which case the caller should stop iterating;
    /// returns `Ok(LoopOutcome::Exit)` when an `ESC+X`/`ESC+Q` command
    /// requested a clean shutdown.
    #[tracing::instrument(skip(self, raw), fields(code = raw.code, down = !raw.is_release()))]
    pub fn process_raw_event(
        &mut self,
        device: DeviceId,
        raw: RawEvent,
    ) -> Result<LoopOutcome, EngineError> {
        let prev1_before = self.history.prev1;
        let tap = self.history.push(raw);
        self.prev1_was_e1_lctrl = prev1_before.is_some_and(RawEvent::is_escape);

        self.loop_state.reset();
        self.loop_state.raw_scancode = raw.code;
        self.loop_state.is_down = !raw.is_release();
        self.loop_state.tapped = tap.tapped;
        self.loop_state.tapped_slow = tap.slow_tap;
        self.loop_state.tap_hold_make = tap.tap_hold_make;

        if raw.code == 0 || raw.code > 0x7F {
            self.global.error_log.record(&EngineError::ProtocolAnomaly(format!(
                "scancode {:#04x} out of range",
                raw.code
            )));
            return Ok(LoopOutcome::Continue);
        }

        if self.device_changed(&device) {
            self.refresh_device_identity(&device)?;
        }

        if self.process_on_off_key(raw, prev1_before) {
            return Ok(LoopOutcome::Continue);
        }

        if !self.global.on {
            self.forward_verbatim(&device, raw)?;
            return Ok(LoopOutcome::Continue);
        }

        if self.options.process_only_first_keyboard
            && self.global.device_id.as_deref() != Some(device.0.as_str())
        {
            self.forward_verbatim(&device, raw)?;
            return Ok(LoopOutcome::Continue);
        }

        let mut raw = raw;
        if self.options.flip_alt_win_on_apple_keyboards && self.global.is_apple {
            raw = flip_apple_key(raw);
        }

        if raw.code == SC_ESCAPE {
            self.global.real_escape_down = self.loop_state.is_down;
            if self.loop_state.is_down && self.global.recording_macro.is_some() {
                self.stop_macro_recording();
            }
            return Ok(LoopOutcome::Continue);
        }

        if self.global.real_escape_down && self.loop_state.is_down {
            if let Some(command) = command_for_scancode(raw.code) {
                return match self.run_command(command) {
                    CommandOutcome::Exit => {
                        self.reset()?;
                        Ok(LoopOutcome::Exit)
                    }
                    CommandOutcome::Continue => Ok(LoopOutcome::Continue),
                };
            }
            return Ok(LoopOutcome::Continue);
        }

        if self.global.active_config == 0 {
            self.forward_verbatim(&device, raw)?;
            return Ok(LoopOutcome::Continue);
        }

        let plain_vcode = Vcode::from_scancode(raw.code, raw.is_extended());
        let messy = messy_keys::canonicalize(
            raw,
            plain_vcode,
            MessyKeyContext {
                translate_messy_keys: self.globals.translate_messy_keys,
                protect_console: self.globals.protect_console,
                is_engine_window_foreground: self.os.is_engine_window_foreground(),
                lctrl_down: self.modifiers.mod_down.intersects(bit_of(crate::vcode::VC_LCTRL)),
                prev1_was_e1_lctrl: self.prev1_was_e1_lctrl,
            },
        );
        let canonical_vcode = match messy {
            MessyOutcome::Drop => return Ok(LoopOutcome::Continue),
            MessyOutcome::Continue(v) => v,
        };

        let rewired = crate::rewire::rewire(
            &self.rewire_table,
            raw.code,
            canonical_vcode,
            self.loop_state.is_down,
            tap,
            &mut self.modifiers.tap_and_hold_scancode,
            &mut self.modifiers.mod_down,
            &mut self.modifiers.mod_tapped,
        );
        if rewired.tap_hold_collision {
            self.global
                .error_log
                .record(&EngineError::StateViolation("tap-hold already active".into()));
        }
        self.loop_state.result_sequence.extend(rewired.extra_events);

        let mut vcode = rewired.vcode;
        self.loop_state.is_modifier = rewired.is_modifier;

        let b = bit_of(vcode);
        if self.loop_state.is_down {
            self.modifiers.mod_down |= b;
        } else {
            self.modifiers.mod_down &= !b;
        }
        if tap.tapped {
            self.modifiers.mod_tapped |= b;
        }
        if tap.slow_tap {
            self.modifiers.mod_tapped = ModMask::EMPTY;
        }

        if self.loop_state.is_down {
            if let Some(combo) = self.combo_table.find_match(
                vcode,
                self.modifiers.active_deadkey,
                self.modifiers.mod_down,
                self.modifiers.mod_tapped,
            ) {
                self.loop_state.result_sequence = combo.output.clone();
                self.modifiers.mod_tapped = ModMask::EMPTY;
            }
            if !self.loop_state.is_modifier {
                self.modifiers.active_deadkey = Vcode::NOP;
            }
        }

        if self.loop_state.result_sequence.is_empty() {
            vcode = self.alpha_map.apply(vcode, self.modifiers.mod_down);
        }

        if !self.loop_state.is_modifier {
            self.modifiers.mod_tapped = ModMask::EMPTY;
        }

        self.loop_state.vcode = vcode;
        let is_down = self.loop_state.is_down;

        if self.loop_state.result_sequence.is_empty() {
            self.send_vkey_event(vcode, is_down)?;
        } else {
            let sequence = std::mem::take(&mut self.loop_state.result_sequence);
            sequencer::play(&sequence, self)?;
        }
        Ok(LoopOutcome::Continue)
    }

    fn device_changed(&self, device: &DeviceId) -> bool {
        self.global.device_id.as_deref() != Some(device.0.as_str())
    }

    fn refresh_device_identity(&mut self, device: &DeviceId) -> Result<(), EngineError> {
        let hw_id = self.capture.hardware_id(device).map_err(|e| {
            self.global.error_log.record(&e);
            e
        })?;
        self.global.device_id = Some(device.0.clone());
        self.global.is_apple = hw_id.contains("VID_05AC") || hw_id.contains("VID&000205ac");
        self.os.set_led(LedIndicator::NumLock, true);
        self.os.set_led(LedIndicator::CapsLock, false);
        self.os.set_led(LedIndicator::ScrollLock, false);
        Ok(())
    }

    /// Checks the configured master on/off key first in the pipeline.
    /// Returns `true` when the event was fully absorbed (either it is the
    /// dropped E1 LCtrl half, or it toggled `on`/`off`).
    fn process_on_off_key(&mut self, raw: RawEvent, prev1: Option<RawEvent>) -> bool {
        let Some(on_off_key) = self.globals.engine_on_off_key else {
            return false;
        };

        let mut pause_triggered = false;
        if on_off_key == VC_PAUSE {
            if raw.code == crate::vcode::SC_LCTRL && raw.is_escape() {
                return true;
            }
            if raw.code == crate::vcode::SC_NUMLOCK {
                if let Some(p1) = prev1 {
                    if p1.code == crate::vcode::SC_LCTRL && p1.is_escape() {
                        pause_triggered = true;
                    }
                }
            }
        }

        let scancode_matches = on_off_key.as_scancode() == Some(raw.code);
        if !scancode_matches && !pause_triggered {
            return false;
        }

        if self.loop_state.is_down {
            self.global.on = !self.global.on;
            self.os.update_tray_icon(self.global.on, self.global.recording_macro.is_some(), self.global.active_config);
            if self.global.on {
                let _ = self.reset();
            }
            if let Some(led) = crate::messy_keys::led_for_vcode(on_off_key) {
                self.os.set_led(led, self.global.on);
            }
        }
        true
    }

    fn forward_verbatim(&mut self, device: &DeviceId, raw: RawEvent) -> Result<(), EngineError> {
        self.capture.send(device, raw).map_err(|e| {
            self.global.error_log.record(&e);
            e
        })
    }

    fn stop_macro_recording(&mut self) {
        let Some(slot) = self.global.recording_macro else { return };
        let body = std::mem::take(&mut self.global.recorded_macros[slot as usize]);
        self.global.recorded_macros[slot as usize] = crate::macros::finalize(body);
        self.global.recording_macro = None;
        self.global.secret_recording = false;
        self.os.update_tray_icon(self.global.on, false, self.global.active_config);
    }

    fn run_command(&mut self, command: Command) -> CommandOutcome {
        match command {
            Command::Exit | Command::DebugBuildExit => return CommandOutcome::Exit,
            Command::SwitchConfig(n) => self.switch_config(n),
            Command::Reset => {
                let _ = self.reset();
            }
            Command::ReloadConfig => {
                let n = self.global.active_config;
                self.switch_config(n);
            }
            Command::ToggleDebug => self.options.debug = !self.options.debug,
            Command::ToggleTray => {
                if self.os.is_in_tray() {
                    self.os.show_in_taskbar();
                } else {
                    self.os.show_in_traybar();
                }
            }
            Command::ToggleAppleAltWin => {
                self.options.flip_alt_win_on_apple_keyboards = !self.options.flip_alt_win_on_apple_keyboards;
            }
            Command::ToggleYZ => self.alpha_map.flip_y_z = !self.alpha_map.flip_y_z,
            Command::DelayDec => {
                self.options.delay_for_key_sequence_ms = self.options.delay_for_key_sequence_ms.saturating_sub(1).max(1);
            }
            Command::DelayInc => {
                self.options.delay_for_key_sequence_ms = (self.options.delay_for_key_sequence_ms + 1).min(100);
            }
            Command::MacroRecordStart => {
                self.global.recording_macro = Some(0);
                self.global.recorded_macros[0].clear();
            }
            Command::MacroRecordStop => self.stop_macro_recording(),
            Command::MacroPlay => {
                if let Err(e) = self.play_macro(0) {
                    self.global.error_log.record(&e);
                }
            }
            Command::MacroCopyClipboard => {
                let body = format!("{:?}", self.global.recorded_macros[0]);
                self.os.copy_to_clipboard(&body);
            }
            Command::StartHelper => {
                if let Err(msg) = self.os.start_program("autohotkey.exe") {
                    self.global.error_log.record(&EngineError::CommandFailure(msg));
                }
            }
            Command::StopHelper => self.os.stop_program("autohotkey.exe"),
            Command::DumpConfig | Command::Status | Command::ErrorLog | Command::Help
            | Command::KeyLabelTable | Command::BetaSlot => {
                // Read-only informational surfaces; rendering is a host concern.
            }
        }
        CommandOutcome::Continue
    }

    fn switch_config(&mut self, n: u8) {
        self.global.previous_config = self.global.active_config;
        if let Some(cfg) = self.config_source.load(n) {
            self.global.active_config = n;
            self.load_config(cfg);
        } else {
            self.global
                .error_log
                .record(&EngineError::CommandFailure(format!("no config #{n}")));
        }
    }

    fn play_macro(&mut self, slot: u8) -> Result<(), EngineError> {
        if slot == 0 || usize::from(slot) >= MAX_NUM_MACROS {
            return Err(EngineError::CommandFailure(format!("macro slot {slot} out of range")));
        }
        if self.macro_playback_depth >= MAX_MACRO_PLAYBACK_DEPTH {
            return Err(EngineError::StateViolation(format!(
                "macro #{slot} playback exceeded max nesting depth {MAX_MACRO_PLAYBACK_DEPTH}"
            )));
        }
        let body = self.global.recorded_macros[slot as usize].clone();
        if body.is_empty() {
            return Err(EngineError::CommandFailure(format!("macro #{slot} has not been recorded")));
        }
        self.macro_playback_depth += 1;
        let result = sequencer::play(&body, self);
        self.macro_playback_depth -= 1;
        result?;
        self.global.secret_playback = false;
        Ok(())
    }

    /// The injection primitive. Also the write-through tap every
    /// emitted event passes through when a macro recording is active.
    fn send_vkey_event(&mut self, vcode: Vcode, is_down: bool) -> Result<(), EngineError> {
        if vcode == Vcode::NOP {
            return Ok(());
        }
        if sequencer::is_control_vcode(vcode) {
            if is_down {
                self.dispatch_control_vcode(vcode);
            }
            return Ok(());
        }
        self.inject_raw(vcode, is_down)
    }

    fn dispatch_control_vcode(&mut self, vcode: Vcode) {
        if vcode == VC_PAUSE {
            for raw in sequencer::pause_sequence() {
                let _ = self.forward_raw_synthetic(raw);
            }
        }
        // All other control vcodes are only ever reached embedded in a
        // sequence, where `sequencer::play` consumes them directly; a bare
        // control vcode reaching here outside Pause is a protocol anomaly.
    }

    fn forward_raw_synthetic(&mut self, raw: RawEvent) -> Result<(), EngineError> {
        let Some(device) = self.global.device_id.clone() else {
            return Ok(());
        };
        self.capture.send(&DeviceId(device), raw)
    }

    fn inject_raw(&mut self, vcode: Vcode, is_down: bool) -> Result<(), EngineError> {
        let Some(idx) = vcode.as_index() else {
            return Ok(());
        };
        if !is_down && !self.global.keys_down_sent[idx] {
            return Ok(());
        }
        self.global.keys_down_sent[idx] = is_down;

        if let Some(slot) = self.global.recording_macro {
            let recorded = KeyEvent { vcode, is_down };
            crate::macros::record_event(
                &mut self.global.recorded_macros[slot as usize],
                recorded,
                self.global.secret_recording,
            );
            if self.global.recorded_macros[slot as usize].len() >= crate::vcode::MAX_MACRO_LENGTH - 2 {
                self.global.error_log.record(&EngineError::StateViolation(format!(
                    "macro #{slot} exceeded max length, recording stopped"
                )));
                self.global.recording_macro = None;
            }
        }

        let raw = crate::event::key_event_to_raw(KeyEvent { vcode, is_down });
        let Some(device) = self.global.device_id.clone() else {
            return Ok(());
        };
        self.capture.send(&DeviceId(device), raw).map_err(|e| {
            self.global.error_log.record(&e);
            e
        })?;

        if is_down {
            if let Some(led) = crate::messy_keys::led_for_vcode(vcode) {
                if Some(vcode) == self.globals.engine_on_off_key
                    || vcode.as_scancode() == Some(crate::vcode::SC_ESCAPE)
                {
                    self.os.set_led(led, self.global.on);
                }
            }
        }
        Ok(())
    }
}

/// Swaps LAlt<->LWin and RAlt<->RWin at the raw `{code, extended}` level,
/// the only place a scancode gets rewritten before the gate sees it. LAlt
/// and RAlt share scancode 0x38, distinguished only by the extended bit, so
/// the flip must key on the pair, not the bare code.
fn flip_apple_key(mut raw: RawEvent) -> RawEvent {
    const EXTENDED: u8 = 0b0010;
    match (raw.code, raw.is_extended()) {
        (SC_LALT, false) => {
            raw.code = SC_LWIN;
            raw.state |= EXTENDED;
        }
        (SC_LWIN, true) => {
            raw.code = SC_LALT;
            raw.state &= !EXTENDED;
        }
        (SC_LALT, true) => raw.code = SC_RWIN,
        (SC_RWIN, true) => raw.code = SC_LALT,
        _ => {}
    }
    raw
}

impl SequencerHost for Engine {
    fn emit(&mut self, vcode: Vcode, is_down: bool) -> Result<(), EngineError> {
        let vcode = if self.global.secret_playback { deobfuscate_vcode(vcode) } else { vcode };
        self.send_vkey_event(vcode, is_down)
    }

    fn sleep(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }

    fn normal_delay_ms(&self) -> u32 {
        self.options.delay_for_key_sequence_ms
    }

    fn ahk_hotkey_delay_ms(&self) -> u32 {
        self.options.delay_for_key_sequence_ms.saturating_mul(10).max(50)
    }

    fn set_deadkey(&mut self, vcode: Vcode) {
        self.modifiers.active_deadkey = vcode;
    }

    fn switch_config(&mut self, n: u8) {
        Engine::switch_config(self, n);
    }

    fn start_recording(&mut self, slot: u8, secret: bool) -> Result<(), EngineError> {
        if slot == 0 || usize::from(slot) >= MAX_NUM_MACROS {
            return Err(EngineError::ConfigConflict(format!("macro slot {slot} out of range")));
        }
        if self.global.recording_macro.is_some() {
            return Err(EngineError::CommandFailure("a macro is already being recorded".into()));
        }
        self.global.recording_macro = Some(slot);
        self.global.recorded_macros[slot as usize].clear();
        self.global.secret_recording = secret;
        if secret {
            self.global.recorded_macros[slot as usize]
                .push(KeyEvent::down(crate::vcode::VC_OBFUSCATED_SEQUENCE_START));
        }
        Ok(())
    }

    fn play_macro(&mut self, slot: u8) -> Result<(), EngineError> {
        Engine::play_macro(self, slot)
    }

    fn temp_release_keys(&mut self) -> Result<(), EngineError> {
        self.modifiers.mods_temp_altered.clear();
        for sc in 0u16..256 {
            if self.global.keys_down_sent[sc as usize] {
                self.global.keys_down_temp_released[sc as usize] = true;
                self.inject_raw(Vcode(sc), false)?;
            }
        }
        Ok(())
    }

    fn temp_restore_keys(&mut self) -> Result<(), EngineError> {
        for sc in 0u16..256 {
            if self.global.keys_down_temp_released[sc as usize] {
                self.global.keys_down_temp_released[sc as usize] = false;
                self.inject_raw(Vcode(sc), true)?;
            }
        }
        Ok(())
    }

    fn begin_obfuscated_playback(&mut self) {
        self.global.secret_playback = true;
    }

    fn record_error(&mut self, err: EngineError) {
        self.global.error_log.record(&err);
    }

    fn is_ahk_hotkey(&self, vcode: Vcode) -> bool {
        vcode == VC_AHK_HOTKEY1 || vcode == VC_AHK_HOTKEY2
    }
}
