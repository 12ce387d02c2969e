//! Config data model and the build step that turns a parsed [`Config`] into
//! the dense runtime tables (`RewireTable`, `ComboTable`, `AlphaMap`).
//!
//! Parsing the on-disk ini format is an external collaborator's job (see
//! [`crate::collaborators::ConfigSource`]); this module only defines the
//! shape a parser must produce and the conflict-detection rules applied
//! when that shape is loaded into the engine.

use crate::alpha::AlphaMap;
use crate::combo::{Combo, ComboTable};
use crate::modmask::ModMask;
use crate::rewire::{RewireEntry, RewireTable};
use crate::vcode::{Scancode, Vcode};
use serde::{Deserialize, Serialize};

/// One declared rewire, pre-build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewireDef {
    pub scancode: Scancode,
    pub out: Option<Vcode>,
    pub if_tapped: Option<Vcode>,
    pub if_tap_held: Option<Vcode>,
}

/// One declared combo, pre-build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboDef {
    pub trigger_vcode: Vcode,
    #[serde(default)]
    pub deadkey: Vcode,
    #[serde(default)]
    pub mod_and: ModMask,
    #[serde(default)]
    pub mod_or: ModMask,
    #[serde(default)]
    pub mod_not: ModMask,
    #[serde(default)]
    pub mod_tap: ModMask,
    pub output: Vec<crate::event::KeyEvent>,
}

/// One declared alpha-map override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlphaDef {
    pub from: Vcode,
    pub to: Vcode,
}

/// Per-config behavioral toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub debug: bool,
    pub flip_zy: bool,
    pub flip_alt_win_on_apple_keyboards: bool,
    pub lcontrol_lwin_blocks_alpha_mapping: bool,
    pub process_only_first_keyboard: bool,
    /// 1-100ms, per-event delay during sequence playback.
    pub delay_for_key_sequence_ms: u32,
    pub config_name: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            debug: false,
            flip_zy: false,
            flip_alt_win_on_apple_keyboards: false,
            lcontrol_lwin_blocks_alpha_mapping: false,
            process_only_first_keyboard: false,
            delay_for_key_sequence_ms: 5,
            config_name: String::new(),
        }
    }
}

/// Process-wide settings read once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Globals {
    pub ini_version: u32,
    pub active_config_on_startup: u8,
    pub start_minimized: bool,
    pub start_in_traybar: bool,
    pub start_ahk: bool,
    pub engine_on_off_key: Option<Vcode>,
    pub protect_console: bool,
    pub translate_messy_keys: bool,
}

impl Default for Globals {
    fn default() -> Self {
        Globals {
            ini_version: 1,
            active_config_on_startup: 1,
            start_minimized: false,
            start_in_traybar: false,
            start_ahk: false,
            engine_on_off_key: None,
            protect_console: true,
            translate_messy_keys: true,
        }
    }
}

/// A fully parsed configuration, as produced by a [`crate::collaborators::ConfigSource`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rewires: Vec<RewireDef>,
    pub combos: Vec<ComboDef>,
    pub alpha_map: Vec<AlphaDef>,
    pub options: Options,
    pub globals: Globals,
}

/// Non-fatal problems found while building runtime tables from a [`Config`].
/// Logged, never propagated — the conflicting definition is simply dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    DuplicateRewire { scancode: Scancode },
    DuplicateCombo { trigger_vcode: Vcode },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::DuplicateRewire { scancode } => {
                write!(f, "duplicate rewire for scancode {scancode:#04x}, keeping first")
            }
            ConfigWarning::DuplicateCombo { trigger_vcode } => {
                write!(f, "duplicate combo on {trigger_vcode} with a different output, keeping first")
            }
        }
    }
}

fn same_predicate(a: &ComboDef, b: &ComboDef) -> bool {
    a.trigger_vcode == b.trigger_vcode
        && a.deadkey == b.deadkey
        && a.mod_and == b.mod_and
        && a.mod_or == b.mod_or
        && a.mod_not == b.mod_not
        && a.mod_tap == b.mod_tap
}

/// Builds the dense runtime tables from a parsed config, discarding later
/// conflicting definitions and reporting each as a [`ConfigWarning`].
///
/// A full reset-then-rebuild: maps are built from scratch every call,
/// never merged into the previous tables.
#[must_use]
pub fn build(config: &Config) -> (RewireTable, ComboTable, AlphaMap, Vec<ConfigWarning>) {
    let mut warnings = Vec::new();

    let mut rewire_table = RewireTable::new();
    let mut seen_scancodes = std::collections::HashSet::new();
    for def in &config.rewires {
        if !seen_scancodes.insert(def.scancode) {
            warnings.push(ConfigWarning::DuplicateRewire { scancode: def.scancode });
            continue;
        }
        rewire_table.set(
            def.scancode,
            RewireEntry { out: def.out, if_tapped: def.if_tapped, if_tap_held: def.if_tap_held },
        );
    }

    let mut combo_table = ComboTable::new();
    let mut accepted: Vec<&ComboDef> = Vec::new();
    for def in &config.combos {
        if let Some(prior) = accepted.iter().find(|p| same_predicate(p, def)) {
            if prior.output != def.output {
                warnings.push(ConfigWarning::DuplicateCombo { trigger_vcode: def.trigger_vcode });
            }
            continue;
        }
        accepted.push(def);
        combo_table.push(Combo {
            trigger_vcode: def.trigger_vcode,
            deadkey: def.deadkey,
            mod_and: def.mod_and,
            mod_or: def.mod_or,
            mod_not: def.mod_not,
            mod_tap: def.mod_tap,
            output: def.output.clone(),
        });
    }

    let mut alpha_map = AlphaMap::new();
    alpha_map.lctrl_or_lwin_blocks = config.options.lcontrol_lwin_blocks_alpha_mapping;
    alpha_map.flip_y_z = config.options.flip_zy;
    for def in &config.alpha_map {
        alpha_map.set(def.from, def.to);
    }

    (rewire_table, combo_table, alpha_map, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcode::{SC_A, SC_CAPS, VC_LCTRL};

    #[test]
    fn duplicate_rewire_keeps_first() {
        let config = Config {
            rewires: vec![
                RewireDef { scancode: SC_CAPS, out: Some(VC_LCTRL), if_tapped: None, if_tap_held: None },
                RewireDef { scancode: SC_CAPS, out: Some(Vcode::from(SC_A)), if_tapped: None, if_tap_held: None },
            ],
            ..Default::default()
        };
        let (table, _, _, warnings) = build(&config);
        assert_eq!(table.get(SC_CAPS).out, Some(VC_LCTRL));
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], ConfigWarning::DuplicateRewire { .. }));
    }

    #[test]
    fn identical_combo_redefinition_is_silent() {
        let combo = ComboDef {
            trigger_vcode: Vcode::from(SC_A),
            deadkey: Vcode::NOP,
            mod_and: ModMask::EMPTY,
            mod_or: ModMask::EMPTY,
            mod_not: ModMask::EMPTY,
            mod_tap: ModMask::EMPTY,
            output: vec![],
        };
        let config = Config { combos: vec![combo.clone(), combo], ..Default::default() };
        let (_, combos, _, warnings) = build(&config);
        assert_eq!(combos.iter().count(), 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn conflicting_combo_output_warns_and_keeps_first() {
        let mut second = ComboDef {
            trigger_vcode: Vcode::from(SC_A),
            deadkey: Vcode::NOP,
            mod_and: ModMask::EMPTY,
            mod_or: ModMask::EMPTY,
            mod_not: ModMask::EMPTY,
            mod_tap: ModMask::EMPTY,
            output: vec![crate::event::KeyEvent::down(VC_LCTRL)],
        };
        let first = ComboDef { output: vec![], ..second.clone() };
        second.output = vec![crate::event::KeyEvent::down(VC_LCTRL)];
        let config = Config { combos: vec![first, second], ..Default::default() };
        let (_, combos, _, warnings) = build(&config);
        assert_eq!(combos.iter().count(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], ConfigWarning::DuplicateCombo { .. }));
    }
}
