//! A low-level keyboard remapping engine: per-event capture, a tap/rewire
//! state machine, modifier-predicated combos, an alpha-layout swap, and an
//! output sequencer that can embed control opcodes (config switch, macro
//! record/play, deadkeys, timed sleeps) inside an otherwise ordinary key
//! sequence.
//!
//! [`Engine`] owns the pipeline; everything it needs from the outside world
//! — keystroke capture/injection, config storage, tray/LED/clipboard
//! services — is expressed as a trait in [`collaborators`] so this crate
//! never touches an OS API directly.

pub mod alpha;
pub mod collaborators;
pub mod combo;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod macros;
pub mod messy_keys;
pub mod modmask;
pub mod rewire;
pub mod sequencer;
pub mod state;
pub mod tap;
pub mod vcode;

pub use collaborators::{CaptureDriver, ConfigSource, DeviceId, LedIndicator, OsServices};
pub use commands::{Command, CommandOutcome};
pub use config::{Config, ConfigWarning, Globals, Options};
pub use engine::{Engine, LoopOutcome};
pub use error::{EngineError, ErrorLog};
pub use event::{KeyEvent, RawEvent};
pub use modmask::ModMask;
pub use vcode::{Scancode, Vcode};
