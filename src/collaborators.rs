//! External collaborators: the capture/inject driver, the config source,
//! and the grab-bag of tray/LED/console/AHK host services. Interfaces
//! only — the embedding binary supplies implementations; none of them call
//! back into the engine.

use crate::config::Config;
use crate::error::EngineError;
use crate::event::RawEvent;

/// Opaque handle to a physical keyboard device, as returned by the capture
/// collaborator's enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(pub String);

/// The three lock-key LEDs the engine resyncs on toggle/device-change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedIndicator {
    NumLock,
    CapsLock,
    ScrollLock,
}

/// The keystroke capture/inject primitive. Construction and `Drop` of the
/// implementing type stand in for the explicit
/// create-context/destroy-context/set-filter calls a lower-level hook API
/// would require.
pub trait CaptureDriver {
    /// Blocks until a device has an event ready, returning its id.
    fn wait(&mut self) -> Result<DeviceId, EngineError>;

    /// Reads the next buffered raw event for the device returned by
    /// `wait`, if any.
    fn receive(&mut self, device: &DeviceId) -> Result<Option<RawEvent>, EngineError>;

    /// Injects a raw event back into the OS stream on behalf of `device`.
    fn send(&mut self, device: &DeviceId, event: RawEvent) -> Result<(), EngineError>;

    /// The hardware id string used for `is_apple` detection (substring
    /// match on `"VID_05AC"` / `"VID&000205ac"`).
    fn hardware_id(&self, device: &DeviceId) -> Result<String, EngineError>;
}

/// Produces a parsed configuration by slot number. File syntax and on-disk
/// location are out of scope for this crate.
pub trait ConfigSource {
    fn load(&self, config_number: u8) -> Option<Config>;
}

/// Tray icon, LED indicators, console/foreground detection, clipboard, and
/// the AHK helper-process toggle, collapsed into a single trait object
/// since none of them call back into the engine.
pub trait OsServices {
    fn set_led(&mut self, indicator: LedIndicator, on: bool);
    fn is_engine_window_foreground(&self) -> bool;
    fn raise_process_priority(&mut self);
    fn update_tray_icon(&mut self, on: bool, recording: bool, config: u8);
    fn show_in_taskbar(&mut self);
    fn show_in_traybar(&mut self);
    fn is_in_tray(&self) -> bool;
    fn copy_to_clipboard(&mut self, text: &str);
    fn start_program(&mut self, name: &str) -> Result<(), String>;
    fn stop_program(&mut self, name: &str);
}
