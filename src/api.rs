// Public playback API
// Static façade over a single global EngineHandle, shared by the controller,
// the CLI and the Android JNI exports.

use once_cell::sync::Lazy;

use crate::audio::DeviceListEntry;
use crate::engine::EngineHandle;
use crate::error::log_audio_error;

// Re-export error code constants for JNI callers
pub use crate::error::AudioErrorCodes;

/// Global EngineHandle instance
///
/// Created on first use. The handle itself only opens an output stream when
/// `create()` is called.
static ENGINE: Lazy<EngineHandle> = Lazy::new(EngineHandle::new);

/// Access the global engine handle (tooling and telemetry subscribers).
pub fn engine() -> &'static EngineHandle {
    &ENGINE
}

/// Get the version of the playback engine
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Create the playback engine
///
/// Opens the output stream on the selected device with the selected buffer
/// size. The tone starts switched off.
///
/// # Returns
/// * `true` - Engine created and streaming
/// * `false` - Initialisation failed (the reason is logged)
pub fn create() -> bool {
    match ENGINE.create() {
        Ok(()) => true,
        Err(err) => {
            log_audio_error(&err, "create");
            false
        }
    }
}

/// Delete the playback engine
///
/// Stops the stream and releases all engine resources. Safe to call even if
/// the engine was never created.
pub fn delete() {
    if let Err(err) = ENGINE.delete() {
        log_audio_error(&err, "delete");
    }
}

/// Switch the tone on (`true`) or off (`false`)
pub fn set_tone_on(is_tone_on: bool) {
    if let Err(err) = ENGINE.set_tone_on(is_tone_on) {
        log_audio_error(&err, "set_tone_on");
    }
}

/// Select the playback device
///
/// # Arguments
/// * `device_id` - Id from the offered device list; `0` selects the platform
///   default ("Auto select")
pub fn set_audio_device_id(device_id: i32) {
    if let Err(err) = ENGINE.set_audio_device_id(device_id) {
        log_audio_error(&err, "set_audio_device_id");
    }
}

/// Select the buffer size
///
/// # Arguments
/// * `buffer_size_in_bursts` - `0` for automatic, otherwise 1, 2, 4 or 8
pub fn set_buffer_size_in_bursts(buffer_size_in_bursts: i32) {
    if let Err(err) = ENGINE.set_buffer_size_in_bursts(buffer_size_in_bursts) {
        log_audio_error(&err, "set_buffer_size_in_bursts");
    }
}

/// Current output latency in milliseconds
///
/// Negative when the latency cannot be determined (engine not created, or
/// the platform has not reported a timestamp yet).
pub fn get_current_output_latency_millis() -> f64 {
    ENGINE.current_output_latency_millis()
}

/// Output devices offered for selection, "Auto select" first.
///
/// Falls back to the "Auto select" entry alone if the host cannot be
/// enumerated. Android callers supply the list from the platform instead.
#[cfg(not(target_os = "android"))]
pub fn output_devices() -> Vec<DeviceListEntry> {
    crate::audio::devices::list_output_devices().unwrap_or_else(|err| {
        log_audio_error(&err, "output_devices");
        vec![DeviceListEntry::auto_select()]
    })
}

#[cfg(target_os = "android")]
pub fn output_devices() -> Vec<DeviceListEntry> {
    vec![DeviceListEntry::auto_select()]
}
