// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants shared with the Java side of the JNI bridge
///
/// Error code range: 1001-1009
pub struct AudioErrorCodes;

impl AudioErrorCodes {
    /// Engine has not been created (or was already deleted)
    pub const ENGINE_NOT_CREATED: i32 = 1001;

    /// Engine was created twice without an intermediate delete
    pub const ALREADY_CREATED: i32 = 1002;

    /// Hardware error occurred
    pub const HARDWARE_ERROR: i32 = 1003;

    /// Failed to open audio stream
    pub const STREAM_OPEN_FAILED: i32 = 1004;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1005;

    /// Requested output device id is not offered by the host
    pub const DEVICE_NOT_FOUND: i32 = 1006;

    /// Requested buffer size is not one of the recognised burst counts
    pub const INVALID_BUFFER_SIZE: i32 = 1007;

    /// Audio stream disconnected or failed while running
    pub const STREAM_FAILURE: i32 = 1008;

    /// JNI initialization failed on Android
    pub const JNI_INIT_FAILED: i32 = 1009;
}

/// Log an audio error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=PlaybackEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover engine creation, stream management, device routing
/// and buffer sizing.
///
/// Error code ranges: 1001-1009
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Engine has not been created
    EngineNotCreated,

    /// Engine already created
    AlreadyCreated,

    /// Hardware error occurred
    HardwareError { details: String },

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Output device id is not in the offered device list
    DeviceNotFound { id: i32 },

    /// Buffer size in bursts is not automatic (0) or 1/2/4/8
    InvalidBufferSize { bursts: i32 },

    /// Stream failed while running
    StreamFailure { reason: String },

    /// JNI initialization failed on Android
    JniInitFailed { reason: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::EngineNotCreated => AudioErrorCodes::ENGINE_NOT_CREATED,
            AudioError::AlreadyCreated => AudioErrorCodes::ALREADY_CREATED,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
            AudioError::DeviceNotFound { .. } => AudioErrorCodes::DEVICE_NOT_FOUND,
            AudioError::InvalidBufferSize { .. } => AudioErrorCodes::INVALID_BUFFER_SIZE,
            AudioError::StreamFailure { .. } => AudioErrorCodes::STREAM_FAILURE,
            AudioError::JniInitFailed { .. } => AudioErrorCodes::JNI_INIT_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::EngineNotCreated => {
                "Playback engine not created. Call create() first.".to_string()
            }
            AudioError::AlreadyCreated => {
                "Playback engine already created. Call delete() first.".to_string()
            }
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            AudioError::DeviceNotFound { id } => {
                format!("No output device with id {}", id)
            }
            AudioError::InvalidBufferSize { bursts } => {
                format!(
                    "Buffer size must be 0 (automatic) or 1, 2, 4, 8 bursts (got {})",
                    bursts
                )
            }
            AudioError::StreamFailure { reason } => {
                format!("Audio stream failed: {}", reason)
            }
            AudioError::JniInitFailed { reason } => {
                format!("JNI initialization failed: {}", reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::HardwareError {
            details: err.to_string(),
        }
    }
}
