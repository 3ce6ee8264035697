//! Backend abstractions for the playback engine core.

use std::time::Instant;

use crate::audio::BufferSizeOption;
use crate::config::{AudioConfig, ToneConfig};
use crate::error::AudioError;

/// Context provided to audio backends when the engine is created.
#[derive(Debug, Clone, Default)]
pub struct EngineStartContext {
    pub audio: AudioConfig,
    pub tone: ToneConfig,
}

/// Trait implemented by platform-specific audio backends.
///
/// Setters called before `start` are remembered and applied when the
/// stream is opened.
pub trait AudioBackend: Send + Sync {
    fn start(&self, ctx: EngineStartContext) -> Result<(), AudioError>;
    fn stop(&self) -> Result<(), AudioError>;
    fn set_tone_on(&self, on: bool) -> Result<(), AudioError>;
    fn set_device_id(&self, device_id: i32) -> Result<(), AudioError>;
    fn set_buffer_size(&self, buffer_size: BufferSizeOption) -> Result<(), AudioError>;
    /// Latest output latency in milliseconds; negative when unknown.
    fn current_output_latency_millis(&self) -> f64;
}

/// Trait representing a monotonic time source used for telemetry timestamps.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Instant;
}

/// Default time source backed by `Instant::now`.
#[derive(Default)]
pub struct SystemTimeSource {
    _unit: (),
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

mod native;
pub use native::NativeBackend;

mod desktop_stub;
pub use desktop_stub::{DesktopStubBackend, StubTimeSource};
