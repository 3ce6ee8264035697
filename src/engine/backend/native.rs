//! Hardware backend: Oboe on Android, cpal on desktop.
//!
//! The platform split lives in `audio::engine`; this backend only adapts
//! the `AudioBackend` trait to the `PlaybackEngineManager` interface.

use crate::audio::BufferSizeOption;
use crate::error::AudioError;
use crate::managers::PlaybackEngineManager;

use super::{AudioBackend, EngineStartContext};

/// Audio backend that delegates to PlaybackEngineManager
#[derive(Default)]
pub struct NativeBackend {
    manager: PlaybackEngineManager,
}

impl NativeBackend {
    pub fn new() -> Self {
        Self {
            manager: PlaybackEngineManager::new(),
        }
    }
}

impl AudioBackend for NativeBackend {
    fn start(&self, ctx: EngineStartContext) -> Result<(), AudioError> {
        self.manager.start(ctx.audio, ctx.tone)
    }

    fn stop(&self) -> Result<(), AudioError> {
        self.manager.stop()
    }

    fn set_tone_on(&self, on: bool) -> Result<(), AudioError> {
        self.manager.set_tone_on(on)
    }

    fn set_device_id(&self, device_id: i32) -> Result<(), AudioError> {
        self.manager.set_device_id(device_id)
    }

    fn set_buffer_size(&self, buffer_size: BufferSizeOption) -> Result<(), AudioError> {
        self.manager.set_buffer_size(buffer_size)
    }

    fn current_output_latency_millis(&self) -> f64 {
        self.manager.current_output_latency_millis()
    }
}
