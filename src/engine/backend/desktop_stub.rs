use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::audio::latency::{buffered_latency_millis, UNKNOWN_LATENCY_MILLIS};
use crate::audio::{BufferSizeOption, AUTO_SELECT_DEVICE_ID};
use crate::config::AudioConfig;
use crate::error::AudioError;

use super::{AudioBackend, EngineStartContext, TimeSource};

/// Bursts assumed for the automatic buffer size
const AUTOMATIC_BURSTS: u32 = 2;

#[derive(Debug)]
struct StubState {
    running: bool,
    tone_on: bool,
    device_id: i32,
    buffer_size: BufferSizeOption,
    audio: AudioConfig,
    start_error: Option<AudioError>,
    stop_error: Option<AudioError>,
}

/// Desktop stub backend used for deterministic testing and CLI tooling.
///
/// Simulates the engine lifecycle without real audio I/O. Latency is the
/// buffered duration of the selected buffer size, so it moves when the
/// buffer size changes just like a real stream.
pub struct DesktopStubBackend {
    state: Mutex<StubState>,
}

impl DesktopStubBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StubState {
                running: false,
                tone_on: false,
                device_id: AUTO_SELECT_DEVICE_ID,
                buffer_size: BufferSizeOption::Automatic,
                audio: AudioConfig::default(),
                start_error: None,
                stop_error: None,
            }),
        }
    }

    /// A backend whose `start` always fails with `err`.
    pub fn failing(err: AudioError) -> Self {
        let backend = Self::new();
        backend.lock().start_error = Some(err);
        backend
    }

    /// Make the next `stop` fail with `err`, leaving the stub running.
    pub fn fail_next_stop(&self, err: AudioError) {
        self.lock().stop_error = Some(err);
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn is_tone_on(&self) -> bool {
        self.lock().tone_on
    }

    pub fn device_id(&self) -> i32 {
        self.lock().device_id
    }

    pub fn buffer_size(&self) -> BufferSizeOption {
        self.lock().buffer_size
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for DesktopStubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for DesktopStubBackend {
    fn start(&self, ctx: EngineStartContext) -> Result<(), AudioError> {
        let mut state = self.lock();
        if let Some(err) = state.start_error.clone() {
            return Err(err);
        }
        if state.running {
            return Err(AudioError::AlreadyCreated);
        }
        state.audio = ctx.audio;
        state.running = true;
        Ok(())
    }

    fn stop(&self) -> Result<(), AudioError> {
        let mut state = self.lock();
        if let Some(err) = state.stop_error.take() {
            return Err(err);
        }
        if !state.running {
            return Err(AudioError::EngineNotCreated);
        }
        state.running = false;
        state.tone_on = false;
        Ok(())
    }

    fn set_tone_on(&self, on: bool) -> Result<(), AudioError> {
        let mut state = self.lock();
        if !state.running {
            return Err(AudioError::EngineNotCreated);
        }
        state.tone_on = on;
        Ok(())
    }

    fn set_device_id(&self, device_id: i32) -> Result<(), AudioError> {
        if device_id < 0 {
            return Err(AudioError::DeviceNotFound { id: device_id });
        }
        self.lock().device_id = device_id;
        Ok(())
    }

    fn set_buffer_size(&self, buffer_size: BufferSizeOption) -> Result<(), AudioError> {
        self.lock().buffer_size = buffer_size;
        Ok(())
    }

    fn current_output_latency_millis(&self) -> f64 {
        let state = self.lock();
        if !state.running {
            return UNKNOWN_LATENCY_MILLIS;
        }
        let burst = state.audio.frames_per_burst;
        let frames = state
            .buffer_size
            .frames(burst)
            .unwrap_or(AUTOMATIC_BURSTS * burst);
        buffered_latency_millis(frames, state.audio.sample_rate)
    }
}

/// Deterministic time source for desktop runs.
///
/// Each call to `now()` advances by a fixed 10ms to guarantee monotonic
/// timestamps even when no real audio stream is active.
pub struct StubTimeSource {
    start: Instant,
    offset_ms: AtomicU64,
}

impl StubTimeSource {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }
}

impl Default for StubTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for StubTimeSource {
    fn now(&self) -> Instant {
        let ms = self.offset_ms.fetch_add(10, Ordering::SeqCst);
        self.start + Duration::from_millis(ms)
    }
}
