// PlaybackEngineManager: Focused manager for playback engine lifecycle
//
// Single Responsibility: engine create/delete and stream settings

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::audio::callback::SharedPlaybackState;
use crate::audio::latency::UNKNOWN_LATENCY_MILLIS;
use crate::audio::{AudioEngine, BufferSizeOption, AUTO_SELECT_DEVICE_ID};
use crate::config::{AudioConfig, ToneConfig};
use crate::error::{log_audio_error, AudioError};

/// Settings chosen before the engine exists, applied when it is created
#[derive(Debug, Clone, Copy)]
struct PreferredSettings {
    device_id: i32,
    buffer_size: Option<BufferSizeOption>,
}

struct ManagerState {
    engine: Option<AudioEngine>,
    preferred: PreferredSettings,
}

/// Manages playback engine lifecycle and state
///
/// This manager handles:
/// - Engine lifecycle (create/delete)
/// - Routing and buffer size updates, remembered while no engine exists
/// - Lock management for thread-safe access
///
/// Latency reads bypass the lock: stream reopens hold it while the device
/// opens, and pollers must not wait on that.
///
/// # Example
/// ```ignore
/// let manager = PlaybackEngineManager::new();
/// manager.start(AudioConfig::default(), ToneConfig::default())?;
/// manager.set_tone_on(true)?;
/// manager.stop()?;
/// ```
pub struct PlaybackEngineManager {
    state: Arc<Mutex<ManagerState>>,
    /// Tone switch and latency cell handed to every engine this manager starts
    shared: Arc<SharedPlaybackState>,
    running: AtomicBool,
}

impl PlaybackEngineManager {
    /// Create a new PlaybackEngineManager with no engine running.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ManagerState {
                engine: None,
                preferred: PreferredSettings {
                    device_id: AUTO_SELECT_DEVICE_ID,
                    buffer_size: None,
                },
            })),
            shared: SharedPlaybackState::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Create the engine and open its output stream
    ///
    /// # Errors
    /// - Engine already created
    /// - Lock poisoning
    /// - Stream/device errors
    pub fn start(&self, audio: AudioConfig, tone: ToneConfig) -> Result<(), AudioError> {
        let mut guard = self.lock_state()?;
        self.check_not_running(&guard)?;

        let preferred = guard.preferred;
        let mut engine = self.create_engine(audio, tone)?;
        engine.set_device_id(preferred.device_id)?;
        if let Some(buffer_size) = preferred.buffer_size {
            engine.set_buffer_size(buffer_size)?;
        }

        let info = engine.start().map_err(|err| {
            log_audio_error(&err, "start_engine");
            err
        })?;
        log::info!(
            "[PlaybackEngineManager] Engine started ({} Hz, burst {} frames)",
            info.sample_rate,
            info.frames_per_burst
        );

        guard.engine = Some(engine);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Stop the engine and release its stream.
    ///
    /// Safe to call even if the engine is not running.
    pub fn stop(&self) -> Result<(), AudioError> {
        let mut guard = self.lock_state()?;

        if let Some(mut engine) = guard.engine.take() {
            self.running.store(false, Ordering::SeqCst);
            engine.set_tone_on(false);
            engine.stop().map_err(|err| {
                log_audio_error(&err, "stop_engine");
                err
            })?;
        }

        Ok(())
    }

    /// Switch the tone on or off (engine must be running)
    pub fn set_tone_on(&self, on: bool) -> Result<(), AudioError> {
        let guard = self.lock_state()?;
        let engine = guard.engine.as_ref().ok_or_else(|| {
            let err = AudioError::EngineNotCreated;
            log_audio_error(&err, "set_tone_on");
            err
        })?;
        engine.set_tone_on(on);
        Ok(())
    }

    /// Select the output device. Remembered if the engine is not running.
    pub fn set_device_id(&self, device_id: i32) -> Result<(), AudioError> {
        let mut guard = self.lock_state()?;
        if let Some(engine) = guard.engine.as_mut() {
            engine.set_device_id(device_id).map_err(|err| {
                log_audio_error(&err, "set_device_id");
                err
            })?;
        }
        guard.preferred.device_id = device_id;
        Ok(())
    }

    /// Select the buffer size. Remembered if the engine is not running.
    pub fn set_buffer_size(&self, buffer_size: BufferSizeOption) -> Result<(), AudioError> {
        let mut guard = self.lock_state()?;
        if let Some(engine) = guard.engine.as_mut() {
            engine.set_buffer_size(buffer_size).map_err(|err| {
                log_audio_error(&err, "set_buffer_size");
                err
            })?;
        }
        guard.preferred.buffer_size = Some(buffer_size);
        Ok(())
    }

    /// Latest output latency; negative when unknown or not running.
    ///
    /// Lock-free. The stream thread marks the cell unknown while a stream
    /// is reopened or lost.
    pub fn current_output_latency_millis(&self) -> f64 {
        if !self.running.load(Ordering::SeqCst) {
            return UNKNOWN_LATENCY_MILLIS;
        }
        self.shared.latency.load_millis()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ========================================================================
    // PRIVATE HELPER METHODS
    // ========================================================================

    /// Safely acquire lock on manager state
    fn lock_state(&self) -> Result<MutexGuard<'_, ManagerState>, AudioError> {
        self.state.lock().map_err(|_| {
            let err = AudioError::LockPoisoned {
                component: "playback_engine".to_string(),
            };
            log_audio_error(&err, "lock_state");
            err
        })
    }

    /// Check that the engine is not already running
    fn check_not_running(&self, state: &ManagerState) -> Result<(), AudioError> {
        if state.engine.is_some() {
            let err = AudioError::AlreadyCreated;
            log_audio_error(&err, "check_not_running");
            return Err(err);
        }
        Ok(())
    }

    fn create_engine(
        &self,
        audio: AudioConfig,
        tone: ToneConfig,
    ) -> Result<AudioEngine, AudioError> {
        AudioEngine::with_state(audio, tone, Arc::clone(&self.shared)).map_err(|err| {
            log_audio_error(&err, "create_engine");
            err
        })
    }
}

impl Default for PlaybackEngineManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_new_manager_is_idle() {
        let manager = PlaybackEngineManager::new();
        assert!(!manager.is_running());
        assert!(manager.current_output_latency_millis() < 0.0);
    }

    #[test]
    fn test_latency_read_does_not_wait_for_state_lock() {
        let manager = PlaybackEngineManager::new();
        manager.running.store(true, Ordering::SeqCst);
        manager.shared.latency.store_millis(7.5);

        // A reopen holds the state lock for as long as the device takes
        let guard = manager.state.lock().unwrap();
        let (tx, rx) = mpsc::channel();
        let manager = &manager;
        thread::scope(|scope| {
            scope.spawn(move || {
                let _ = tx.send(manager.current_output_latency_millis());
            });
            let reading = rx.recv_timeout(Duration::from_millis(200));
            drop(guard);
            assert_eq!(reading, Ok(7.5));
        });
    }

    #[test]
    fn test_latency_unknown_after_stop() {
        let manager = PlaybackEngineManager::new();
        manager.running.store(true, Ordering::SeqCst);
        manager.shared.latency.store_millis(7.5);
        manager.state.lock().unwrap().engine = Some(
            AudioEngine::with_state(
                AudioConfig::default(),
                ToneConfig::default(),
                Arc::clone(&manager.shared),
            )
            .unwrap(),
        );

        manager.stop().unwrap();
        assert!(!manager.is_running());
        assert!(manager.current_output_latency_millis() < 0.0);
    }

    #[test]
    fn test_tone_requires_engine() {
        let manager = PlaybackEngineManager::new();
        assert_eq!(manager.set_tone_on(true), Err(AudioError::EngineNotCreated));
    }

    #[test]
    fn test_settings_remembered_before_start() {
        let manager = PlaybackEngineManager::new();
        manager.set_device_id(2).unwrap();
        manager.set_buffer_size(BufferSizeOption::Bursts(4)).unwrap();

        let guard = manager.state.lock().unwrap();
        assert_eq!(guard.preferred.device_id, 2);
        assert_eq!(guard.preferred.buffer_size, Some(BufferSizeOption::Bursts(4)));
    }

    #[test]
    fn test_stop_when_idle_is_ok() {
        let manager = PlaybackEngineManager::new();
        assert!(manager.stop().is_ok());
    }

    #[test]
    fn test_check_not_running_passes_when_empty() {
        let manager = PlaybackEngineManager::new();
        let guard = manager.state.lock().unwrap();
        assert!(manager.check_not_running(&guard).is_ok());
    }
}
