//! AudioEngine - low-latency tone playback
//!
//! This module provides the playback engine behind the façade:
//! - One output stream, opened on the selected device with the selected
//!   buffer size (in bursts)
//! - Press/release tone switch read lock-free by the output callback
//! - Output latency published by the callback, readable from any thread
//!
//! Architecture:
//! - Stream thread ("playback-stream"): owns the platform stream object and
//!   opens/closes it on command. Platform streams are not `Send` everywhere,
//!   so they never leave this thread.
//! - Output callback: renders the tone and measures latency
//!   (see `callback.rs`)
//! - Callers: talk to the stream thread over an mpsc channel and wait for
//!   the reply; tone and latency go through `SharedPlaybackState` atomics.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::buffer_size::BufferSizeOption;
use super::callback::SharedPlaybackState;
use crate::config::{AudioConfig, ToneConfig};
use crate::error::{log_audio_error, AudioError};

#[cfg(not(target_os = "android"))]
use super::engine_cpal::PlatformOpener;
#[cfg(target_os = "android")]
use super::engine_oboe::PlatformOpener;

/// Everything needed to (re)open the output stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSettings {
    pub device_id: i32,
    pub buffer_size: BufferSizeOption,
    pub audio: AudioConfig,
    pub tone: ToneConfig,
}

impl StreamSettings {
    pub fn new(audio: AudioConfig, tone: ToneConfig) -> Self {
        let buffer_size =
            BufferSizeOption::from_bursts(audio.buffer_size_in_bursts).unwrap_or_default();
        Self {
            device_id: crate::audio::devices::AUTO_SELECT_DEVICE_ID,
            buffer_size,
            audio,
            tone,
        }
    }
}

/// Properties of the stream that was actually opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames_per_burst: u32,
    /// Fixed buffer size in frames, `None` when left to the platform
    pub buffer_frames: Option<u32>,
}

/// Opens and closes the platform output stream on the stream thread.
///
/// Only the opener crosses threads; the stream it returns stays on the
/// stream thread.
pub trait StreamOpener: Send + 'static {
    type Stream;

    fn open(
        &mut self,
        settings: &StreamSettings,
        state: &Arc<SharedPlaybackState>,
    ) -> Result<(Self::Stream, StreamInfo), AudioError>;

    fn close(&mut self, stream: Self::Stream);
}

enum StreamCommand {
    Open {
        settings: StreamSettings,
        reply: mpsc::SyncSender<Result<StreamInfo, AudioError>>,
    },
    Close {
        reply: mpsc::SyncSender<()>,
    },
}

/// Audio engine for press-to-play tone output
///
/// # Example
/// ```ignore
/// let mut engine = AudioEngine::new(AudioConfig::default(), ToneConfig::default())?;
/// engine.start()?;
/// engine.set_tone_on(true);
/// let latency = engine.current_output_latency_millis();
/// engine.stop()?;
/// ```
pub struct AudioEngine {
    commands: Option<mpsc::Sender<StreamCommand>>,
    worker: Option<JoinHandle<()>>,
    state: Arc<SharedPlaybackState>,
    settings: StreamSettings,
    info: Option<StreamInfo>,
    /// Set between `start()` and `stop()`, even while the stream is lost
    wants_stream: bool,
}

impl AudioEngine {
    /// Create the engine and spawn its stream thread. No stream is opened
    /// until `start()`.
    ///
    /// # Errors
    /// Returns `AudioError::HardwareError` if the thread cannot be spawned
    pub fn new(audio: AudioConfig, tone: ToneConfig) -> Result<Self, AudioError> {
        Self::with_state(audio, tone, SharedPlaybackState::new())
    }

    /// Like `new`, publishing tone and latency through `state`.
    pub fn with_state(
        audio: AudioConfig,
        tone: ToneConfig,
        state: Arc<SharedPlaybackState>,
    ) -> Result<Self, AudioError> {
        Self::with_opener(audio, tone, state, PlatformOpener)
    }

    /// Like `with_state`, opening streams through `opener`.
    pub fn with_opener<O: StreamOpener>(
        audio: AudioConfig,
        tone: ToneConfig,
        state: Arc<SharedPlaybackState>,
        opener: O,
    ) -> Result<Self, AudioError> {
        let (tx, rx) = mpsc::channel::<StreamCommand>();

        let worker_state = Arc::clone(&state);
        let worker = thread::Builder::new()
            .name("playback-stream".into())
            .spawn(move || run_stream_thread(rx, worker_state, opener))?;

        Ok(AudioEngine {
            commands: Some(tx),
            worker: Some(worker),
            state,
            settings: StreamSettings::new(audio, tone),
            info: None,
            wants_stream: false,
        })
    }

    /// Open and start the output stream with the current settings.
    ///
    /// # Errors
    /// Returns error if the device cannot be resolved or the stream cannot
    /// be opened or started
    pub fn start(&mut self) -> Result<StreamInfo, AudioError> {
        let info = self.open(self.settings.clone())?;
        self.info = Some(info);
        self.wants_stream = true;
        Ok(info)
    }

    /// Close the output stream. Safe to call when not running.
    pub fn stop(&mut self) -> Result<(), AudioError> {
        let was_open = self.info.take().is_some();
        if !std::mem::replace(&mut self.wants_stream, false) && !was_open {
            return Ok(());
        }
        let (reply, done) = mpsc::sync_channel(1);
        self.send(StreamCommand::Close { reply })?;
        done.recv().map_err(|_| stream_thread_gone())?;
        self.state.latency.mark_unknown();
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.info.is_some()
    }

    /// Switch the tone on or off. Never reopens the stream.
    pub fn set_tone_on(&self, on: bool) {
        self.state.set_tone_on(on);
    }

    pub fn is_tone_on(&self) -> bool {
        self.state.is_tone_on()
    }

    /// Route output to another device, reopening the stream if running.
    ///
    /// On failure the previous device stays selected and its stream is
    /// reopened. If the stream was lost, any change tries to open it again.
    pub fn set_device_id(&mut self, device_id: i32) -> Result<(), AudioError> {
        let mut next = self.settings.clone();
        next.device_id = device_id;
        self.apply(next)
    }

    /// Change the buffer size, reopening the stream if running.
    pub fn set_buffer_size(&mut self, buffer_size: BufferSizeOption) -> Result<(), AudioError> {
        let mut next = self.settings.clone();
        next.buffer_size = buffer_size;
        self.apply(next)
    }

    /// Latest output latency in milliseconds; negative when unknown.
    pub fn current_output_latency_millis(&self) -> f64 {
        if self.info.is_none() {
            return crate::audio::latency::UNKNOWN_LATENCY_MILLIS;
        }
        self.state.latency.load_millis()
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    pub fn stream_info(&self) -> Option<StreamInfo> {
        self.info
    }

    pub fn shared_state(&self) -> Arc<SharedPlaybackState> {
        Arc::clone(&self.state)
    }

    /// True when `start()` succeeded but the stream has since been lost.
    pub fn is_stream_lost(&self) -> bool {
        self.wants_stream && self.info.is_none()
    }

    fn apply(&mut self, next: StreamSettings) -> Result<(), AudioError> {
        let lost = self.is_stream_lost();
        if next == self.settings && !lost {
            return Ok(());
        }
        if !self.wants_stream {
            self.settings = next;
            return Ok(());
        }

        match self.open(next.clone()) {
            Ok(info) => {
                if lost {
                    log::info!("[AudioEngine] Output stream recovered");
                }
                self.settings = next;
                self.info = Some(info);
                Ok(())
            }
            Err(err) => {
                log_audio_error(&err, "reopen_stream");
                if lost {
                    // Nothing to restore; the next change tries again
                    self.settings = next;
                    return Err(err);
                }
                match self.open(self.settings.clone()) {
                    Ok(info) => self.info = Some(info),
                    Err(restore_err) => {
                        log_audio_error(&restore_err, "restore_stream");
                        self.info = None;
                    }
                }
                Err(err)
            }
        }
    }

    fn open(&self, settings: StreamSettings) -> Result<StreamInfo, AudioError> {
        let (reply, result) = mpsc::sync_channel(1);
        self.send(StreamCommand::Open { settings, reply })?;
        result.recv().map_err(|_| stream_thread_gone())?
    }

    fn send(&self, command: StreamCommand) -> Result<(), AudioError> {
        self.commands
            .as_ref()
            .ok_or_else(stream_thread_gone)?
            .send(command)
            .map_err(|_| stream_thread_gone())
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        // Closing the channel ends the stream thread, which drops the stream
        self.commands.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("[AudioEngine] Stream thread panicked");
            }
        }
    }
}

fn stream_thread_gone() -> AudioError {
    AudioError::StreamFailure {
        reason: "Stream thread is not running".to_string(),
    }
}

fn run_stream_thread<O: StreamOpener>(
    rx: mpsc::Receiver<StreamCommand>,
    state: Arc<SharedPlaybackState>,
    mut opener: O,
) {
    let mut stream: Option<O::Stream> = None;

    while let Ok(command) = rx.recv() {
        match command {
            StreamCommand::Open { settings, reply } => {
                // Release the old stream before the device is opened again
                if let Some(old) = stream.take() {
                    opener.close(old);
                }
                state.latency.mark_unknown();

                let result = match opener.open(&settings, &state) {
                    Ok((opened, info)) => {
                        log::info!(
                            "[AudioEngine] Output stream open: device={} rate={} channels={} burst={} buffer={:?}",
                            settings.device_id,
                            info.sample_rate,
                            info.channels,
                            info.frames_per_burst,
                            info.buffer_frames
                        );
                        stream = Some(opened);
                        Ok(info)
                    }
                    Err(err) => Err(err),
                };
                let _ = reply.send(result);
            }
            StreamCommand::Close { reply } => {
                if let Some(old) = stream.take() {
                    opener.close(old);
                }
                let _ = reply.send(());
            }
        }
    }

    if let Some(old) = stream.take() {
        opener.close(old);
    }
    log::debug!("[AudioEngine] Stream thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> AudioEngine {
        AudioEngine::new(AudioConfig::default(), ToneConfig::default())
            .expect("engine creation should not need audio hardware")
    }

    #[test]
    fn test_new_engine_is_idle() {
        let engine = engine();
        assert!(!engine.is_running());
        assert!(!engine.is_tone_on());
        assert!(engine.current_output_latency_millis() < 0.0);
        assert_eq!(engine.settings().device_id, 0);
        assert_eq!(engine.settings().buffer_size, BufferSizeOption::Automatic);
    }

    #[test]
    fn test_settings_change_while_stopped_does_not_open_stream() {
        let mut engine = engine();
        engine.set_device_id(3).unwrap();
        engine.set_buffer_size(BufferSizeOption::Bursts(4)).unwrap();

        assert!(!engine.is_running());
        assert_eq!(engine.settings().device_id, 3);
        assert_eq!(engine.settings().buffer_size, BufferSizeOption::Bursts(4));
    }

    #[test]
    fn test_tone_switch_without_stream() {
        let engine = engine();
        engine.set_tone_on(true);
        assert!(engine.is_tone_on());
        assert!(engine.shared_state().is_tone_on());
        engine.set_tone_on(false);
        assert!(!engine.is_tone_on());
    }

    #[test]
    fn test_stop_when_not_running_is_ok() {
        let mut engine = engine();
        assert!(engine.stop().is_ok());
    }

    #[derive(Default)]
    struct OpenerLog {
        opened: Vec<StreamSettings>,
        closed: usize,
        failing_devices: Vec<i32>,
        fail_all: bool,
    }

    /// Records every open/close and fails on request.
    #[derive(Clone, Default)]
    struct FakeOpener {
        log: Arc<std::sync::Mutex<OpenerLog>>,
    }

    impl FakeOpener {
        fn log(&self) -> std::sync::MutexGuard<'_, OpenerLog> {
            self.log.lock().unwrap()
        }

        fn open_count(&self) -> usize {
            self.log().opened.len()
        }
    }

    impl StreamOpener for FakeOpener {
        type Stream = i32;

        fn open(
            &mut self,
            settings: &StreamSettings,
            state: &Arc<SharedPlaybackState>,
        ) -> Result<(i32, StreamInfo), AudioError> {
            let mut log = self.log();
            log.opened.push(settings.clone());
            if log.fail_all || log.failing_devices.contains(&settings.device_id) {
                return Err(AudioError::StreamOpenFailed {
                    reason: format!("device {} unavailable", settings.device_id),
                });
            }
            state.latency.store_millis(10.0);
            let info = StreamInfo {
                sample_rate: 48000,
                channels: 2,
                frames_per_burst: 192,
                buffer_frames: settings.buffer_size.frames(192),
            };
            Ok((settings.device_id, info))
        }

        fn close(&mut self, _stream: i32) {
            self.log().closed += 1;
        }
    }

    fn running_engine() -> (AudioEngine, FakeOpener) {
        let opener = FakeOpener::default();
        let mut engine = AudioEngine::with_opener(
            AudioConfig::default(),
            ToneConfig::default(),
            SharedPlaybackState::new(),
            opener.clone(),
        )
        .unwrap();
        engine.start().unwrap();
        (engine, opener)
    }

    #[test]
    fn test_device_and_buffer_changes_reopen_running_stream() {
        let (mut engine, opener) = running_engine();
        assert_eq!(opener.open_count(), 1);

        engine.set_device_id(2).unwrap();
        engine.set_buffer_size(BufferSizeOption::Bursts(4)).unwrap();

        assert_eq!(opener.open_count(), 3);
        assert_eq!(opener.log().closed, 2);
        assert_eq!(engine.stream_info().unwrap().buffer_frames, Some(768));
        assert_eq!(opener.log().opened[2].device_id, 2);
    }

    #[test]
    fn test_unchanged_settings_do_not_reopen() {
        let (mut engine, opener) = running_engine();
        engine.set_device_id(0).unwrap();
        engine.set_buffer_size(BufferSizeOption::Automatic).unwrap();
        assert_eq!(opener.open_count(), 1);
    }

    #[test]
    fn test_tone_switch_never_reopens() {
        let (engine, opener) = running_engine();
        for _ in 0..4 {
            engine.set_tone_on(true);
            engine.set_tone_on(false);
        }
        assert_eq!(opener.open_count(), 1);
        assert_eq!(opener.log().closed, 0);
    }

    #[test]
    fn test_failed_reopen_restores_previous_stream() {
        let (mut engine, opener) = running_engine();
        opener.log().failing_devices.push(5);

        assert!(matches!(
            engine.set_device_id(5),
            Err(AudioError::StreamOpenFailed { .. })
        ));

        assert!(engine.is_running());
        assert_eq!(engine.settings().device_id, 0);
        let opened: Vec<i32> = opener.log().opened.iter().map(|s| s.device_id).collect();
        assert_eq!(opened, vec![0, 5, 0]);
        assert_eq!(engine.current_output_latency_millis(), 10.0);
    }

    #[test]
    fn test_lost_stream_recovers_on_next_change() {
        let (mut engine, opener) = running_engine();
        opener.log().fail_all = true;

        assert!(engine.set_device_id(5).is_err());
        assert!(!engine.is_running());
        assert!(engine.is_stream_lost());
        assert!(engine.current_output_latency_millis() < 0.0);

        opener.log().fail_all = false;
        engine.set_device_id(2).unwrap();

        assert!(engine.is_running());
        assert!(!engine.is_stream_lost());
        assert_eq!(engine.settings().device_id, 2);
        assert_eq!(engine.current_output_latency_millis(), 10.0);
    }

    #[test]
    fn test_lost_stream_retries_same_settings() {
        let (mut engine, opener) = running_engine();
        opener.log().fail_all = true;
        assert!(engine.set_buffer_size(BufferSizeOption::Bursts(2)).is_err());
        opener.log().fail_all = false;

        // Re-selecting the current device is enough to reopen
        engine.set_device_id(0).unwrap();
        assert!(engine.is_running());
    }

    #[test]
    fn test_stop_after_lost_stream_clears_recovery() {
        let (mut engine, opener) = running_engine();
        opener.log().fail_all = true;
        assert!(engine.set_device_id(5).is_err());

        engine.stop().unwrap();
        assert!(!engine.is_stream_lost());

        opener.log().fail_all = false;
        let opens = opener.open_count();
        engine.set_device_id(1).unwrap();
        assert_eq!(opener.open_count(), opens);
        assert!(!engine.is_running());
    }

    #[test]
    fn test_initial_buffer_size_from_config() {
        let audio = AudioConfig {
            buffer_size_in_bursts: 2,
            ..AudioConfig::default()
        };
        let engine = AudioEngine::new(audio, ToneConfig::default()).unwrap();
        assert_eq!(engine.settings().buffer_size, BufferSizeOption::Bursts(2));

        let audio = AudioConfig {
            buffer_size_in_bursts: 3,
            ..AudioConfig::default()
        };
        let engine = AudioEngine::new(audio, ToneConfig::default()).unwrap();
        assert_eq!(engine.settings().buffer_size, BufferSizeOption::Automatic);
    }
}
