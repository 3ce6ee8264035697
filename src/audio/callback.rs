//! Audio output callback - real-time tone rendering
//!
//! `ToneCallback` encapsulates all state the output callback touches. Both
//! backends drive it: the cpal stream closure on desktop and the Oboe
//! `AudioOutputCallback` implementation on Android.
//!
//! # Real-Time Safety
//! - No heap allocations during audio processing
//! - No mutex locks (only atomic loads/stores)
//! - Bounded execution time
//!
//! # Architecture
//! ```text
//! PlaybackStream::open()
//!   └─> ToneCallback::new()
//!       └─> output stream callback [Real-time thread]
//!           ├─> tone_on.load()          [switch set by press/release]
//!           ├─> ToneGenerator::render() [sine or silence]
//!           └─> LatencyCell::store_*()  [published to pollers]
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::latency::LatencyCell;
use super::tone::ToneGenerator;

/// State shared between the engine and its output callback
#[derive(Debug, Default)]
pub struct SharedPlaybackState {
    /// Press/release switch
    pub tone_on: AtomicBool,
    /// Latest output latency measurement
    pub latency: LatencyCell,
}

impl SharedPlaybackState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_tone_on(&self, on: bool) {
        self.tone_on.store(on, Ordering::Relaxed);
    }

    pub fn is_tone_on(&self) -> bool {
        self.tone_on.load(Ordering::Relaxed)
    }
}

/// Output callback for tone generation
pub struct ToneCallback {
    state: Arc<SharedPlaybackState>,
    tone: ToneGenerator,
    channels: usize,
}

impl ToneCallback {
    /// Create a new callback
    ///
    /// # Arguments
    /// * `state` - Switch and latency cell shared with the engine
    /// * `tone` - Oscillator owned by the callback from now on
    /// * `channels` - Interleaved channel count of the stream
    pub fn new(state: Arc<SharedPlaybackState>, tone: ToneGenerator, channels: usize) -> Self {
        Self {
            state,
            tone,
            channels: channels.max(1),
        }
    }

    /// Render one callback's worth of interleaved samples.
    #[inline]
    pub fn process(&mut self, data: &mut [f32]) {
        let tone_on = self.state.tone_on.load(Ordering::Relaxed);
        self.tone.render(data, self.channels, tone_on);
    }

    /// Render into stereo frames given as sample pairs.
    #[inline]
    pub fn process_stereo(&mut self, frames: &mut [(f32, f32)]) {
        let tone_on = self.state.tone_on.load(Ordering::Relaxed);
        for frame in frames.iter_mut() {
            let sample = self.tone.next_sample(tone_on);
            *frame = (sample, sample);
        }
    }

    /// Follow the rate the platform opened the stream at.
    #[inline]
    pub fn sync_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate > 0 {
            self.tone.set_sample_rate(sample_rate);
        }
    }

    pub fn tone(&self) -> &ToneGenerator {
        &self.tone
    }

    pub fn latency(&self) -> &LatencyCell {
        &self.state.latency
    }
}

#[cfg(target_os = "android")]
mod oboe_impl {
    use oboe::{
        AudioOutputCallback, AudioOutputStreamSafe, AudioStreamBase, AudioStreamSafe,
        DataCallbackResult, Stereo,
    };

    use super::ToneCallback;

    impl AudioOutputCallback for ToneCallback {
        type FrameType = (f32, Stereo);

        fn on_audio_ready(
            &mut self,
            stream: &mut dyn AudioOutputStreamSafe,
            frames: &mut [(f32, f32)],
        ) -> DataCallbackResult {
            // Real-time audio callback - NO ALLOCATIONS, LOCKS, OR BLOCKING!
            self.sync_sample_rate(stream.get_sample_rate().max(0) as u32);
            self.process_stereo(frames);

            match stream.calculate_latency_millis() {
                Ok(millis) => self.latency().store_millis(millis),
                Err(_) => self.latency().mark_unknown(),
            }

            DataCallbackResult::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback(channels: usize) -> (ToneCallback, Arc<SharedPlaybackState>) {
        let state = SharedPlaybackState::new();
        let tone = ToneGenerator::new(440.0, 0.5, 48000);
        (ToneCallback::new(Arc::clone(&state), tone, channels), state)
    }

    #[test]
    fn test_silent_until_tone_switched_on() {
        let (mut cb, state) = callback(2);
        let mut data = vec![0.5_f32; 512];

        cb.process(&mut data);
        assert!(data.iter().all(|&s| s == 0.0));

        state.set_tone_on(true);
        cb.process(&mut data);
        assert!(data.iter().any(|&s| s != 0.0));

        state.set_tone_on(false);
        cb.process(&mut data);
        assert!(data.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_sync_sample_rate_ignores_unknown_rate() {
        let (mut cb, _state) = callback(2);
        cb.sync_sample_rate(0);
        assert_eq!(cb.tone().sample_rate(), 48000);
        cb.sync_sample_rate(44100);
        assert_eq!(cb.tone().sample_rate(), 44100);
    }

    #[test]
    fn test_stereo_frames_match_interleaved_render() {
        let (mut interleaved, state_a) = callback(2);
        let (mut paired, state_b) = callback(2);
        state_a.set_tone_on(true);
        state_b.set_tone_on(true);

        let mut data = vec![0.0_f32; 64];
        let mut frames = vec![(0.0_f32, 0.0_f32); 32];
        interleaved.process(&mut data);
        paired.process_stereo(&mut frames);

        for (i, (l, r)) in frames.iter().enumerate() {
            assert_eq!(*l, data[i * 2]);
            assert_eq!(*r, data[i * 2 + 1]);
        }
    }

    #[test]
    fn test_latency_cell_is_shared() {
        let (cb, state) = callback(1);
        cb.latency().store_millis(9.75);
        assert_eq!(state.latency.load_millis(), 9.75);
    }
}
