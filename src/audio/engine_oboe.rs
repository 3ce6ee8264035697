//! Android output stream built on Oboe (AAudio/OpenSL ES)
//!
//! Oboe reports the real burst size and computes latency from the stream
//! timestamps itself; the callback publishes it (see `callback.rs`). The
//! oscillator starts at the configured rate and the callback retunes it if
//! the stream opened at another one.

use oboe::{
    AudioStream, AudioStreamAsync, AudioStreamBase, AudioStreamBuilder, AudioStreamSafe, Output,
    PerformanceMode, SharingMode, Stereo,
};
use std::sync::Arc;

use super::callback::{SharedPlaybackState, ToneCallback};
use super::engine::{StreamInfo, StreamOpener, StreamSettings};
use super::tone::ToneGenerator;
use crate::error::AudioError;

type OutputStream = AudioStreamAsync<Output, ToneCallback>;

/// Opens Oboe output streams in low-latency exclusive mode.
pub struct PlatformOpener;

impl StreamOpener for PlatformOpener {
    type Stream = OutputStream;

    fn open(
        &mut self,
        settings: &StreamSettings,
        state: &Arc<SharedPlaybackState>,
    ) -> Result<(OutputStream, StreamInfo), AudioError> {
        open_output_stream(settings, state)
    }

    fn close(&mut self, mut stream: OutputStream) {
        if let Err(err) = stream.stop() {
            log::debug!("[PlaybackStream] Stop before close failed: {:?}", err);
        }
        drop(stream);
    }
}

fn open_output_stream(
    settings: &StreamSettings,
    state: &Arc<SharedPlaybackState>,
) -> Result<(OutputStream, StreamInfo), AudioError> {
    let tone = ToneGenerator::new(
        settings.tone.frequency_hz,
        settings.tone.amplitude,
        settings.audio.sample_rate,
    );
    let callback = ToneCallback::new(Arc::clone(state), tone, 2);

    let mut stream = AudioStreamBuilder::default()
        .set_performance_mode(PerformanceMode::LowLatency)
        .set_sharing_mode(SharingMode::Exclusive)
        .set_direction::<Output>()
        .set_device_id(settings.device_id)
        .set_sample_rate(settings.audio.sample_rate as i32)
        .set_channel_count::<Stereo>()
        .set_format::<f32>()
        .set_callback(callback)
        .open_stream()
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Output stream: {:?}", e),
        })?;

    let frames_per_burst = stream.get_frames_per_burst().max(1) as u32;
    let buffer_frames = match settings.buffer_size.frames(frames_per_burst) {
        Some(frames) => {
            let applied = stream
                .set_buffer_size_in_frames(frames as i32)
                .map_err(|e| AudioError::HardwareError {
                    details: format!("Failed to set buffer size to {} frames: {:?}", frames, e),
                })?;
            Some(applied.max(0) as u32)
        }
        None => None,
    };

    stream.start().map_err(|e| AudioError::HardwareError {
        details: format!("Failed to start output stream: {:?}", e),
    })?;

    let info = StreamInfo {
        sample_rate: stream.get_sample_rate().max(0) as u32,
        channels: 2,
        frames_per_burst,
        buffer_frames,
    };

    Ok((stream, info))
}
