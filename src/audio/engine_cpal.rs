//! Desktop output stream built on cpal
//!
//! cpal has no notion of bursts, so the burst size comes from config,
//! clamped into the buffer range the device reports. Latency is the gap
//! between the callback timestamp and the playback timestamp of the
//! callback's first frame.

use cpal::traits::{DeviceTrait, StreamTrait};
use std::sync::Arc;

use super::callback::{SharedPlaybackState, ToneCallback};
use super::devices::resolve_output_device;
use super::engine::{StreamInfo, StreamOpener, StreamSettings};
use super::tone::ToneGenerator;
use crate::error::AudioError;

/// Opens cpal output streams on the default host.
pub struct PlatformOpener;

impl StreamOpener for PlatformOpener {
    type Stream = cpal::Stream;

    fn open(
        &mut self,
        settings: &StreamSettings,
        state: &Arc<SharedPlaybackState>,
    ) -> Result<(cpal::Stream, StreamInfo), AudioError> {
        open_output_stream(settings, state)
    }

    fn close(&mut self, stream: cpal::Stream) {
        if let Err(err) = stream.pause() {
            log::debug!("[PlaybackStream] Pause before close failed: {}", err);
        }
        drop(stream);
    }
}

fn open_output_stream(
    settings: &StreamSettings,
    state: &Arc<SharedPlaybackState>,
) -> Result<(cpal::Stream, StreamInfo), AudioError> {
    let device = resolve_output_device(settings.device_id)?;
    let supported = select_output_config(&device, settings)?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let frames_per_burst = burst_frames(supported.buffer_size(), settings.audio.frames_per_burst);
    let buffer_frames = settings
        .buffer_size
        .frames(frames_per_burst)
        .map(|frames| clamp_to_supported(frames, supported.buffer_size()));

    let stream_config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: match buffer_frames {
            Some(frames) => cpal::BufferSize::Fixed(frames),
            None => cpal::BufferSize::Default,
        },
    };

    let tone = ToneGenerator::new(
        settings.tone.frequency_hz,
        settings.tone.amplitude,
        sample_rate,
    );
    let mut callback = ToneCallback::new(Arc::clone(state), tone, channels as usize);
    let error_state = Arc::clone(state);

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], info: &cpal::OutputCallbackInfo| {
                callback.process(data);
                let timestamp = info.timestamp();
                callback
                    .latency()
                    .store_duration(timestamp.playback.duration_since(&timestamp.callback));
            },
            move |err| {
                log::error!("[PlaybackStream] Output stream error: {}", err);
                error_state.latency.mark_unknown();
            },
            None,
        )
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })?;

    stream.play().map_err(|e| AudioError::HardwareError {
        details: format!("Output start failed: {}", e),
    })?;

    Ok((
        stream,
        StreamInfo {
            sample_rate,
            channels,
            frames_per_burst,
            buffer_frames,
        },
    ))
}

/// Prefer an f32 config matching the requested channel count and sample
/// rate; fall back to the device default if it is f32.
fn select_output_config(
    device: &cpal::Device,
    settings: &StreamSettings,
) -> Result<cpal::SupportedStreamConfig, AudioError> {
    let requested_rate = cpal::SampleRate(settings.audio.sample_rate);

    if let Ok(mut configs) = device.supported_output_configs() {
        let matching = configs.find(|range| {
            range.sample_format() == cpal::SampleFormat::F32
                && range.channels() == settings.audio.channel_count
                && range.min_sample_rate() <= requested_rate
                && requested_rate <= range.max_sample_rate()
        });
        if let Some(range) = matching {
            return Ok(range.with_sample_rate(requested_rate));
        }
    }

    let default_config = device.default_output_config().map_err(|e| AudioError::StreamOpenFailed {
        reason: format!("Failed to get default output config: {:?}", e),
    })?;

    if default_config.sample_format() != cpal::SampleFormat::F32 {
        return Err(AudioError::StreamOpenFailed {
            reason: "Only F32 sample format is currently supported for output".to_string(),
        });
    }

    Ok(default_config)
}

/// Burst size for the device: the configured burst clamped into the
/// device's buffer range.
pub(crate) fn burst_frames(supported: &cpal::SupportedBufferSize, configured: u32) -> u32 {
    clamp_to_supported(configured.max(1), supported)
}

pub(crate) fn clamp_to_supported(frames: u32, supported: &cpal::SupportedBufferSize) -> u32 {
    match supported {
        cpal::SupportedBufferSize::Range { min, max } if min <= max => frames.clamp(*min, *max),
        _ => frames,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_within_range_is_kept() {
        let range = cpal::SupportedBufferSize::Range { min: 64, max: 4096 };
        assert_eq!(burst_frames(&range, 192), 192);
    }

    #[test]
    fn test_burst_clamped_to_device_minimum() {
        let range = cpal::SupportedBufferSize::Range { min: 256, max: 4096 };
        assert_eq!(burst_frames(&range, 192), 256);
    }

    #[test]
    fn test_unknown_range_keeps_request() {
        assert_eq!(burst_frames(&cpal::SupportedBufferSize::Unknown, 192), 192);
        assert_eq!(
            clamp_to_supported(1536, &cpal::SupportedBufferSize::Unknown),
            1536
        );
    }

    #[test]
    fn test_large_buffer_clamped_to_device_maximum() {
        let range = cpal::SupportedBufferSize::Range { min: 64, max: 1024 };
        assert_eq!(clamp_to_supported(8 * 192, &range), 1024);
    }
}
