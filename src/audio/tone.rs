//! Tone - sine oscillator for the press-to-play output
//!
//! The oscillator is owned by the audio callback, so its state is plain
//! fields rather than atomics. The only cross-thread input is the tone
//! switch, read once per callback by the caller and passed to `render`.

use std::f32::consts::TAU;

/// Sine oscillator writing interleaved frames.
#[derive(Debug, Clone)]
pub struct ToneGenerator {
    phase: f32,
    phase_increment: f32,
    amplitude: f32,
    frequency_hz: f32,
    sample_rate: u32,
}

impl ToneGenerator {
    /// Create an oscillator for the given frequency at `sample_rate`.
    ///
    /// `amplitude` is clamped to [0.0, 1.0].
    pub fn new(frequency_hz: f32, amplitude: f32, sample_rate: u32) -> Self {
        Self {
            phase: 0.0,
            phase_increment: phase_increment(frequency_hz, sample_rate),
            amplitude: amplitude.clamp(0.0, 1.0),
            frequency_hz,
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Retune for the rate the stream actually runs at. Keeps the phase.
    #[inline]
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate == self.sample_rate {
            return;
        }
        self.sample_rate = sample_rate;
        self.phase_increment = phase_increment(self.frequency_hz, sample_rate);
    }

    /// Current phase in radians, always within [0, TAU).
    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Fill `data` (interleaved, `channels` samples per frame).
    ///
    /// With `tone_on == false` the buffer is silenced and the phase reset,
    /// so the next press starts at zero phase instead of mid-cycle.
    /// Real-time safe: no allocation, no locking.
    pub fn render(&mut self, data: &mut [f32], channels: usize, tone_on: bool) {
        if !tone_on {
            data.fill(0.0);
            self.phase = 0.0;
            return;
        }

        for frame in data.chunks_mut(channels.max(1)) {
            frame.fill(self.next_sample(true));
        }
    }

    /// Produce one mono sample and advance the phase.
    #[inline]
    pub fn next_sample(&mut self, tone_on: bool) -> f32 {
        if !tone_on {
            self.phase = 0.0;
            return 0.0;
        }

        let sample = self.phase.sin() * self.amplitude;
        self.phase += self.phase_increment;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        sample
    }
}

/// Radians advanced per frame: `TAU * frequency / sample_rate`.
#[inline]
pub fn phase_increment(frequency_hz: f32, sample_rate: u32) -> f32 {
    if sample_rate == 0 {
        return 0.0;
    }
    TAU * frequency_hz / sample_rate as f32
}
