//! Output latency cell shared between the audio callback and pollers
//!
//! The callback publishes the latest measurement; anyone may read it
//! without blocking. Milliseconds are stored as `f64` bits in an
//! `AtomicU64`. A negative value means the latency is unknown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Value reported when no measurement is available
pub const UNKNOWN_LATENCY_MILLIS: f64 = -1.0;

/// Text shown for an unknown latency
pub const UNKNOWN_LATENCY_TEXT: &str = "Unknown";

#[derive(Debug)]
pub struct LatencyCell {
    bits: AtomicU64,
}

impl LatencyCell {
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(UNKNOWN_LATENCY_MILLIS.to_bits()),
        }
    }

    /// Publish a measurement. Non-finite values are stored as unknown.
    #[inline]
    pub fn store_millis(&self, millis: f64) {
        let value = if millis.is_finite() {
            millis
        } else {
            UNKNOWN_LATENCY_MILLIS
        };
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn store_duration(&self, latency: Option<Duration>) {
        match latency {
            Some(d) => self.store_millis(d.as_secs_f64() * 1000.0),
            None => self.mark_unknown(),
        }
    }

    #[inline]
    pub fn mark_unknown(&self) {
        self.store_millis(UNKNOWN_LATENCY_MILLIS);
    }

    #[inline]
    pub fn load_millis(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl Default for LatencyCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a latency reading for display: `"12.35ms"` or `"Unknown"`.
pub fn format_latency(millis: f64) -> String {
    if millis >= 0.0 {
        format!("{:.2}ms", millis)
    } else {
        UNKNOWN_LATENCY_TEXT.to_string()
    }
}

/// Latency implied by the buffered frames alone.
///
/// Used when the backend cannot timestamp playback.
pub fn buffered_latency_millis(buffered_frames: u32, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return UNKNOWN_LATENCY_MILLIS;
    }
    buffered_frames as f64 * 1000.0 / sample_rate as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unknown() {
        let cell = LatencyCell::new();
        assert!(cell.load_millis() < 0.0);
    }

    #[test]
    fn test_store_and_load() {
        let cell = LatencyCell::new();
        cell.store_millis(12.5);
        assert_eq!(cell.load_millis(), 12.5);

        cell.mark_unknown();
        assert_eq!(cell.load_millis(), UNKNOWN_LATENCY_MILLIS);
    }

    #[test]
    fn test_non_finite_is_unknown() {
        let cell = LatencyCell::new();
        cell.store_millis(f64::NAN);
        assert_eq!(cell.load_millis(), UNKNOWN_LATENCY_MILLIS);
        cell.store_millis(f64::INFINITY);
        assert_eq!(cell.load_millis(), UNKNOWN_LATENCY_MILLIS);
    }

    #[test]
    fn test_store_duration() {
        let cell = LatencyCell::new();
        cell.store_duration(Some(Duration::from_micros(20_500)));
        assert!((cell.load_millis() - 20.5).abs() < 1e-9);

        cell.store_duration(None);
        assert!(cell.load_millis() < 0.0);
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(12.346), "12.35ms");
        assert_eq!(format_latency(0.0), "0.00ms");
        assert_eq!(format_latency(-1.0), "Unknown");
        assert_eq!(format_latency(-0.001), "Unknown");
    }

    #[test]
    fn test_buffered_latency() {
        assert_eq!(buffered_latency_millis(480, 48000), 10.0);
        assert!(buffered_latency_millis(480, 0) < 0.0);
    }
}
