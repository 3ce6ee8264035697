// Hello Playback Core - low-latency tone player
// Output stream engine, static façade and playback controller

// Module declarations
pub mod api;
pub mod audio;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod managers;
pub mod telemetry;

#[cfg(target_os = "android")]
mod jni_bridge;

// Re-exports for convenience
pub use api::{
    create, delete, get_current_output_latency_millis, set_audio_device_id,
    set_buffer_size_in_bursts, set_tone_on,
};
pub use controller::{PlaybackController, PlaybackFacade, TouchAction};

cfg_if::cfg_if! {
    if #[cfg(target_os = "android")] {
        /// Initialize logging to logcat under the `HelloPlayback` tag.
        ///
        /// Safe to call more than once.
        pub fn init_logging() {
            use tracing_subscriber::layer::SubscriberExt;
            use tracing_subscriber::util::SubscriberInitExt;

            match tracing_android::layer("HelloPlayback") {
                Ok(layer) => {
                    let _ = tracing_subscriber::registry().with(layer).try_init();
                }
                Err(err) => eprintln!("[Logging] Android log layer unavailable: {}", err),
            }
        }
    } else {
        /// Initialize logging to stderr, filtered by `RUST_LOG` (default `info`).
        ///
        /// Safe to call more than once.
        pub fn init_logging() {
            let filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }
}
