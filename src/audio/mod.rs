// Audio module - low-latency output stream and tone generation

pub mod buffer_size;
pub mod callback;
pub mod devices;
pub mod engine;
#[cfg(not(target_os = "android"))]
mod engine_cpal;
#[cfg(target_os = "android")]
mod engine_oboe;
pub mod latency;
pub mod tone;

// Re-export commonly used types for convenience
pub use buffer_size::{buffer_size_options, BufferSizeOption, BUFFER_SIZE_OPTIONS};
pub use devices::{DeviceListEntry, AUTO_SELECT_DEVICE_ID};
pub use engine::{AudioEngine, StreamInfo, StreamOpener, StreamSettings};
pub use latency::{format_latency, LatencyCell, UNKNOWN_LATENCY_MILLIS};
pub use tone::ToneGenerator;
