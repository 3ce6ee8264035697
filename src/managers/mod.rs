// Managers Module
//
// - PlaybackEngineManager: playback engine lifecycle and stream settings

pub mod playback_engine_manager;

pub use playback_engine_manager::PlaybackEngineManager;
