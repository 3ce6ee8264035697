//! Engine module housing the reusable playback core.
//!
//! This module exposes trait-based backends (`backend`) and the
//! `EngineHandle` orchestration layer (`core`) used by the static façade.

pub mod backend;
pub mod core;

pub use backend::{
    AudioBackend, DesktopStubBackend, EngineStartContext, NativeBackend, StubTimeSource,
    SystemTimeSource, TimeSource,
};
pub use core::{EngineHandle, TelemetryEvent, TelemetryEventKind};
