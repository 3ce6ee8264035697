//! EngineHandle: orchestration layer behind the playback façade.
//!
//! Owns a trait-based backend, tracks whether the engine exists and
//! publishes telemetry on a broadcast channel (drained by the CLI session).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::audio::latency::UNKNOWN_LATENCY_MILLIS;
use crate::audio::BufferSizeOption;
use crate::config::AppConfig;
use crate::engine::backend::{
    AudioBackend, EngineStartContext, NativeBackend, SystemTimeSource, TimeSource,
};
use crate::error::AudioError;
use crate::telemetry::{self, DiagnosticError, LifecyclePhase};

/// Telemetry event emitted by the engine core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub timestamp_ms: u64,
    pub kind: TelemetryEventKind,
    pub detail: Option<String>,
}

/// Types of telemetry events supported by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEventKind {
    EngineCreated,
    EngineDeleted,
    ToneChanged { on: bool },
    DeviceChanged { id: i32 },
    BufferSizeChanged { bursts: i32 },
    Warning,
}

/// EngineHandle orchestrates the playback backend and telemetry.
pub struct EngineHandle {
    config: Arc<RwLock<AppConfig>>,
    backend: Arc<dyn AudioBackend>,
    telemetry_tx: broadcast::Sender<TelemetryEvent>,
    created: AtomicBool,
    time_source: Arc<dyn TimeSource>,
    start_instant: Instant,
}

impl EngineHandle {
    /// Create a new EngineHandle with the platform backend and config.
    pub fn new() -> Self {
        Self::with_backend(
            AppConfig::load(),
            Arc::new(NativeBackend::new()),
            Arc::new(SystemTimeSource::default()),
        )
    }

    /// Create an EngineHandle over an explicit backend (tests, tooling).
    pub fn with_backend(
        config: AppConfig,
        backend: Arc<dyn AudioBackend>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        let (telemetry_tx, _) = broadcast::channel(128);
        let start_instant = time_source.now();

        Self {
            config: Arc::new(RwLock::new(config)),
            backend,
            telemetry_tx,
            created: AtomicBool::new(false),
            time_source,
            start_instant,
        }
    }

    fn emit_event(&self, kind: TelemetryEventKind, detail: Option<String>) {
        let _ = self.telemetry_tx.send(TelemetryEvent {
            timestamp_ms: self.uptime_ms(),
            kind,
            detail,
        });
    }

    fn warn(&self, code: DiagnosticError, context: &str, err: &AudioError) {
        tracing::warn!("[EngineHandle] {} failed: {}", context, err);
        telemetry::hub().record_error(code, format!("{}: {}", context, err));
        self.emit_event(TelemetryEventKind::Warning, Some(format!("{}: {}", context, err)));
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Create the engine and open the output stream.
    pub fn create(&self) -> Result<(), AudioError> {
        if self.is_created() {
            return Err(AudioError::AlreadyCreated);
        }

        let config = self.config_snapshot();
        let ctx = EngineStartContext {
            audio: config.audio,
            tone: config.tone,
        };

        if let Err(err) = self.backend.start(ctx) {
            self.warn(DiagnosticError::EngineInit, "create", &err);
            return Err(err);
        }

        self.created.store(true, Ordering::SeqCst);
        telemetry::hub().record_lifecycle(LifecyclePhase::EngineCreated);
        self.emit_event(TelemetryEventKind::EngineCreated, None);
        tracing::info!("[EngineHandle] Engine created");
        Ok(())
    }

    /// Release the engine and its stream. No-op when nothing was created.
    ///
    /// The handle stays created if the backend fails to stop.
    pub fn delete(&self) -> Result<(), AudioError> {
        if !self.is_created() {
            return Ok(());
        }

        if let Err(err) = self.backend.stop() {
            self.warn(DiagnosticError::EngineShutdown, "delete", &err);
            return Err(err);
        }
        self.created.store(false, Ordering::SeqCst);
        telemetry::hub().record_lifecycle(LifecyclePhase::EngineDeleted);
        self.emit_event(TelemetryEventKind::EngineDeleted, None);
        tracing::info!("[EngineHandle] Engine deleted");
        Ok(())
    }

    pub fn is_created(&self) -> bool {
        self.created.load(Ordering::SeqCst)
    }

    // ========================================================================
    // PARAMETERS
    // ========================================================================

    pub fn set_tone_on(&self, on: bool) -> Result<(), AudioError> {
        if !self.is_created() {
            return Err(AudioError::EngineNotCreated);
        }
        if let Err(err) = self.backend.set_tone_on(on) {
            self.warn(DiagnosticError::ToneSwitch, "set_tone_on", &err);
            return Err(err);
        }
        self.emit_event(TelemetryEventKind::ToneChanged { on }, None);
        Ok(())
    }

    /// Route output to `device_id` (0 selects the platform default).
    pub fn set_audio_device_id(&self, device_id: i32) -> Result<(), AudioError> {
        if let Err(err) = self.backend.set_device_id(device_id) {
            self.warn(DiagnosticError::StreamReconfigure, "set_audio_device_id", &err);
            return Err(err);
        }
        self.emit_event(TelemetryEventKind::DeviceChanged { id: device_id }, None);
        Ok(())
    }

    /// Resize the buffer to `bursts` bursts (0 lets the platform decide).
    pub fn set_buffer_size_in_bursts(&self, bursts: i32) -> Result<(), AudioError> {
        let result = BufferSizeOption::from_bursts(bursts)
            .and_then(|option| self.backend.set_buffer_size(option));
        if let Err(err) = result {
            self.warn(DiagnosticError::StreamReconfigure, "set_buffer_size_in_bursts", &err);
            return Err(err);
        }
        self.emit_event(TelemetryEventKind::BufferSizeChanged { bursts }, None);
        Ok(())
    }

    /// Current output latency in milliseconds; negative when unknown.
    pub fn current_output_latency_millis(&self) -> f64 {
        if !self.is_created() {
            return UNKNOWN_LATENCY_MILLIS;
        }
        self.backend.current_output_latency_millis()
    }

    // ========================================================================
    // SUBSCRIPTIONS & TOOLING
    // ========================================================================

    pub fn subscribe_telemetry(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.telemetry_tx.subscribe()
    }

    /// Milliseconds elapsed since the handle was created (used for telemetry).
    pub fn uptime_ms(&self) -> u64 {
        self.time_source
            .now()
            .saturating_duration_since(self.start_instant)
            .as_millis() as u64
    }

    /// Snapshot the current app configuration (tooling helper).
    pub fn config_snapshot(&self) -> AppConfig {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .unwrap_or_else(|err| err.into_inner().clone())
    }
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
