//! Core telemetry event types describing playback diagnostics exposed to
//! the CLI and JNI surfaces.

use serde::{Deserialize, Serialize};

/// High-level lifecycle stages reported by JNI/engine instrumentation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    LibraryLoaded,
    ContextInitialized,
    EngineCreated,
    EngineDeleted,
    LibraryUnloaded,
}

/// Diagnostic error codes surfaced via telemetry metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticError {
    EngineInit,
    EngineShutdown,
    StreamReconfigure,
    ToneSwitch,
    Unknown,
}

/// Metric events covering output latency, lifecycle and failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    Latency {
        avg_ms: f32,
        max_ms: f32,
        sample_count: usize,
    },
    Lifecycle {
        phase: LifecyclePhase,
        timestamp_ms: u64,
    },
    Error {
        code: DiagnosticError,
        context: String,
    },
}
