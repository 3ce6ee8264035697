use super::*;
use crate::engine::backend::{DesktopStubBackend, StubTimeSource};

fn stub_handle() -> (EngineHandle, Arc<DesktopStubBackend>) {
    let backend = Arc::new(DesktopStubBackend::new());
    let handle = EngineHandle::with_backend(
        AppConfig::default(),
        backend.clone(),
        Arc::new(StubTimeSource::new()),
    );
    (handle, backend)
}

fn drain(rx: &mut broadcast::Receiver<TelemetryEvent>) -> Vec<TelemetryEventKind> {
    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(event.kind);
    }
    kinds
}

#[test]
fn create_and_delete_round_trip() {
    let (handle, backend) = stub_handle();
    let mut rx = handle.subscribe_telemetry();

    handle.create().unwrap();
    assert!(handle.is_created());
    assert!(backend.is_running());
    assert_eq!(handle.create(), Err(AudioError::AlreadyCreated));

    handle.delete().unwrap();
    assert!(!handle.is_created());
    assert!(!backend.is_running());

    let kinds = drain(&mut rx);
    assert!(kinds.contains(&TelemetryEventKind::EngineCreated));
    assert!(kinds.contains(&TelemetryEventKind::EngineDeleted));
}

#[test]
fn delete_without_create_is_noop() {
    let (handle, _backend) = stub_handle();
    assert!(handle.delete().is_ok());
}

#[test]
fn failed_create_leaves_handle_uncreated() {
    let backend = Arc::new(DesktopStubBackend::failing(AudioError::StreamOpenFailed {
        reason: "no output device".to_string(),
    }));
    let handle = EngineHandle::with_backend(
        AppConfig::default(),
        backend,
        Arc::new(StubTimeSource::new()),
    );
    let mut rx = handle.subscribe_telemetry();

    assert!(handle.create().is_err());
    assert!(!handle.is_created());
    assert_eq!(drain(&mut rx), vec![TelemetryEventKind::Warning]);
}

#[test]
fn tone_requires_created_engine() {
    let (handle, backend) = stub_handle();
    assert_eq!(handle.set_tone_on(true), Err(AudioError::EngineNotCreated));

    handle.create().unwrap();
    handle.set_tone_on(true).unwrap();
    assert!(backend.is_tone_on());
    handle.set_tone_on(false).unwrap();
    assert!(!backend.is_tone_on());
}

#[test]
fn buffer_size_is_validated_before_backend() {
    let (handle, backend) = stub_handle();
    handle.create().unwrap();

    assert_eq!(
        handle.set_buffer_size_in_bursts(3),
        Err(AudioError::InvalidBufferSize { bursts: 3 })
    );
    assert_eq!(backend.buffer_size(), BufferSizeOption::Automatic);

    handle.set_buffer_size_in_bursts(4).unwrap();
    assert_eq!(backend.buffer_size(), BufferSizeOption::Bursts(4));
}

#[test]
fn latency_unknown_until_created() {
    let (handle, _backend) = stub_handle();
    assert!(handle.current_output_latency_millis() < 0.0);

    handle.create().unwrap();
    assert!(handle.current_output_latency_millis() >= 0.0);

    handle.delete().unwrap();
    assert!(handle.current_output_latency_millis() < 0.0);
}

#[test]
fn failed_stop_keeps_engine_created() {
    let (handle, backend) = stub_handle();
    handle.create().unwrap();
    backend.fail_next_stop(AudioError::StreamFailure {
        reason: "device busy".to_string(),
    });
    let mut rx = handle.subscribe_telemetry();

    assert!(handle.delete().is_err());
    assert!(handle.is_created());
    assert!(backend.is_running());
    assert_eq!(drain(&mut rx), vec![TelemetryEventKind::Warning]);

    handle.delete().unwrap();
    assert!(!handle.is_created());
    assert!(!backend.is_running());
}

#[test]
fn uptime_uses_time_source() {
    let (handle, _backend) = stub_handle();
    // StubTimeSource advances 10ms per read
    assert_eq!(handle.uptime_ms(), 10);
}
