//! Playback controller
//!
//! Holds the selection state of the playback screen (offered devices,
//! offered buffer sizes, latency label) and turns user events into façade
//! calls. Presentation is left to the caller: the CLI prints the state,
//! an Android activity would bind it to widgets.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::api;
use crate::audio::{buffer_size_options, format_latency, BufferSizeOption, DeviceListEntry};
use crate::config::UiConfig;
use crate::engine::EngineHandle;
use crate::error::log_audio_error;

pub mod latency_updater;

pub use latency_updater::LatencyUpdater;

/// Operations the controller needs from the playback engine.
pub trait PlaybackFacade: Send + Sync {
    fn create(&self) -> bool;
    fn delete(&self);
    fn set_tone_on(&self, is_tone_on: bool);
    fn set_audio_device_id(&self, device_id: i32);
    fn set_buffer_size_in_bursts(&self, buffer_size_in_bursts: i32);
    /// Negative when unknown.
    fn get_current_output_latency_millis(&self) -> f64;
}

/// The process-wide engine behind [`crate::api`].
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalFacade;

impl PlaybackFacade for GlobalFacade {
    fn create(&self) -> bool {
        api::create()
    }

    fn delete(&self) {
        api::delete()
    }

    fn set_tone_on(&self, is_tone_on: bool) {
        api::set_tone_on(is_tone_on)
    }

    fn set_audio_device_id(&self, device_id: i32) {
        api::set_audio_device_id(device_id)
    }

    fn set_buffer_size_in_bursts(&self, buffer_size_in_bursts: i32) {
        api::set_buffer_size_in_bursts(buffer_size_in_bursts)
    }

    fn get_current_output_latency_millis(&self) -> f64 {
        api::get_current_output_latency_millis()
    }
}

/// A dedicated engine, e.g. one built over a stub backend.
impl PlaybackFacade for EngineHandle {
    fn create(&self) -> bool {
        match EngineHandle::create(self) {
            Ok(()) => true,
            Err(err) => {
                log_audio_error(&err, "create");
                false
            }
        }
    }

    fn delete(&self) {
        if let Err(err) = EngineHandle::delete(self) {
            log_audio_error(&err, "delete");
        }
    }

    fn set_tone_on(&self, is_tone_on: bool) {
        if let Err(err) = EngineHandle::set_tone_on(self, is_tone_on) {
            log_audio_error(&err, "set_tone_on");
        }
    }

    fn set_audio_device_id(&self, device_id: i32) {
        if let Err(err) = EngineHandle::set_audio_device_id(self, device_id) {
            log_audio_error(&err, "set_audio_device_id");
        }
    }

    fn set_buffer_size_in_bursts(&self, buffer_size_in_bursts: i32) {
        if let Err(err) = EngineHandle::set_buffer_size_in_bursts(self, buffer_size_in_bursts) {
            log_audio_error(&err, "set_buffer_size_in_bursts");
        }
    }

    fn get_current_output_latency_millis(&self) -> f64 {
        self.current_output_latency_millis()
    }
}

/// Touch events on the playback surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    Down,
    Up,
    Move,
    Cancel,
}

/// Label shown for a latency reading, e.g. `"Latency: 12.35ms"`.
pub fn latency_text(latency_ms: f64) -> String {
    format!("Latency: {}", format_latency(latency_ms))
}

pub struct PlaybackController {
    facade: Arc<dyn PlaybackFacade>,
    engine_created: bool,
    devices: Vec<DeviceListEntry>,
    selected_device: usize,
    buffer_options: Vec<BufferSizeOption>,
    selected_buffer_size: usize,
    latency_text: String,
    update_interval: Duration,
    updater: Option<LatencyUpdater>,
}

impl PlaybackController {
    pub fn new(facade: Arc<dyn PlaybackFacade>) -> Self {
        Self {
            facade,
            engine_created: false,
            devices: vec![DeviceListEntry::auto_select()],
            selected_device: 0,
            buffer_options: Vec::new(),
            selected_buffer_size: 0,
            latency_text: latency_text(-1.0),
            update_interval: Duration::from_millis(UiConfig::default().latency_update_interval_ms),
            updater: None,
        }
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Offer the buffer sizes and create the engine.
    ///
    /// Returns whether the engine was created. When it was not, touch
    /// events are ignored for the rest of the session.
    pub fn on_create(&mut self) -> bool {
        self.buffer_options = buffer_size_options();
        self.selected_buffer_size = 0;

        self.engine_created = self.facade.create();
        if self.engine_created {
            log::info!("[PlaybackController] Engine created");
        } else {
            log::error!("[PlaybackController] Engine creation failed, tone disabled");
        }
        self.engine_created
    }

    pub fn on_touch(&self, action: TouchAction) {
        if !self.engine_created {
            return;
        }
        match action {
            TouchAction::Down => self.facade.set_tone_on(true),
            TouchAction::Up => self.facade.set_tone_on(false),
            TouchAction::Move | TouchAction::Cancel => {}
        }
    }

    /// Replace the offered devices, select the first and route to it.
    ///
    /// An empty list is replaced by the "Auto select" entry.
    pub fn on_devices_updated(&mut self, entries: Vec<DeviceListEntry>) {
        self.devices = if entries.is_empty() {
            vec![DeviceListEntry::auto_select()]
        } else {
            entries
        };
        self.selected_device = 0;

        let id = self.devices[0].id;
        log::debug!("[PlaybackController] Device list updated, selecting id {}", id);
        self.facade.set_audio_device_id(id);
    }

    /// Select the device at `index`, returning the id forwarded to the
    /// engine, or `None` when the index is not offered.
    pub fn on_device_selected(&mut self, index: usize) -> Option<i32> {
        let Some(entry) = self.devices.get(index) else {
            log::warn!("[PlaybackController] Device index {} not offered", index);
            return None;
        };
        let id = entry.id;
        self.selected_device = index;
        self.facade.set_audio_device_id(id);
        Some(id)
    }

    /// Select the buffer size at `index`, returning the burst count
    /// forwarded to the engine, or `None` when the index is not offered.
    pub fn on_buffer_size_selected(&mut self, index: usize) -> Option<i32> {
        let Some(option) = self.buffer_options.get(index) else {
            log::warn!("[PlaybackController] Buffer size index {} not offered", index);
            return None;
        };
        let bursts = option.value();
        self.selected_buffer_size = index;
        self.facade.set_buffer_size_in_bursts(bursts);
        Some(bursts)
    }

    /// Start the periodic latency poll, replacing any running one.
    ///
    /// Must be called within a Tokio runtime. Feed each received string
    /// back through [`Self::on_latency_text`].
    pub fn start_latency_updates(&mut self) -> mpsc::UnboundedReceiver<String> {
        self.stop_latency_updates();
        let (updater, rx) = LatencyUpdater::spawn(Arc::clone(&self.facade), self.update_interval);
        self.updater = Some(updater);
        rx
    }

    pub fn stop_latency_updates(&mut self) {
        if let Some(updater) = self.updater.take() {
            updater.cancel();
        }
    }

    pub fn on_latency_text(&mut self, text: String) {
        self.latency_text = text;
    }

    /// Cancel the latency poll, then delete the engine.
    pub fn on_destroy(&mut self) {
        self.stop_latency_updates();
        self.facade.delete();
        self.engine_created = false;
    }

    pub fn is_engine_created(&self) -> bool {
        self.engine_created
    }

    pub fn devices(&self) -> &[DeviceListEntry] {
        &self.devices
    }

    pub fn selected_device(&self) -> Option<&DeviceListEntry> {
        self.devices.get(self.selected_device)
    }

    pub fn buffer_options(&self) -> &[BufferSizeOption] {
        &self.buffer_options
    }

    pub fn selected_buffer_size(&self) -> Option<BufferSizeOption> {
        self.buffer_options.get(self.selected_buffer_size).copied()
    }

    pub fn latency_text(&self) -> &str {
        &self.latency_text
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop_latency_updates();
    }
}
