//! Output device enumeration
//!
//! Devices are identified by a small integer id. Id `0` is always the
//! "auto select" entry that routes to the host's default output; real
//! devices are numbered from 1 in host enumeration order.
//!
//! On desktop the last offered list is remembered, so an id resolves to
//! the device that was offered under it. After a hot-plug reorders the
//! host's devices the id still finds that device by name, or fails with
//! `DeviceNotFound` once it is gone.

use serde::{Deserialize, Serialize};

#[cfg(not(target_os = "android"))]
use crate::error::AudioError;

/// Id of the entry that routes to the platform default device
pub const AUTO_SELECT_DEVICE_ID: i32 = 0;

/// Name of the auto select entry
pub const AUTO_SELECT_NAME: &str = "Auto select";

/// One offered output device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceListEntry {
    pub id: i32,
    pub name: String,
}

impl DeviceListEntry {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn auto_select() -> Self {
        Self::new(AUTO_SELECT_DEVICE_ID, AUTO_SELECT_NAME)
    }

    pub fn is_auto_select(&self) -> bool {
        self.id == AUTO_SELECT_DEVICE_ID
    }
}

/// Build the offered list from device names: auto select first, then one
/// entry per name with ids starting at 1.
pub fn device_entries<I, S>(names: I) -> Vec<DeviceListEntry>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    std::iter::once(DeviceListEntry::auto_select())
        .chain(
            names
                .into_iter()
                .enumerate()
                .map(|(i, name)| DeviceListEntry::new(i as i32 + 1, name)),
        )
        .collect()
}

/// Position of the device offered as `id` among the host's current
/// device names.
///
/// With a remembered name the device at the old position wins if its name
/// still matches, otherwise the first device with that name. Without one
/// the id is taken as a position.
pub fn match_device_index(
    current_names: &[Option<String>],
    id: i32,
    offered_name: Option<&str>,
) -> Option<usize> {
    if id < 1 {
        return None;
    }
    let position = (id - 1) as usize;
    let Some(name) = offered_name else {
        return (position < current_names.len()).then_some(position);
    };

    let matches = |index: &usize| current_names[*index].as_deref() == Some(name);
    Some(position)
        .filter(|index| *index < current_names.len() && matches(index))
        .or_else(|| (0..current_names.len()).find(|index| matches(index)))
}

#[cfg(not(target_os = "android"))]
mod host {
    use std::sync::Mutex;

    use cpal::traits::{DeviceTrait, HostTrait};
    use once_cell::sync::Lazy;

    use super::*;

    /// The list most recently handed out by `list_output_devices`
    static OFFERED: Lazy<Mutex<Vec<DeviceListEntry>>> = Lazy::new(|| Mutex::new(Vec::new()));

    fn offered_name(id: i32) -> Option<String> {
        let offered = OFFERED.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        offered
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.name.clone())
    }

    /// List the output devices of the default host.
    ///
    /// # Errors
    /// Returns `AudioError::HardwareError` if the host cannot enumerate
    /// devices.
    pub fn list_output_devices() -> Result<Vec<DeviceListEntry>, AudioError> {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| AudioError::HardwareError {
                details: format!("Failed to enumerate output devices: {}", e),
            })?;

        let names = devices.enumerate().map(|(i, device)| {
            device
                .name()
                .unwrap_or_else(|_| format!("Output device {}", i + 1))
        });

        let entries = device_entries(names);
        *OFFERED.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = entries.clone();
        Ok(entries)
    }

    /// Resolve a device id to a cpal device on the default host.
    ///
    /// # Errors
    /// Returns `AudioError::DeviceNotFound` when the id is not offered or
    /// the device offered under it is gone.
    pub fn resolve_output_device(id: i32) -> Result<cpal::Device, AudioError> {
        let host = cpal::default_host();

        if id == AUTO_SELECT_DEVICE_ID {
            return host
                .default_output_device()
                .ok_or(AudioError::DeviceNotFound { id });
        }

        let devices: Vec<cpal::Device> = host
            .output_devices()
            .map_err(|e| AudioError::HardwareError {
                details: format!("Failed to enumerate output devices: {}", e),
            })?
            .collect();
        let names: Vec<Option<String>> = devices.iter().map(|device| device.name().ok()).collect();

        let offered = offered_name(id);
        let index = match_device_index(&names, id, offered.as_deref()).ok_or_else(|| {
            log::warn!(
                "[Devices] Device id {} ({}) is no longer available",
                id,
                offered.as_deref().unwrap_or("never offered")
            );
            AudioError::DeviceNotFound { id }
        })?;

        devices
            .into_iter()
            .nth(index)
            .ok_or(AudioError::DeviceNotFound { id })
    }
}

#[cfg(not(target_os = "android"))]
pub use host::{list_output_devices, resolve_output_device};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_select_is_first() {
        let entries = device_entries(["Speakers", "Headphones"]);
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_auto_select());
        assert_eq!(entries[0].name, "Auto select");
    }

    #[test]
    fn test_ids_follow_enumeration_order() {
        let entries = device_entries(vec!["A".to_string(), "B".to_string()]);
        assert_eq!(entries[1], DeviceListEntry::new(1, "A"));
        assert_eq!(entries[2], DeviceListEntry::new(2, "B"));
    }

    fn names(list: &[&str]) -> Vec<Option<String>> {
        list.iter().map(|name| Some(name.to_string())).collect()
    }

    #[test]
    fn test_offered_device_found_at_same_position() {
        let current = names(&["Speakers", "Headphones"]);
        assert_eq!(match_device_index(&current, 2, Some("Headphones")), Some(1));
    }

    #[test]
    fn test_offered_device_followed_after_reorder() {
        // USB headset unplugged and replugged: it now enumerates first
        let current = names(&["USB Headset", "Speakers"]);
        assert_eq!(match_device_index(&current, 2, Some("USB Headset")), Some(0));
        assert_eq!(match_device_index(&current, 1, Some("Speakers")), Some(1));
    }

    #[test]
    fn test_unplugged_device_is_not_replaced() {
        let current = names(&["Speakers", "HDMI"]);
        assert_eq!(match_device_index(&current, 2, Some("USB Headset")), None);
    }

    #[test]
    fn test_duplicate_names_keep_offered_position() {
        let current = names(&["Line Out", "Line Out"]);
        assert_eq!(match_device_index(&current, 2, Some("Line Out")), Some(1));
    }

    #[test]
    fn test_never_offered_id_is_positional() {
        let current = names(&["Speakers", "Headphones"]);
        assert_eq!(match_device_index(&current, 2, None), Some(1));
        assert_eq!(match_device_index(&current, 3, None), None);
        assert_eq!(match_device_index(&current, 0, None), None);
        assert_eq!(match_device_index(&current, -4, None), None);
    }

    #[test]
    fn test_empty_host_still_offers_auto_select() {
        let entries = device_entries(Vec::<String>::new());
        assert_eq!(entries, vec![DeviceListEntry::auto_select()]);
    }
}
