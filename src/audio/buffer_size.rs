//! Buffer size options expressed in bursts
//!
//! A burst is the stream's fundamental block size. The buffer depth the
//! user can pick is a multiple of it, or "automatic" to leave the stream's
//! own choice in place.

use std::fmt;

use crate::error::AudioError;

/// Values offered to the user, in display order. `0` means automatic.
pub const BUFFER_SIZE_OPTIONS: [i32; 5] = [0, 1, 2, 4, 8];

/// Description shown for the automatic option
pub const AUTOMATIC_DESCRIPTION: &str = "Automatic";

/// Requested buffer size for the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferSizeOption {
    /// Let the stream pick its own buffer size
    #[default]
    Automatic,
    /// Buffer holds this many bursts (1, 2, 4 or 8)
    Bursts(u32),
}

impl BufferSizeOption {
    /// Parse the numeric value used on the façade.
    ///
    /// # Errors
    /// Returns `AudioError::InvalidBufferSize` for anything other than
    /// 0, 1, 2, 4 or 8.
    pub fn from_bursts(bursts: i32) -> Result<Self, AudioError> {
        match bursts {
            0 => Ok(BufferSizeOption::Automatic),
            1 | 2 | 4 | 8 => Ok(BufferSizeOption::Bursts(bursts as u32)),
            _ => Err(AudioError::InvalidBufferSize { bursts }),
        }
    }

    /// Numeric value as passed through the façade.
    pub fn value(&self) -> i32 {
        match self {
            BufferSizeOption::Automatic => 0,
            BufferSizeOption::Bursts(n) => *n as i32,
        }
    }

    /// Text for the picker. Equal to the value, except for automatic.
    pub fn description(&self) -> String {
        match self {
            BufferSizeOption::Automatic => AUTOMATIC_DESCRIPTION.to_string(),
            BufferSizeOption::Bursts(n) => n.to_string(),
        }
    }

    /// Buffer size in frames, or `None` when the stream should decide.
    pub fn frames(&self, frames_per_burst: u32) -> Option<u32> {
        match self {
            BufferSizeOption::Automatic => None,
            BufferSizeOption::Bursts(n) => Some(n.saturating_mul(frames_per_burst)),
        }
    }
}

impl fmt::Display for BufferSizeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// All offered options, in display order.
pub fn buffer_size_options() -> Vec<BufferSizeOption> {
    BUFFER_SIZE_OPTIONS
        .iter()
        .filter_map(|&v| BufferSizeOption::from_bursts(v).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offered_options_in_order() {
        let values: Vec<i32> = buffer_size_options().iter().map(|o| o.value()).collect();
        assert_eq!(values, vec![0, 1, 2, 4, 8]);
    }

    #[test]
    fn test_descriptions() {
        let descriptions: Vec<String> = buffer_size_options()
            .iter()
            .map(|o| o.description())
            .collect();
        assert_eq!(descriptions, vec!["Automatic", "1", "2", "4", "8"]);
    }

    #[test]
    fn test_rejects_unrecognised_bursts() {
        for bad in [-1, 3, 5, 16] {
            assert_eq!(
                BufferSizeOption::from_bursts(bad),
                Err(AudioError::InvalidBufferSize { bursts: bad })
            );
        }
    }

    #[test]
    fn test_frames_from_bursts() {
        assert_eq!(BufferSizeOption::Automatic.frames(192), None);
        assert_eq!(BufferSizeOption::Bursts(1).frames(192), Some(192));
        assert_eq!(BufferSizeOption::Bursts(8).frames(192), Some(1536));
    }
}
