/*
 *  display/error.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for the display subsystem
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use thiserror::Error;

/// Unified error type for all display operations
///
/// The render core itself performs no I/O, so most variants surface either at
/// construction time (bad configuration, impossible layouts) or from a sink.
#[derive(Debug, Error)]
pub enum DisplayError {
    /// Invalid configuration, fatal at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Fixed row slots do not fit the viewport
    #[error("Layout error: fixed slots need {required}px but the row is {available}px wide")]
    Layout { required: u32, available: u32 },

    /// Frame size does not match the sink
    #[error("Frame size mismatch: sink is {expected:?}, frame is {actual:?}")]
    FrameSizeMismatch { expected: (u32, u32), actual: (u32, u32) },

    /// Display sink refused or failed a frame
    #[error("Sink error: {0}")]
    Sink(String),

    /// I/O error from a file backed sink
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DisplayError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        DisplayError::InvalidConfiguration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_error_message() {
        let err = DisplayError::Layout { required: 300, available: 256 };
        assert_eq!(
            err.to_string(),
            "Layout error: fixed slots need 300px but the row is 256px wide"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "gone");
        let err: DisplayError = io.into();
        assert!(matches!(err, DisplayError::Io(_)));
    }
}
