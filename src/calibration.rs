//! Radio calibration staging.
//!
//! The calibration blob is unpacked from the hard config into a temporary buffer
//! owned by a [`CalibrationSource`]. [`StagedCalibration`] holds it for as long as
//! the radio descriptor needs it and hands it back when dropped.

use crate::board::CalibrationWindow;
use crate::devices::RadioDescriptor;
use crate::mac::MacAddress;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// The staged blob ends before the EEPROM window does.
    Truncated { len: usize },
}

pub trait CalibrationSource {
    /// Stages the blob. Returns `false`, with nothing staged, when the bootloader carries none.
    fn acquire(&mut self) -> bool;

    /// The staged blob. Only called between a successful `acquire` and `release`.
    fn data(&self) -> &[u8];

    /// Frees the staged blob.
    fn release(&mut self);
}

/// A staged calibration blob, released exactly once when this goes out of scope.
pub struct StagedCalibration<'a> {
    source: &'a mut dyn CalibrationSource,
}

impl<'a> StagedCalibration<'a> {
    pub fn acquire(source: &'a mut dyn CalibrationSource) -> Option<Self> {
        if !source.acquire() {
            return None;
        }
        Some(Self { source })
    }

    pub fn data(&self) -> &[u8] {
        self.source.data()
    }
}

impl Drop for StagedCalibration<'_> {
    fn drop(&mut self) {
        trace!("calibration: release");
        self.source.release();
    }
}

/// Radio descriptor for interface `index`: its derived MAC plus the EEPROM window of `blob`.
pub fn extract<'b>(
    blob: &'b [u8],
    base_mac: MacAddress,
    index: u8,
    window: CalibrationWindow,
) -> Result<RadioDescriptor<'b>, CalibrationError> {
    let eeprom = window
        .offset
        .checked_add(window.len)
        .and_then(|end| blob.get(window.offset..end))
        .ok_or(CalibrationError::Truncated { len: blob.len() })?;

    Ok(RadioDescriptor {
        mac: base_mac.derive(index),
        eeprom,
    })
}
