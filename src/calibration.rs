//! IMU calibration status and persisted offset record
//!
//! The orientation sensor reports a 0-3 calibration level for each of the
//! system, gyroscope, accelerometer, and magnetometer. Once every level hits
//! 3 the fused output is trustworthy. A 22-byte offset record (accelerometer,
//! magnetometer, gyroscope offsets) can be persisted and written back on the
//! next boot to skip live calibration.

use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Length of the persisted offset record in bytes
pub const OFFSET_RECORD_LEN: usize = 22;

/// Fixed-length calibration offset blob, as read from the sensor's offset
/// registers in configuration mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalibrationOffsets(pub [u8; OFFSET_RECORD_LEN]);

/// Per-subsystem calibration levels, each 0 (uncalibrated) to 3 (fully
/// calibrated). Levels only improve as the device is moved during a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CalibrationStatus {
    pub sys: u8,
    pub gyr: u8,
    pub acc: u8,
    pub mag: u8,
}

impl CalibrationStatus {
    /// Parse the packed calibration status register byte.
    pub fn from_register(byte: u8) -> Self {
        Self {
            sys: (byte >> 6) & 0x03,
            gyr: (byte >> 4) & 0x03,
            acc: (byte >> 2) & 0x03,
            mag: byte & 0x03,
        }
    }

    /// True iff all four levels individually equal 3.
    pub fn is_fully_calibrated(&self) -> bool {
        self.sys == 3 && self.gyr == 3 && self.acc == 3 && self.mag == 3
    }
}

/// Load the offset record if present.
///
/// Returns `Ok(None)` when the file does not exist (calibrate live). A file
/// that exists but cannot be read, or has the wrong length, is a fatal
/// persistence error requiring operator action.
pub fn load_offsets<P: AsRef<Path>>(path: P) -> Result<Option<CalibrationOffsets>> {
    let path = path.as_ref();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::Calibration(format!(
                "cannot read {}: {}. Remove the record and restart to calibrate live",
                path.display(),
                e
            )));
        }
    };

    let record: [u8; OFFSET_RECORD_LEN] = bytes.as_slice().try_into().map_err(|_| {
        Error::Calibration(format!(
            "{} is {} bytes, expected {}. Remove the record and restart to calibrate live",
            path.display(),
            bytes.len(),
            OFFSET_RECORD_LEN
        ))
    })?;

    Ok(Some(CalibrationOffsets(record)))
}

/// Persist the offset record.
pub fn store_offsets<P: AsRef<Path>>(path: P, offsets: &CalibrationOffsets) -> Result<()> {
    fs::write(path, offsets.0)?;
    Ok(())
}
