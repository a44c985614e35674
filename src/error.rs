//! Error types for the Romi control stack

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Control stack error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file or value error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A state machine reached a state value with no matching transition.
    /// This is a programming defect, not a runtime condition to recover from.
    #[error("Invalid state {state} in task '{task}'")]
    InvalidState {
        /// Name of the task whose state machine failed
        task: &'static str,
        /// The offending state or sub-step value
        state: u8,
    },

    /// Calibration record present but unusable; requires operator action
    #[error("Calibration error: {0}")]
    Calibration(String),

    /// Orientation sensor fault
    #[error("IMU error: {0}")]
    Imu(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
