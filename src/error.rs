//! Error types for vcmount

use crate::drive::DriveLetter;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vcmount
#[derive(Error, Debug)]
pub enum Error {
    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid VeraCrypt executable: {}", .0.display())]
    InvalidExecutable(PathBuf),

    // Input errors
    #[error("The path cannot be empty")]
    EmptyPath,

    #[error("Volume file not found: {}", .0.display())]
    VolumeNotFound(PathBuf),

    // Drive errors
    #[error("Invalid drive letter: {0:?}")]
    InvalidDriveLetter(char),

    #[error("Drive {0} is reserved")]
    ReservedDriveLetter(DriveLetter),

    #[error("Drive {0} is already in use")]
    DriveInUse(DriveLetter),

    #[error("Unable to find an available drive in the system to mount the file")]
    NoDriveAvailable,

    // Subprocess errors
    #[error("Failed to launch {}: {source}", .program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Mounting on drive {letter} failed (exit code {code:?})")]
    MountFailed {
        letter: DriveLetter,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Unmounting drive {letter} failed (exit code {code:?}): {stderr}")]
    UnmountFailed {
        letter: DriveLetter,
        code: Option<i32>,
        stderr: String,
    },

    // Console errors
    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("Interrupted")]
    Interrupted,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Message for the console, without the category prefix `Display` adds
    pub fn user_message(&self) -> String {
        match self {
            Error::Config(msg) | Error::Terminal(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Whether the user can fix this by answering a prompt again
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::EmptyPath
                | Error::VolumeNotFound(_)
                | Error::InvalidExecutable(_)
                | Error::InvalidDriveLetter(_)
                | Error::ReservedDriveLetter(_)
                | Error::DriveInUse(_)
        )
    }
}
