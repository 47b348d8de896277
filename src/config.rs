//! Configuration management for vcmount
//!
//! The only persisted setting is the location of the VeraCrypt executable.
//! It is kept as a bare path in a plain-text file so that configurations
//! written by earlier releases of the helper keep working.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

/// File name of the configuration inside the application-data directory
pub const CONFIG_FILE_NAME: &str = "DocsEncryptorConfig.txt";

/// Environment variable that overrides the configured executable
pub const EXECUTABLE_ENV_VAR: &str = "VCMOUNT_EXECUTABLE";

/// Persistent configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Path to the VeraCrypt executable
    pub executable: Option<PathBuf>,
}

impl Config {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Config {
            executable: Some(executable.into()),
        }
    }

    /// Default location: `<app-data>/DocsEncryptorConfig.txt`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .ok_or_else(|| Error::Config("Could not determine the application-data directory".to_string()))
    }

    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!("Error reading from configuration file: {}", e))
        })?;

        let trimmed = content.trim();
        debug!("Loaded executable path {:?} from {:?}", trimmed, path.as_ref());

        Ok(Config {
            executable: (!trimmed.is_empty()).then(|| PathBuf::from(trimmed)),
        })
    }

    /// Replace the executable with `VCMOUNT_EXECUTABLE` if it is set
    pub fn apply_env_overrides(&mut self) {
        if let Some(executable) = env_executable() {
            debug!("Executable overridden by {}", EXECUTABLE_ENV_VAR);
            self.executable = Some(executable);
        }
    }

    /// Save configuration to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Config(format!("Error updating configuration file: {}", e))
                })?;
            }
        }

        let content = self
            .executable
            .as_deref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!("Error updating configuration file: {}", e))
        })?;

        debug!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate the configuration, returning the executable path
    pub fn validate(&self) -> Result<&Path> {
        match self.executable.as_deref() {
            Some(path) if !path.as_os_str().is_empty() && path.is_file() => Ok(path),
            Some(path) => Err(Error::InvalidExecutable(path.to_path_buf())),
            None => Err(Error::InvalidExecutable(PathBuf::new())),
        }
    }
}

/// Executable named by `VCMOUNT_EXECUTABLE`, if set and non-empty
pub fn env_executable() -> Option<PathBuf> {
    let value = std::env::var(EXECUTABLE_ENV_VAR).ok()?;
    let cleaned = clean_path_input(&value);
    (!cleaned.is_empty()).then(|| PathBuf::from(cleaned))
}

/// Clean a path typed, pasted or dragged onto the console.
///
/// Surrounding whitespace goes first, then the quotes Windows adds when a
/// file with spaces in its name is dropped onto the window.
pub fn clean_path_input(input: &str) -> String {
    input.trim().trim_matches('"').to_string()
}

/// First line of a password file, without its line terminator.
///
/// Only the first line counts, so a trailing newline added by an editor is
/// never part of the password.
pub fn read_password_file<P: AsRef<Path>>(path: P) -> Result<Zeroizing<String>> {
    let content = Zeroizing::new(std::fs::read_to_string(path.as_ref()).map_err(|e| {
        Error::Config(format!("Failed to read password file: {}", e))
    })?);

    let first_line = content.lines().next().unwrap_or_default();
    Ok(Zeroizing::new(first_line.to_string()))
}
