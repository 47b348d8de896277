//! Automatic discovery of the VeraCrypt executable

use std::path::{Path, PathBuf};
use tracing::debug;

/// Executable names, most preferred first
pub const EXECUTABLE_NAMES: [&str; 2] = ["VeraCrypt-x64.exe", "VeraCrypt.exe"];

/// Install directory name under Program Files
pub const INSTALL_DIR: &str = "VeraCrypt";

/// Environment variables naming the Program Files roots, searched in order
pub const PROGRAM_FILES_VARS: [&str; 2] = ["ProgramFiles", "ProgramFiles(x86)"];

/// Program Files roots of this system
pub fn search_roots() -> Vec<PathBuf> {
    PROGRAM_FILES_VARS
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Look for a standard VeraCrypt install under any of `roots`
pub fn find_in<P: AsRef<Path>>(roots: &[P]) -> Option<PathBuf> {
    roots.iter().find_map(|root| {
        EXECUTABLE_NAMES
            .iter()
            .map(|name| root.as_ref().join(INSTALL_DIR).join(name))
            .inspect(|candidate| debug!("Trying {:?}", candidate))
            .find(|candidate| candidate.is_file())
    })
}

/// Look for VeraCrypt in the Program Files directories
pub fn detect() -> Option<PathBuf> {
    find_in(&search_roots())
}
