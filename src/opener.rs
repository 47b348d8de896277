//! Showing a mounted drive in the platform file manager

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Something that can present a directory to the user
pub trait Opener {
    fn open(&self, path: &Path) -> Result<()>;
}

/// Explorer on Windows, Finder on macOS, `xdg-open` elsewhere
#[derive(Debug, Default, Clone, Copy)]
pub struct FileManager;

impl FileManager {
    fn program() -> &'static str {
        if cfg!(windows) {
            "explorer.exe"
        } else if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        }
    }
}

impl Opener for FileManager {
    fn open(&self, path: &Path) -> Result<()> {
        let program = Self::program();
        debug!("Opening {:?} with {}", path, program);

        // The file manager outlives us, so it is not waited on
        Command::new(program)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| Error::Launch {
                program: PathBuf::from(program),
                source,
            })?;
        Ok(())
    }
}

/// Does nothing; used for `--no-open`
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpen;

impl Opener for NoOpen {
    fn open(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}
