//! Invocation of the VeraCrypt executable
//!
//! All mounting is done by VeraCrypt itself; this module only builds the
//! command lines, runs them to completion and interprets the result.

use crate::drive::{DriveLetter, DriveProbe};
use crate::error::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::{debug, info};
use zeroize::Zeroize;

/// Shown in place of the password when logging a command line
const REDACTED: &str = "********";

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Handle on a VeraCrypt executable
#[derive(Debug, Clone)]
pub struct VeraCrypt {
    executable: PathBuf,
}

impl VeraCrypt {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        VeraCrypt {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// `/v <volume> /l <letter> /p <password> /q /s /m rm`
    ///
    /// Quiet, silent, mounted as removable media.
    pub fn mount_args(volume: &Path, letter: DriveLetter, password: &str) -> Vec<OsString> {
        vec![
            "/v".into(),
            volume.as_os_str().to_owned(),
            "/l".into(),
            letter.as_char().to_string().into(),
            "/p".into(),
            password.into(),
            "/q".into(),
            "/s".into(),
            "/m".into(),
            "rm".into(),
        ]
    }

    /// `/d <letter> /q /s`
    pub fn unmount_args(letter: DriveLetter) -> Vec<OsString> {
        vec![
            "/d".into(),
            letter.as_char().to_string().into(),
            "/q".into(),
            "/s".into(),
        ]
    }

    /// Mount `volume` on `letter`.
    ///
    /// VeraCrypt can exit 0 without mounting anything when the user declines
    /// elevation, so success also requires the drive root to appear.
    pub fn mount<P: DriveProbe + ?Sized>(
        &self,
        volume: &Path,
        letter: DriveLetter,
        password: &str,
        probe: &P,
    ) -> Result<()> {
        info!("Mounting {:?} on {}", volume, letter);
        let output = self.run(Self::mount_args(volume, letter, password))?;

        if output.status.success() && probe.is_in_use(letter) {
            info!("Mounted {:?} on {}", volume, letter);
            Ok(())
        } else {
            Err(Error::MountFailed {
                letter,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    /// Dismount whatever is mounted on `letter`
    pub fn unmount(&self, letter: DriveLetter) -> Result<()> {
        info!("Unmounting {}", letter);
        let output = self.run(Self::unmount_args(letter))?;

        if output.status.success() {
            info!("Unmounted {}", letter);
            Ok(())
        } else {
            Err(Error::UnmountFailed {
                letter,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    /// Run VeraCrypt with `args` and wait for it to exit.
    ///
    /// `args` may hold the password, so it is wiped before returning. The
    /// copy `Command` keeps internally is freed but not wiped.
    fn run(&self, mut args: Vec<OsString>) -> Result<Output> {
        debug!("Running {:?} {}", self.executable, redact(&args));

        let mut command = Command::new(&self.executable);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let output = command.output();
        drop(command);
        wipe_args(&mut args);

        let output = output.map_err(|source| Error::Launch {
            program: self.executable.clone(),
            source,
        })?;

        debug!(
            "Exit status {:?}, stdout: {:?}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout)
        );
        Ok(output)
    }
}

/// Zero the bytes of every argument and empty the vector
fn wipe_args(args: &mut Vec<OsString>) {
    for arg in args.drain(..) {
        arg.into_encoded_bytes().zeroize();
    }
}

/// Render a command line for logging with the `/p` value masked
pub fn redact(args: &[OsString]) -> String {
    let mut rendered = Vec::with_capacity(args.len());
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            rendered.push(REDACTED.to_string());
            mask_next = false;
            continue;
        }
        mask_next = arg == "/p";
        rendered.push(format!("{:?}", arg));
    }
    rendered.join(" ")
}
