//! The interactive mount session
//!
//! One pass through the session resolves the VeraCrypt executable, asks
//! for a volume and its password, mounts it on a free drive letter, waits
//! for a key press and unmounts it again.

use crate::config::{clean_path_input, Config};
use crate::console::{Console, Key};
use crate::drive::{self, DriveLetter, DriveProbe};
use crate::error::{Error, Result};
use crate::locate;
use crate::opener::Opener;
use crate::veracrypt::VeraCrypt;
use std::path::PathBuf;
use tracing::{info, warn};
use zeroize::Zeroizing;

/// Console window title
pub const TITLE: &str = "VeraCrypt Mount Helper. Powered by VeraCrypt.";

const EXECUTABLE_PROMPT: &str = "Paste the path to the VeraCrypt executable or drag and drop the file onto the console window and press enter: ";
const VOLUME_PROMPT: &str = "Paste the path to your encrypted volume or drag and drop the file onto the console window and press enter: ";

/// Answers supplied up front instead of at the prompts
#[derive(Debug, Default)]
pub struct SessionOptions {
    /// Configuration file location
    pub config_path: PathBuf,

    /// Executable to use and save (`--executable`)
    pub executable: Option<PathBuf>,

    /// Executable to use for this run only (`VCMOUNT_EXECUTABLE`)
    pub executable_override: Option<PathBuf>,

    /// Volume to mount (`--volume`)
    pub volume: Option<PathBuf>,

    /// Preferred drive letter (`--letter`)
    pub letter: Option<DriveLetter>,

    /// Password (`--password-file`)
    pub password: Option<Zeroizing<String>>,

    /// Directories searched for a VeraCrypt install when nothing is configured
    pub search_roots: Vec<PathBuf>,
}

impl SessionOptions {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        SessionOptions {
            config_path: config_path.into(),
            search_roots: locate::search_roots(),
            ..Default::default()
        }
    }
}

/// Check a volume path entered by the user
pub fn check_volume_path(input: &str) -> Result<PathBuf> {
    let cleaned = clean_path_input(input);
    if cleaned.is_empty() {
        return Err(Error::EmptyPath);
    }
    let path = PathBuf::from(cleaned);
    if !path.is_file() {
        return Err(Error::VolumeNotFound(path));
    }
    Ok(path)
}

/// Interactive session over a console, the system drives and a file manager
pub struct Session<C, P, O> {
    console: C,
    drives: P,
    opener: O,
    options: SessionOptions,
}

impl<C: Console, P: DriveProbe, O: Opener> Session<C, P, O> {
    pub fn new(console: C, drives: P, opener: O, options: SessionOptions) -> Self {
        Session {
            console,
            drives,
            opener,
            options,
        }
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Run the whole mount, wait, unmount sequence
    pub fn run(&mut self) -> Result<()> {
        self.console.set_title(TITLE)?;

        let executable = self.resolve_executable()?;
        self.console.clear()?;

        let volume = match self.options.volume.take() {
            Some(volume) => check_volume_path(&volume.to_string_lossy())?,
            None => self.prompt_volume_path()?,
        };

        let letter = match drive::choose(self.options.letter, &self.drives) {
            Ok(letter) => letter,
            Err(Error::NoDriveAvailable) => {
                self.console
                    .write_line("Unable to find an available drive in the system to mount the file.")?;
                return Err(Error::NoDriveAvailable);
            }
            Err(e) => return Err(e),
        };
        info!("Using drive {}", letter);

        let password = match self.options.password.take() {
            Some(password) => password,
            None => self.prompt_password()?,
        };

        let veracrypt = VeraCrypt::new(executable);
        let mounted = veracrypt.mount(&volume, letter, &password, &self.drives);
        drop(password);
        if let Err(e) = mounted {
            self.report_mount_error(&e)?;
            return Err(e);
        }

        let root = letter.root();
        self.console.write_line(&format!(
            "Volume mounted successfully on drive {}",
            root.display()
        ))?;
        if let Err(e) = self.opener.open(&root) {
            warn!("Could not open {:?}: {}", root, e);
        }

        self.console
            .write_line("Press any key to unmount the volume and exit...")?;
        match self.console.read_key() {
            // Closing the input still unmounts
            Ok(_) | Err(Error::Interrupted) => {}
            Err(e) => return Err(e),
        }

        match veracrypt.unmount(letter) {
            Ok(()) => {
                self.console.write_line(&format!(
                    "Volume unmounted successfully from drive {}",
                    root.display()
                ))?;
                Ok(())
            }
            Err(e) => {
                self.console.write_line("Failed to unmount the volume.")?;
                if let Error::UnmountFailed { stderr, .. } = &e {
                    self.console.write_line(stderr)?;
                }
                Err(e)
            }
        }
    }

    /// Work out which VeraCrypt executable to use, asking if necessary
    pub fn resolve_executable(&mut self) -> Result<PathBuf> {
        if let Some(executable) = self.options.executable.take() {
            let config = Config::new(executable);
            let path = config.validate()?.to_path_buf();
            self.save_config(&config)?;
            return Ok(path);
        }

        if let Some(executable) = self.options.executable_override.take() {
            return Ok(Config::new(executable).validate()?.to_path_buf());
        }

        if self.options.config_path.exists() {
            self.confirm_configured_executable()
        } else {
            self.configure_new_executable()
        }
    }

    fn confirm_configured_executable(&mut self) -> Result<PathBuf> {
        let mut config = match Config::load(&self.options.config_path) {
            Ok(config) => config,
            Err(e) => {
                self.console.write_line(&e.user_message())?;
                Config::default()
            }
        };

        loop {
            let shown = config
                .executable
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            self.console.write_line(&format!(
                "VeraCrypt executable file is set to \"{}\".",
                shown
            ))?;
            self.console
                .write_str("Press Enter to confirm or 2 to edit the path: ")?;

            match self.console.read_key()? {
                Key::Enter => match config.validate() {
                    Ok(path) => {
                        self.console.write_line("")?;
                        return Ok(path.to_path_buf());
                    }
                    Err(_) => self
                        .console
                        .write_line("\nInvalid path. Please, try again.")?,
                },
                Key::Char('2') => {
                    self.console.write_line("")?;
                    self.console.write_line("You selected edit file.")?;
                    config = self.prompt_executable()?;
                }
                _ => self.console.write_line("\nInvalid selection.")?,
            }
        }
    }

    fn configure_new_executable(&mut self) -> Result<PathBuf> {
        if let Some(found) = locate::find_in(&self.options.search_roots) {
            info!("Found VeraCrypt at {:?}", found);
            self.save_config(&Config::new(&found))?;
            self.console.write_line(&format!(
                "VeraCrypt executable file is automatically set to \"{}\".",
                found.display()
            ))?;
            self.console.write_line("Press ENTER to continue.")?;
            self.console.read_line()?;
            return Ok(found);
        }

        self.console
            .write_line("Could not find VeraCrypt executable file automatically.")?;
        let config = self.prompt_executable()?;
        Ok(config.executable.unwrap_or_default())
    }

    /// Ask for an executable path and save it, valid or not
    fn prompt_executable(&mut self) -> Result<Config> {
        self.console.write_str(EXECUTABLE_PROMPT)?;
        let input = self.console.read_line()?;
        let config = Config::new(clean_path_input(&input));
        self.save_config(&config)?;
        Ok(config)
    }

    /// Save the configuration; failures are reported but not fatal
    fn save_config(&mut self, config: &Config) -> Result<()> {
        if let Err(e) = config.save(&self.options.config_path) {
            warn!("{}", e);
            self.console.write_line(&e.user_message())?;
        }
        Ok(())
    }

    /// Ask for a volume path until an existing file is given
    pub fn prompt_volume_path(&mut self) -> Result<PathBuf> {
        loop {
            self.console.write_str(VOLUME_PROMPT)?;
            let input = self.console.read_line()?;
            match check_volume_path(&input) {
                Ok(path) => return Ok(path),
                Err(Error::EmptyPath) => self.console.write_line("The path cannot be empty.")?,
                Err(Error::VolumeNotFound(_)) => self.console.write_line("Volume file not found.")?,
                Err(e) => return Err(e),
            }
        }
    }

    fn prompt_password(&mut self) -> Result<Zeroizing<String>> {
        self.console
            .write_line("VeraCrypt requires administrative privileges.")?;
        self.console.write_line(
            "You may see a User Account Control (UAC) prompt after you enter the password.",
        )?;
        self.console.write_line("")?;
        self.console
            .write_str("Enter the password for the VeraCrypt volume: ")?;
        self.console.read_password()
    }

    fn report_mount_error(&mut self, error: &Error) -> Result<()> {
        match error {
            Error::Launch { source, .. } => {
                self.console.write_line(
                    "The specified executable is not a valid. Please, restart the program and configure a VeraCrypt executable.\n",
                )?;
                self.console.write_line(&source.to_string())?;
            }
            Error::MountFailed { .. } => {
                self.console
                    .write_line("VeraCrypt encountered an error. Possible reasons include:")?;
                self.console
                    .write_line("- VeraCrypt was not run with administrative privileges.")?;
                self.console.write_line("- Incorrect password for the file.")?;
                self.console
                    .write_line("- Provided file is not a VeraCrypt volume.")?;
            }
            _ => {}
        }
        Ok(())
    }
}
