//! Drive-letter allocation
//!
//! Volumes are mounted on a Windows drive letter. `A` and `B` are kept
//! back for floppy drives and are never handed out; every other letter is
//! available unless something is already mounted there.

use crate::error::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Letters never used for mounting
pub const RESERVED_LETTERS: [char; 2] = ['A', 'B'];

/// An upper-case drive letter `A`-`Z`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriveLetter(char);

impl DriveLetter {
    /// Create a drive letter, normalising to upper case
    pub fn new(c: char) -> Result<Self> {
        if c.is_ascii_alphabetic() {
            Ok(DriveLetter(c.to_ascii_uppercase()))
        } else {
            Err(Error::InvalidDriveLetter(c))
        }
    }

    /// Iterate over all letters `A` through `Z`
    pub fn all() -> impl Iterator<Item = DriveLetter> {
        ('A'..='Z').map(DriveLetter)
    }

    pub fn as_char(self) -> char {
        self.0
    }

    pub fn is_reserved(self) -> bool {
        RESERVED_LETTERS.contains(&self.0)
    }

    /// Root directory of the drive, e.g. `M:\`
    pub fn root(self) -> PathBuf {
        PathBuf::from(format!("{}:\\", self.0))
    }
}

impl fmt::Display for DriveLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.0)
    }
}

impl std::str::FromStr for DriveLetter {
    type Err = Error;

    /// Accepts `M`, `m`, `M:` and `M:\`
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_end_matches('\\').trim_end_matches(':');
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => DriveLetter::new(c),
            (Some(c), Some(_)) => Err(Error::InvalidDriveLetter(c)),
            (None, _) => Err(Error::InvalidDriveLetter(' ')),
        }
    }
}

/// Answers whether a drive letter is currently occupied
pub trait DriveProbe {
    fn is_in_use(&self, letter: DriveLetter) -> bool;
}

/// Probes the drives of the running system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDrives;

impl DriveProbe for SystemDrives {
    fn is_in_use(&self, letter: DriveLetter) -> bool {
        let in_use = letter.root().exists();
        debug!("Drive {} in use: {}", letter, in_use);
        in_use
    }
}

/// Find the first letter that is neither reserved nor in use
pub fn first_available<P: DriveProbe + ?Sized>(probe: &P) -> Option<DriveLetter> {
    DriveLetter::all().find(|letter| !letter.is_reserved() && !probe.is_in_use(*letter))
}

/// Validate a preferred letter, or fall back to the first free one
pub fn choose<P: DriveProbe + ?Sized>(
    preferred: Option<DriveLetter>,
    probe: &P,
) -> Result<DriveLetter> {
    match preferred {
        Some(letter) if letter.is_reserved() => Err(Error::ReservedDriveLetter(letter)),
        Some(letter) if probe.is_in_use(letter) => Err(Error::DriveInUse(letter)),
        Some(letter) => Ok(letter),
        None => first_available(probe).ok_or(Error::NoDriveAvailable),
    }
}
