//! vcmount - Interactive VeraCrypt mount helper
//!
//! This library locates a VeraCrypt executable, asks for a volume and its
//! password, and has VeraCrypt mount the volume on a free drive letter and
//! unmount it again. All encryption and mounting is done by VeraCrypt.

pub mod config;
pub mod console;
pub mod drive;
pub mod error;
pub mod locate;
pub mod opener;
pub mod session;
pub mod veracrypt;

#[cfg(test)]
mod test_helpers;

pub use config::Config;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::drive::DriveLetter;
    pub use crate::error::{Error, Result};
    pub use crate::session::{Session, SessionOptions};
    pub use crate::veracrypt::VeraCrypt;
}
