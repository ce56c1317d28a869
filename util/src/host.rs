//! Host environment utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::env;
use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable giving the root of the software installation.
///
/// Parameter files and session directories are resolved relative to this root.
pub const SW_ROOT_ENV_VAR: &str = "SHOOTER_SW_ROOT";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with the host environment.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root environment variable (SHOOTER_SW_ROOT) is not set")]
    SwRootNotSet,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the root directory of the software installation.
pub fn get_shooter_sw_root() -> Result<PathBuf, HostError> {
    match env::var(SW_ROOT_ENV_VAR) {
        Ok(v) => Ok(PathBuf::from(v)),
        Err(_) => Err(HostError::SwRootNotSet),
    }
}
