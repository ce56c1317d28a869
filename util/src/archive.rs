//! Struct archiving functionality
//!
//! Modules archive their data by holding an `Archiver` opened on a path
//! inside the session's archive root and serialising records into it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::Path;

// Internal imports
use crate::session::{get_elapsed_seconds, Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>,
}

#[derive(Serialize)]
struct Record<T: Serialize> {
    time_s: f64,
    data: T,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session,
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut session_path = session.arch_root.clone();
        session_path.push(path);

        // Create the parent directory if it doesn't exist yet
        if let Some(parent) = session_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Create the file if it does not exist
        std::fs::File::create(session_path.clone())?;

        // Open the file in append mode
        let file = match OpenOptions::new().append(true).open(session_path) {
            Ok(f) => f,
            Err(e) => return Err(Box::new(e)),
        };

        let w = WriterBuilder::new().has_headers(true).from_writer(file);

        Ok(Self { writer: Some(w) })
    }

    /// Serialise the given data into the archive, stamped with the session
    /// elapsed time.
    pub fn serialise<T: Serialize>(&mut self, data: T) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(ref mut writer) = self.writer {
            writer.serialize(Record {
                time_s: get_elapsed_seconds(),
                data,
            })?;
            writer.flush()?;
        }

        Ok(())
    }
}
