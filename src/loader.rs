//! Loading the instruction and data images from disk.
//!
//! This is the "external collaborator" spec.md §1 excludes from the core:
//! argument parsing and file I/O live here, separate from `hart`, so the
//! execution engine itself never touches the filesystem.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::memory::DATA_MEM_SIZE;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("data image is {size} bytes, exceeds the {limit}-byte data memory")]
    DataImageTooLarge { size: usize, limit: usize },
}

/// Read the instruction image verbatim. Length in bytes determines the
/// instruction memory length (spec.md §6); no header, no validation.
pub fn load_instruction_image(path: impl AsRef<Path>) -> Result<Vec<u8>, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    log::info!(
        "loaded instruction image {} ({} bytes)",
        path.display(),
        bytes.len()
    );
    Ok(bytes)
}

/// Read the data image. Must be no larger than the fixed 4 MiB data memory
/// (spec.md §6); the bytes are copied verbatim into its low addresses by
/// `crate::memory::DataMemory::new`.
pub fn load_data_image(path: impl AsRef<Path>) -> Result<Vec<u8>, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    if bytes.len() > DATA_MEM_SIZE {
        return Err(LoadError::DataImageTooLarge {
            size: bytes.len(),
            limit: DATA_MEM_SIZE,
        });
    }
    log::info!(
        "loaded data image {} ({} bytes)",
        path.display(),
        bytes.len()
    );
    Ok(bytes)
}
