// **************************************************************************
// Copyright (c) 2024 The bpfdev developers
//
// This file is part of bpfdev
// **************************************************************************

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::io;
use std::path::PathBuf;

use crate::device::State;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The candidate could not be opened (permission denied, busy, missing, ...).
    NoAccess { path: PathBuf, source: io::Error },

    /// The candidate opened, but the OS handed back the invalid descriptor.
    NoDescriptor { path: PathBuf },

    /// Every candidate was rejected. `rejected` holds the per-candidate errors in the
    /// order the candidates were tried; it is empty when there were no candidates.
    NoDevice { rejected: Vec<Error> },

    /// The glob pattern used for enumeration is malformed.
    Pattern { pattern: String, message: String },

    /// A lifecycle probe was called on a handle in the wrong state.
    InvalidState { path: PathBuf, state: State },

    /// `close(2)` reported an error while releasing the device.
    Close { path: PathBuf, source: io::Error },
}

impl Error {
    /// Path of the candidate this error refers to, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Error::NoAccess { path, .. }
            | Error::NoDescriptor { path }
            | Error::InvalidState { path, .. }
            | Error::Close { path, .. } => Some(path),
            Error::NoDevice { .. } | Error::Pattern { .. } => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoAccess { path, .. } => {
                write!(f, "{} cannot be accessed, skipping", path.display())
            }
            Error::NoDescriptor { path } => {
                write!(f, "{} doesn't have a valid file descriptor", path.display())
            }
            Error::NoDevice { rejected } => {
                write!(f, "unable to find available bpf device")?;
                for (i, e) in rejected.iter().enumerate() {
                    let sep = if i == 0 { ": " } else { "; " };
                    write!(f, "{}{}", sep, e)?;
                }
                Ok(())
            }
            Error::Pattern { pattern, message } => {
                write!(f, "invalid device pattern '{}': {}", pattern, message)
            }
            Error::InvalidState { path, state } => {
                write!(f, "{} is in state {:?}, probe not allowed", path.display(), state)
            }
            Error::Close { path, source } => {
                write!(f, "failed closing {}: {}", path.display(), source)
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::NoAccess { source, .. } | Error::Close { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Error {
    pub(crate) fn pattern(pattern: &str, e: glob::PatternError) -> Self {
        Error::Pattern {
            pattern: pattern.to_owned(),
            message: e.to_string(),
        }
    }
}
