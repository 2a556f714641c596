// **************************************************************************
// Copyright (c) 2024 The bpfdev developers
//
// This file is part of bpfdev
// **************************************************************************

//! OS seam: the glob primitive used for enumeration and the open primitive used
//! to probe candidates.

use std::io;
use std::os::fd::RawFd;
use std::path::{Path, PathBuf};

use cfg_if::cfg_if;

use crate::error::Result;

cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use self::unix::OsBackend;
    }
}

/// The access mode a candidate is opened with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
    WriteOnly,
}

/// Parameters passed to the open primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenOptions {
    access: Access,
    mode: u32,
    close_on_exec: bool,
}

impl Default for OpenOptions {
    /// Read-write, `0o666`, close-on-exec.
    fn default() -> Self {
        Self {
            access: Access::ReadWrite,
            mode: 0o666,
            close_on_exec: true,
        }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    /// Permission bits handed to `open(2)`.
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn close_on_exec(mut self, close_on_exec: bool) -> Self {
        self.close_on_exec = close_on_exec;
        self
    }

    pub fn get_access(&self) -> Access {
        self.access
    }

    pub fn get_mode(&self) -> u32 {
        self.mode
    }

    pub fn get_close_on_exec(&self) -> bool {
        self.close_on_exec
    }
}

/// An open-file resource owned by a device handle.
pub trait DeviceFile {
    /// The raw descriptor as reported by the OS, `-1` when invalid.
    fn descriptor(&self) -> RawFd;

    /// Release the resource, reporting errors from the OS.
    fn close(self) -> io::Result<()>;
}

pub trait Backend {
    type File: DeviceFile;

    /// Expand `pattern` into candidate paths, in the order the primitive yields them.
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>>;

    fn open(&self, path: &Path, options: &OpenOptions) -> io::Result<Self::File>;
}
