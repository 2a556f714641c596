// **************************************************************************
// Copyright (c) 2024 The bpfdev developers
//
// This file is part of bpfdev
// **************************************************************************

//! Unix backend: `glob` for enumeration, `open(2)`/`close(2)` through nix.

use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, RawFd};
use std::path::{Path, PathBuf};

use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::unistd;

use super::{Access, Backend, DeviceFile, OpenOptions};
use crate::enumerator;
use crate::error::Result;

#[derive(Debug, Default, Clone, Copy)]
pub struct OsBackend;

impl OpenOptions {
    fn oflag(&self) -> OFlag {
        let mut flags = match self.get_access() {
            Access::ReadOnly => OFlag::O_RDONLY,
            Access::ReadWrite => OFlag::O_RDWR,
            Access::WriteOnly => OFlag::O_WRONLY,
        };
        if self.get_close_on_exec() {
            flags |= OFlag::O_CLOEXEC;
        }
        flags
    }
}

impl Backend for OsBackend {
    type File = File;

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        enumerator::glob_candidates(pattern)
    }

    fn open(&self, path: &Path, options: &OpenOptions) -> io::Result<File> {
        let mode = Mode::from_bits_truncate(options.get_mode() as libc::mode_t);
        let fd = fcntl::open(path, options.oflag(), mode)?;
        // `open` either fails or returns a fresh descriptor that nothing else owns
        Ok(unsafe { File::from_raw_fd(fd) })
    }
}

impl DeviceFile for File {
    fn descriptor(&self) -> RawFd {
        self.as_raw_fd()
    }

    fn close(self) -> io::Result<()> {
        unistd::close(self.into_raw_fd()).map_err(io::Error::from)
    }
}
