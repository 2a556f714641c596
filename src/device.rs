// **************************************************************************
// Copyright (c) 2024 The bpfdev developers
//
// This file is part of bpfdev
// **************************************************************************

use std::fmt;
use std::fs::File;
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

use tracing::Level;

use crate::backend::{Backend, DeviceFile, OpenOptions};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};

/// Descriptor value the OS uses for "no descriptor".
pub const INVALID_DESCRIPTOR: RawFd = -1;

/// Lifecycle of a candidate device.
///
/// `Unopened -> Opened -> DescriptorValid` is the success path. A handle may be
/// rejected from `Unopened` (open failed) or from `Opened` (bad descriptor).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum State {
    #[default]
    Unopened,
    Opened,
    DescriptorValid,
    RejectedNoAccess,
    RejectedNoDescriptor,
}

/// One candidate BPF device.
///
/// Handles returned from [`acquire`](crate::acquire) are always ready: opened, with a
/// valid descriptor. The handle owns the open file; [`close`](Self::close) consumes the
/// handle, so it can be called at most once. Dropping the handle also releases the file.
pub struct DeviceHandle<F = File> {
    path: PathBuf,
    file: Option<F>,
    descriptor: Option<RawFd>,
    state: State,
    diagnostics: Diagnostics,
}

impl<F> Default for DeviceHandle<F> {
    /// The pristine handle: empty path, nothing attempted.
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            file: None,
            descriptor: None,
            state: State::Unopened,
            diagnostics: Diagnostics::disabled(),
        }
    }
}

impl<F: DeviceFile> DeviceHandle<F> {
    pub(crate) fn new(path: PathBuf, diagnostics: Diagnostics) -> Self {
        Self {
            path,
            diagnostics,
            ..Default::default()
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The validated descriptor, or [`INVALID_DESCRIPTOR`] if the handle is not ready.
    pub fn descriptor(&self) -> RawFd {
        self.descriptor.unwrap_or(INVALID_DESCRIPTOR)
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == State::DescriptorValid
    }

    pub fn file(&self) -> Option<&F> {
        self.file.as_ref()
    }

    /// Take ownership of the open file. No `closing` line is emitted for it.
    pub fn into_file(self) -> Option<F> {
        self.file
    }

    pub(crate) fn attempt_open<B>(&mut self, backend: &B, options: &OpenOptions) -> Result<()>
    where
        B: Backend<File = F>,
    {
        self.expect_state(State::Unopened)?;

        match backend.open(&self.path, options) {
            Ok(file) => {
                self.file = Some(file);
                self.state = State::Opened;
                Ok(())
            }
            Err(source) => {
                self.state = State::RejectedNoAccess;
                Err(Error::NoAccess {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    pub(crate) fn attempt_descriptor(&mut self) -> Result<()> {
        self.expect_state(State::Opened)?;

        let fd = self
            .file
            .as_ref()
            .map_or(INVALID_DESCRIPTOR, |file| file.descriptor());

        if fd != INVALID_DESCRIPTOR {
            self.descriptor = Some(fd);
            self.state = State::DescriptorValid;
            return Ok(());
        }

        // A rejected candidate must not keep its file open.
        if let Some(file) = self.file.take() {
            if let Err(e) = file.close() {
                tracing::debug!("failed releasing {}: {}", self.path.display(), e);
            }
        }
        self.state = State::RejectedNoDescriptor;
        Err(Error::NoDescriptor {
            path: self.path.clone(),
        })
    }

    /// Release the open file.
    pub fn close(self) -> Result<()> {
        self.diagnostics
            .emit(Level::DEBUG, format_args!("closing {}", self.path.display()));

        match self.file {
            Some(file) => file.close().map_err(|source| Error::Close {
                path: self.path,
                source,
            }),
            None => Ok(()),
        }
    }

    fn expect_state(&self, expected: State) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                path: self.path.clone(),
                state: self.state,
            })
        }
    }
}

impl<F: DeviceFile> AsRawFd for DeviceHandle<F> {
    fn as_raw_fd(&self) -> RawFd {
        self.descriptor()
    }
}

impl<F> fmt::Debug for DeviceHandle<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("path", &self.path)
            .field("descriptor", &self.descriptor)
            .field("state", &self.state)
            .finish()
    }
}
