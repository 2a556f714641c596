// **************************************************************************
// Copyright (c) 2024 The bpfdev developers
//
// This file is part of bpfdev
// **************************************************************************

//! Locate and open the first available BPF (Berkeley Packet Filter) character device.
//!
//! Candidates are found by expanding `/dev/bpf*`. Each one is opened read-write and its
//! file descriptor is checked; the first candidate passing both checks is returned.
//! No ioctl configuration or packet I/O is done here.
//!
//! # Usage
//!
//! ```no_run
//! let device = bpfdev::acquire(true)?;
//! println!("opened {} as fd {}", device.path().display(), device.descriptor());
//! device.close()?;
//! # Ok::<(), bpfdev::Error>(())
//! ```
//!
//! Diagnostics (`using <path>`, `closing <path>` and one line per rejected candidate)
//! are emitted through `tracing` with target [`LOG_TARGET`], or through a custom
//! [`LogSink`] installed with [`Acquirer::diagnostics`].

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

use cfg_if::cfg_if;

/// Module identifier attached to every diagnostic line.
pub const LOG_TARGET: &str = "bpfdev::device";

cfg_if! {
    if #[cfg(unix)] {
        mod acquire;
        mod backend;
        mod device;
        mod diagnostics;
        mod enumerator;
        mod error;

        pub use acquire::{acquire, Acquirer};
        pub use backend::{Access, Backend, DeviceFile, OpenOptions, OsBackend};
        pub use device::{DeviceHandle, State, INVALID_DESCRIPTOR};
        pub use diagnostics::{Diagnostics, LogSink, TracingSink};
        pub use enumerator::{glob_candidates, DEFAULT_PATTERN};
        pub use error::{Error, Result};
        pub use tracing::Level;
    } else {
        compile_error!("bpfdev requires a unix target with /dev/bpf* devices");
    }
}
