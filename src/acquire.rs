// **************************************************************************
// Copyright (c) 2024 The bpfdev developers
//
// This file is part of bpfdev
// **************************************************************************

use tracing::Level;

use crate::backend::{Backend, OpenOptions, OsBackend};
use crate::device::DeviceHandle;
use crate::diagnostics::Diagnostics;
use crate::enumerator::DEFAULT_PATTERN;
use crate::error::{Error, Result};

/// Open the first available BPF device under `/dev/bpf*`.
///
/// With `logging` set, diagnostics are emitted as `tracing` events under
/// [`LOG_TARGET`](crate::LOG_TARGET). Logging never changes the outcome.
pub fn acquire(logging: bool) -> Result<DeviceHandle> {
    Acquirer::new().logging(logging).acquire()
}

/// Configurable device acquisition.
///
/// ```no_run
/// use bpfdev::{Acquirer, OpenOptions};
///
/// let device = Acquirer::new()
///     .options(OpenOptions::new().mode(0o600))
///     .logging(true)
///     .acquire()?;
/// println!("{} -> fd {}", device.path().display(), device.descriptor());
/// device.close()?;
/// # Ok::<(), bpfdev::Error>(())
/// ```
#[derive(Debug)]
pub struct Acquirer<B = OsBackend> {
    backend: B,
    pattern: String,
    options: OpenOptions,
    diagnostics: Diagnostics,
}

impl Acquirer<OsBackend> {
    pub fn new() -> Self {
        Self::with_backend(OsBackend)
    }
}

impl Default for Acquirer<OsBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Acquirer<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            pattern: DEFAULT_PATTERN.to_owned(),
            options: OpenOptions::default(),
            diagnostics: Diagnostics::disabled(),
        }
    }

    /// Glob used to enumerate candidates. Defaults to `/dev/bpf*`.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn options(mut self, options: OpenOptions) -> Self {
        self.options = options;
        self
    }

    /// Route diagnostics to `tracing` (`true`) or drop them (`false`).
    pub fn logging(mut self, enabled: bool) -> Self {
        self.diagnostics = Diagnostics::from_flag(enabled);
        self
    }

    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Try every candidate once, in enumeration order, and return the first ready one.
    ///
    /// A malformed pattern fails immediately with [`Error::Pattern`]. When no candidate
    /// can be used, [`Error::NoDevice`] carries the reason each one was rejected.
    pub fn acquire(&self) -> Result<DeviceHandle<B::File>> {
        let candidates = self.backend.glob(&self.pattern)?;
        let mut rejected = Vec::new();

        for path in candidates {
            let mut device = DeviceHandle::new(path, self.diagnostics.clone());

            if let Err(e) = device.attempt_open(&self.backend, &self.options) {
                self.reject(e, &mut rejected);
                continue;
            }

            if let Err(e) = device.attempt_descriptor() {
                self.reject(e, &mut rejected);
                continue;
            }

            self.diagnostics
                .emit(Level::INFO, format_args!("using {}", device.path().display()));
            return Ok(device);
        }

        Err(Error::NoDevice { rejected })
    }

    fn reject(&self, e: Error, rejected: &mut Vec<Error>) {
        self.diagnostics.emit(Level::WARN, format_args!("{}", e));
        rejected.push(e);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::fake::{Behavior, FakeBackend};
    use crate::device::{State, INVALID_DESCRIPTOR};
    use crate::diagnostics::test::Recorder;
    use std::path::Path;

    fn acquirer(backend: FakeBackend) -> Acquirer<FakeBackend> {
        Acquirer::with_backend(backend)
    }

    #[test]
    fn test_skips_denied_device() {
        let a = acquirer(FakeBackend::new(&[
            ("/dev/bpf0", Behavior::Deny(libc::EACCES)),
            ("/dev/bpf1", Behavior::Open(5)),
        ]));

        let device = a.acquire().unwrap();
        assert_eq!(device.path(), Path::new("/dev/bpf1"));
        assert_eq!(device.descriptor(), 5);
        assert_eq!(device.state(), State::DescriptorValid);
    }

    #[test]
    fn test_first_success_wins() {
        let a = acquirer(FakeBackend::new(&[
            ("/dev/bpfA", Behavior::Deny(libc::EBUSY)),
            ("/dev/bpfB", Behavior::Open(4)),
            ("/dev/bpfC", Behavior::Open(6)),
        ]));

        let device = a.acquire().unwrap();
        assert_eq!(device.path(), Path::new("/dev/bpfB"));
        assert_eq!(a.backend.opens("/dev/bpfA"), 1);
        assert_eq!(a.backend.opens("/dev/bpfB"), 1);
        assert_eq!(a.backend.opens("/dev/bpfC"), 0);
    }

    #[test]
    fn test_no_candidates() {
        let rec = Recorder::default();
        let a = acquirer(FakeBackend::new(&[])).diagnostics(rec.diagnostics());

        match a.acquire() {
            Err(Error::NoDevice { rejected }) => assert!(rejected.is_empty()),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(rec.messages().iter().all(|m| !m.contains("using")));
        assert_eq!(a.backend.total_opens(), 0);
    }

    #[test]
    fn test_all_candidates_rejected() {
        let a = acquirer(FakeBackend::new(&[
            ("/dev/bpf0", Behavior::Deny(libc::EACCES)),
            ("/dev/bpf1", Behavior::Open(INVALID_DESCRIPTOR)),
            ("/dev/bpf2", Behavior::Deny(libc::EBUSY)),
        ]));

        let rejected = match a.acquire() {
            Err(Error::NoDevice { rejected }) => rejected,
            other => panic!("unexpected result: {:?}", other),
        };

        assert_eq!(rejected.len(), 3);
        assert!(matches!(rejected[0], Error::NoAccess { .. }));
        assert!(matches!(rejected[1], Error::NoDescriptor { .. }));
        assert!(matches!(rejected[2], Error::NoAccess { .. }));
        for path in ["/dev/bpf0", "/dev/bpf1", "/dev/bpf2"] {
            assert_eq!(a.backend.opens(path), 1);
        }
        // The file behind the invalid descriptor was released.
        assert_eq!(a.backend.closes.get(), 1);
    }

    #[test]
    fn test_malformed_pattern_fails_fast() {
        let a = acquirer(FakeBackend::new(&[("/dev/bpf0", Behavior::Open(3))]))
            .pattern("/dev/[bpf");

        assert!(matches!(a.acquire(), Err(Error::Pattern { .. })));
        assert_eq!(a.backend.total_opens(), 0);
    }

    #[test]
    fn test_logging_does_not_change_outcome() {
        let candidates = [
            ("/dev/bpf0", Behavior::Deny(libc::EACCES)),
            ("/dev/bpf1", Behavior::Open(INVALID_DESCRIPTOR)),
            ("/dev/bpf2", Behavior::Open(8)),
        ];
        let rec = Recorder::default();

        let quiet = acquirer(FakeBackend::new(&candidates)).acquire().unwrap();
        let loud = acquirer(FakeBackend::new(&candidates))
            .diagnostics(rec.diagnostics())
            .acquire()
            .unwrap();

        assert_eq!(quiet.path(), loud.path());
        assert_eq!(quiet.descriptor(), loud.descriptor());

        loud.close().unwrap();
        assert_eq!(
            rec.messages(),
            [
                "bpfdev::device: /dev/bpf0 cannot be accessed, skipping",
                "bpfdev::device: /dev/bpf1 doesn't have a valid file descriptor",
                "bpfdev::device: using /dev/bpf2",
                "bpfdev::device: closing /dev/bpf2",
            ]
        );
    }

    #[test]
    fn test_every_line_carries_target() {
        let rec = Recorder::default();
        let a = acquirer(FakeBackend::new(&[
            ("/dev/bpf0", Behavior::Deny(libc::EBUSY)),
            ("/dev/bpf1", Behavior::Open(3)),
        ]))
        .diagnostics(rec.diagnostics());

        a.acquire().unwrap().close().unwrap();

        let messages = rec.messages();
        assert_eq!(messages.len(), 3);
        for m in &messages {
            assert!(m.starts_with(crate::LOG_TARGET), "missing target: {}", m);
        }
        assert_eq!(messages[1], "bpfdev::device: using /dev/bpf1");
    }

    #[test]
    fn test_log_levels() {
        let rec = Recorder::default();
        let a = acquirer(FakeBackend::new(&[
            ("/dev/bpf0", Behavior::Deny(libc::EACCES)),
            ("/dev/bpf1", Behavior::Open(3)),
        ]))
        .diagnostics(rec.diagnostics());

        a.acquire().unwrap().close().unwrap();

        let levels: Vec<Level> = rec.lines.lock().unwrap().iter().map(|(l, _)| *l).collect();
        assert_eq!(levels, [Level::WARN, Level::INFO, Level::DEBUG]);
    }

    #[test]
    fn test_os_backend_with_temp_devices() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::File::create(dir.path().join("bpf0")).unwrap();
        std::fs::File::create(dir.path().join("bpf1")).unwrap();
        let pattern = format!(
            "{}/bpf*",
            glob::Pattern::escape(dir.path().to_str().unwrap())
        );

        let device = Acquirer::new().pattern(pattern).acquire().unwrap();
        assert_eq!(device.path(), dir.path().join("bpf0"));
        assert!(device.descriptor() >= 0);
        device.close().unwrap();
    }

    #[test]
    fn test_os_backend_no_devices() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!(
            "{}/bpf*",
            glob::Pattern::escape(dir.path().to_str().unwrap())
        );

        let err = Acquirer::new().pattern(pattern).logging(true).acquire().unwrap_err();
        assert_eq!(err.to_string(), "unable to find available bpf device");
    }
}
