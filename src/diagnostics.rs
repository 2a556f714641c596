// **************************************************************************
// Copyright (c) 2024 The bpfdev developers
//
// This file is part of bpfdev
// **************************************************************************

//! Optional diagnostic output for the acquisition process.
//!
//! Three kinds of lines are emitted: `using <path>` once a device was selected,
//! `closing <path>` when a handle is closed, and the display form of every
//! per-candidate rejection. Emitting is fire-and-forget.

use std::fmt;
use std::sync::Arc;

use tracing::Level;

use crate::LOG_TARGET;

/// Receiver of diagnostic lines.
///
/// `target` is always [`LOG_TARGET`]. Sinks writing plain text are expected to print
/// it in front of the message, as in `bpfdev::device: using /dev/bpf0`.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, target: &str, message: &str);
}

impl<F> LogSink for F
where
    F: Fn(Level, &str, &str) + Send + Sync,
{
    fn log(&self, level: Level, target: &str, message: &str) {
        self(level, target, message)
    }
}

/// Forwards diagnostics as `tracing` events with target [`LOG_TARGET`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, _target: &str, message: &str) {
        // `event!` needs the level and target as constants
        match level {
            Level::ERROR => tracing::error!(target: LOG_TARGET, "{}", message),
            Level::WARN => tracing::warn!(target: LOG_TARGET, "{}", message),
            Level::INFO => tracing::info!(target: LOG_TARGET, "{}", message),
            Level::DEBUG => tracing::debug!(target: LOG_TARGET, "{}", message),
            Level::TRACE => tracing::trace!(target: LOG_TARGET, "{}", message),
        }
    }
}

/// Logging switch carried by the orchestrator and every device handle.
///
/// The default value is disabled. Enabling or disabling diagnostics never changes
/// the outcome of an acquisition.
#[derive(Clone, Default)]
pub struct Diagnostics {
    sink: Option<Arc<dyn LogSink>>,
}

impl Diagnostics {
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Diagnostics routed to `tracing`.
    pub fn tracing() -> Self {
        Self::with_sink(TracingSink)
    }

    pub fn with_sink<S: LogSink + 'static>(sink: S) -> Self {
        Self {
            sink: Some(Arc::new(sink)),
        }
    }

    pub fn from_flag(enabled: bool) -> Self {
        if enabled {
            Self::tracing()
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub(crate) fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        if let Some(sink) = &self.sink {
            sink.log(level, LOG_TARGET, &args.to_string());
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
