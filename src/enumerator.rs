// **************************************************************************
// Copyright (c) 2024 The bpfdev developers
//
// This file is part of bpfdev
// **************************************************************************

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default glob for BPF device nodes.
pub const DEFAULT_PATTERN: &str = "/dev/bpf*";

/// Expand `pattern` into the list of candidate device paths.
///
/// Paths are returned in the order `glob` yields them; no re-sorting happens here.
/// No matches is an empty list, not an error.
pub fn glob_candidates(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|e| Error::pattern(pattern, e))?;

    let candidates = paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::trace!(
                    "skipping unreadable entry {}: {}",
                    e.path().display(),
                    e.error()
                );
                None
            }
        })
        .collect();

    Ok(candidates)
}
