//! Test utilities for Strata development.
//!
//! Provides fixture containers ([`fixtures::polycrystal`],
//! [`fixtures::dual_phase`]), a deterministic [`SteppingClock`] for
//! provenance stamps, and a [`RecordingEncoder`] that captures what
//! [`Results::export`](strata_result::Results::export) hands to a file
//! format.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset};
use indexmap::IndexMap;
use strata_core::Dataset;
use strata_result::{Clock, ExportMode, Grid, GridEncoder};

/// A clock that advances by a fixed step on every reading.
///
/// Two stamps taken through it always differ, so tests can tell a
/// rewritten dataset from a kept one.
#[derive(Debug)]
pub struct SteppingClock {
    next: Mutex<DateTime<FixedOffset>>,
    step: Duration,
}

impl SteppingClock {
    /// Start at `start`, advancing one second per reading.
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            next: Mutex::new(start),
            step: Duration::seconds(1),
        }
    }

    /// Start at 2024-01-01 00:00:00 UTC.
    pub fn epoch() -> Self {
        let start = DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00")
            .expect("valid timestamp literal");
        Self::new(start)
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let mut next = self.next.lock().unwrap_or_else(|p| p.into_inner());
        let now = *next;
        *next = now + self.step;
        now
    }
}

/// One [`GridEncoder::encode`] call as seen by [`RecordingEncoder`].
#[derive(Clone, Debug)]
pub struct Encoded {
    pub path: PathBuf,
    pub points: usize,
    pub mode: ExportMode,
    pub arrays: IndexMap<String, Dataset>,
}

/// Encoder that records every call and writes the array names to `path`.
#[derive(Clone, Debug)]
pub struct RecordingEncoder {
    pub extension: String,
    pub single: bool,
    pub calls: Vec<Encoded>,
}

impl RecordingEncoder {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            single: false,
            calls: Vec::new(),
        }
    }

    /// An encoder whose files hold a single increment.
    pub fn single_file(extension: impl Into<String>) -> Self {
        Self {
            single: true,
            ..Self::new(extension)
        }
    }
}

impl GridEncoder for RecordingEncoder {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn single_increment(&self) -> bool {
        self.single
    }

    fn encode(
        &mut self,
        path: &Path,
        grid: &Grid,
        mode: ExportMode,
        arrays: &IndexMap<String, Dataset>,
    ) -> io::Result<()> {
        let listing: Vec<&str> = arrays.keys().map(String::as_str).collect();
        fs::write(path, listing.join("\n"))?;
        self.calls.push(Encoded {
            path: path.to_path_buf(),
            points: grid.points(),
            mode,
            arrays: arrays.clone(),
        });
        Ok(())
    }
}
