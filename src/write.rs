use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use crate::binary;
use crate::profile::Profile;
use crate::recorder::Recorder;
use crate::xml;

/// Which codec a write goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Binary,
    Xml,
}

/// Serializes a quiescent profile to `out` in the given format. `second` is
/// the tick frequency the durations were recorded with, normally
/// [`Recorder::ticks_per_second`].
pub fn write<W: std::io::Write>(
    out: W,
    format: OutputFormat,
    profile: &Profile,
    second: u64,
) -> std::io::Result<()> {
    match format {
        OutputFormat::Binary => binary::write(out, profile, second),
        OutputFormat::Xml => xml::write(out, profile, second),
    }
}

pub fn write_file<P: AsRef<Path>>(
    path: P,
    format: OutputFormat,
    profile: &Profile,
    second: u64,
) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    write(&mut out, format, profile, second)?;
    out.flush()
}

/// Dumps a recorder's profile to a file when dropped.
///
/// Constructed at the top of `main`, this guarantees the stats land on disk
/// however the scope is left. A write failure on the drop path is logged
/// and otherwise swallowed; there is nobody left to hand it to.
#[derive(Debug)]
pub struct StatsWriter<'a> {
    recorder: &'a Recorder,
    path: PathBuf,
    format: OutputFormat,
}

impl StatsWriter<'static> {
    /// A stats writer for the global recorder.
    pub fn new<P: Into<PathBuf>>(path: P, format: OutputFormat) -> Self {
        Self::for_recorder(Recorder::global(), path, format)
    }
}

impl<'a> StatsWriter<'a> {
    pub fn for_recorder<P: Into<PathBuf>>(
        recorder: &'a Recorder,
        path: P,
        format: OutputFormat,
    ) -> Self {
        Self {
            recorder,
            path: path.into(),
            format,
        }
    }
}

impl Drop for StatsWriter<'_> {
    fn drop(&mut self) {
        let second = self.recorder.ticks_per_second();
        let profile = self.recorder.profile();
        if let Err(err) = write_file(&self.path, self.format, &profile, second) {
            log::error!(
                "failed to write profile stats to {}: {err}",
                self.path.display()
            );
        }
    }
}
