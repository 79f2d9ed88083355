//! A log file that rotates itself by size.
//!
//! The active file is always `<path>`. Rotated files are `<path>.1`,
//! `<path>.2`, ... where a higher number is an older file. Renaming and
//! counting backups is left to [`file_rotate`], this module adds the size
//! trigger and removal by age.

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use std::{
    fmt,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

const MEGABYTE: u64 = 1024 * 1024;
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// A [`Write`] implementation that rotates the underlying file by size.
pub struct RollingFile {
    path: PathBuf,
    inner: FileRotate<AppendCount>,
    written: u64,
    max_size: u64,
    max_backups: usize,
    max_age: Option<Duration>,
}

impl fmt::Debug for RollingFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollingFile")
            .field("path", &self.path)
            .field("written", &self.written)
            .field("max_size", &self.max_size)
            .field("max_backups", &self.max_backups)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl RollingFile {
    /// Opens a rolling file from the limits used in configuration.
    ///
    /// A `max_size_mb` of 0 disables rotation, 0 backups keeps every backup,
    /// and an age of 0 days disables age based removal.
    pub fn open(
        path: impl Into<PathBuf>,
        max_size_mb: u64,
        max_backups: usize,
        max_age_days: u64,
    ) -> io::Result<Self> {
        let max_size = max_size_mb
            .checked_mul(MEGABYTE)
            .ok_or_else(|| invalid_input(format!("max_size_mb is too large: {max_size_mb}")))?;
        let max_age = match max_age_days {
            0 => None,
            days => Some(
                days.checked_mul(SECONDS_PER_DAY)
                    .map(Duration::from_secs)
                    .ok_or_else(|| invalid_input(format!("max_age_days is too large: {days}")))?,
            ),
        };
        Self::with_limits(path, max_size, max_backups, max_age)
    }

    /// Opens a rolling file with the size limit given in bytes.
    pub fn with_limits(
        path: impl Into<PathBuf>,
        max_size: u64,
        max_backups: usize,
        max_age: Option<Duration>,
    ) -> io::Result<Self> {
        let path = path.into();
        if path.file_name().is_none() {
            return Err(invalid_input(format!(
                "log file has no file name: {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        // The rotator drops writes to a file it cannot open.
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?
            .metadata()?
            .len();
        let inner = rotator(&path, max_backups);
        Ok(Self {
            path,
            inner,
            written,
            max_size,
            max_backups,
            max_age,
        })
    }

    fn should_rotate(&self, incoming: usize) -> bool {
        self.max_size > 0
            && self.written > 0
            && self.written.saturating_add(incoming as u64) > self.max_size
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.inner.rotate()?;
        self.written = 0;
        if let Some(max_age) = self.max_age {
            let removed = remove_older_than(&self.inner.log_paths(), max_age);
            // The rotator keeps its list of backups in memory.
            self.inner = rotator(&self.path, self.max_backups);
            removed?;
        }
        Ok(())
    }
}

fn rotator(path: &Path, max_backups: usize) -> FileRotate<AppendCount> {
    let max_backups = match max_backups {
        0 => usize::MAX,
        n => n,
    };
    FileRotate::new(
        path,
        AppendCount::new(max_backups),
        ContentLimit::None,
        Compression::None,
        #[cfg(unix)]
        None,
    )
}

fn remove_older_than(backups: &[PathBuf], max_age: Duration) -> io::Result<()> {
    let now = SystemTime::now();
    for backup in backups {
        let age = fs::metadata(backup)?
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age > max_age) {
            fs::remove_file(backup)?;
        }
    }
    Ok(())
}

fn invalid_input(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.should_rotate(buf.len()) {
            self.rotate()?;
        }
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
