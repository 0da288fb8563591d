//! One monitored pressure domain and its kernel handle

use crate::domain::{Domain, Trigger};
use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read limit for pressure file content; the kernel's two-line format fits well inside it
pub const CONTENT_LIMIT: usize = 128;

/// Bounded snapshot of a pressure file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PressureContent {
    pub text: String,
    /// Set when the file held more than the read limit
    pub truncated: bool,
}

impl PressureContent {
    /// Read at most `limit` bytes from `path` without blocking
    ///
    /// Opens a separate read-only handle so the registered trigger handle is untouched.
    pub fn read(path: &Path, limit: usize) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;

        // One extra byte tells us whether anything was cut off.
        let mut buf = Vec::with_capacity(limit + 1);
        file.take(limit as u64 + 1).read_to_end(&mut buf)?;

        let truncated = buf.len() > limit;
        buf.truncate(limit);

        Ok(Self {
            text: String::from_utf8_lossy(&buf).into_owned(),
            truncated,
        })
    }
}

/// A monitored domain: pseudo-file path, trigger and the live handle once registered
#[derive(Debug)]
pub struct PressureSource {
    domain: Domain,
    path: PathBuf,
    trigger: Trigger,
    handle: Option<File>,
    event_count: u64,
}

impl PressureSource {
    pub fn new(domain: Domain, path: impl Into<PathBuf>, trigger: Trigger) -> Self {
        Self {
            domain,
            path: path.into(),
            trigger,
            handle: None,
            event_count: 0,
        }
    }

    /// Build the three sources under `root` with their built-in triggers
    pub fn defaults_in(root: &Path) -> [PressureSource; 3] {
        Domain::ALL.map(|d| PressureSource::new(d, d.path_in(root), d.default_trigger()))
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Whether the live handle is held
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Raw descriptor of the live handle, for the multiplexed wait
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.handle.as_ref().map(|f| f.as_raw_fd())
    }

    /// Open the pressure file for non-blocking read/write
    ///
    /// Opening twice keeps the first handle.
    pub fn open(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)
            .map_err(|source| Error::Open {
                domain: self.domain,
                path: self.path.clone(),
                source,
            })?;

        debug!("Opened {} pressure file {:?}", self.domain, self.path);
        self.handle = Some(file);
        Ok(())
    }

    /// Write the trigger descriptor (NUL-terminated) to the live handle
    ///
    /// The kernel only accepts the descriptor in a single write, so a short write is fatal.
    pub fn write_trigger(&mut self) -> Result<String> {
        let descriptor = self.trigger.descriptor();
        let domain = self.domain;

        let file = self.handle.as_mut().ok_or_else(|| Error::Write {
            domain,
            source: std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "pressure file is not open",
            ),
        })?;

        let mut payload = descriptor.clone().into_bytes();
        payload.push(0);

        let written = file
            .write(&payload)
            .map_err(|source| Error::Write { domain, source })?;

        if written != payload.len() {
            return Err(Error::ShortWrite {
                domain,
                written,
                expected: payload.len(),
            });
        }

        Ok(descriptor)
    }

    /// Read the current content of this domain's pressure file
    pub fn read_content(&self, limit: usize) -> Result<PressureContent> {
        Ok(PressureContent::read(&self.path, limit)?)
    }

    /// Count one more event and return the new count (first event is 1)
    pub fn record_event(&mut self) -> u64 {
        self.event_count += 1;
        self.event_count
    }

    /// Close the live handle
    ///
    /// Returns false when there was nothing to close.
    pub fn release(&mut self) -> bool {
        match self.handle.take() {
            Some(file) => {
                drop(file);
                debug!("Closed {} pressure file {:?}", self.domain, self.path);
                true
            }
            None => false,
        }
    }
}
