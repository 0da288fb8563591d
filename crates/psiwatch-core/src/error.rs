use crate::domain::Domain;
use std::path::PathBuf;
use thiserror::Error;

/// Process exit statuses, one per fatal cause
pub mod exit_code {
    /// Clean shutdown after a termination request
    pub const CLEAN: u8 = 0;
    /// `/proc/pressure/cpu` is missing: kernel older than 5.2 or PSI disabled
    pub const KERNEL_UNSUPPORTED: u8 = 1;
    /// A pressure file could not be opened for read/write
    pub const PRESSURE_OPEN: u8 = 2;
    /// Writing the trigger descriptor failed or was short
    pub const PRESSURE_WRITE: u8 = 3;
    /// The multiplexed wait (or its signal plumbing) failed
    pub const PRESSURE_POLL: u8 = 4;
    /// A monitored pressure file signalled that it is gone
    pub const PRESSURE_FILE_GONE: u8 = 5;
    /// A pressure file signalled a readiness condition we do not handle
    pub const PRESSURE_EVENT_UNKNOWN: u8 = 6;
    /// Configuration rejected before touching the kernel
    pub const INVALID_CONFIG: u8 = 7;
    /// Any other I/O failure (report output, one-shot reads)
    pub const IO: u8 = 8;
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Pressure interface not found at {path}: {hint}")]
    KernelUnsupported { path: PathBuf, hint: String },

    #[error("Failed to open {domain} pressure file {path}: {source}")]
    Open {
        domain: Domain,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {domain} trigger: {source}")]
    Write {
        domain: Domain,
        #[source]
        source: std::io::Error,
    },

    #[error("Short write of {domain} trigger: {written} of {expected} bytes")]
    ShortWrite {
        domain: Domain,
        written: usize,
        expected: usize,
    },

    #[error("Wait on pressure files failed: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Termination signal setup failed: {0}")]
    Signal(#[from] nix::Error),

    #[error("{domain} pressure event source is gone")]
    SourceGone { domain: Domain },

    #[error("Unrecognized {domain} event: {revents:#x}")]
    UnrecognizedEvent { domain: Domain, revents: i16 },

    #[error("Invalid trigger: {0}")]
    InvalidTrigger(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Exit status the process terminates with for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::KernelUnsupported { .. } => exit_code::KERNEL_UNSUPPORTED,
            Error::Open { .. } => exit_code::PRESSURE_OPEN,
            Error::Write { .. } | Error::ShortWrite { .. } => exit_code::PRESSURE_WRITE,
            Error::Wait(_) | Error::Signal(_) => exit_code::PRESSURE_POLL,
            Error::SourceGone { .. } => exit_code::PRESSURE_FILE_GONE,
            Error::UnrecognizedEvent { .. } => exit_code::PRESSURE_EVENT_UNKNOWN,
            Error::InvalidTrigger(_) => exit_code::INVALID_CONFIG,
            Error::Parse(_) | Error::Io(_) => exit_code::IO,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
