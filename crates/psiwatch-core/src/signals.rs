//! Termination requests delivered through a signalfd
//!
//! SIGINT and SIGTERM are blocked for the calling thread and surface as a
//! readable descriptor inside the multiplexed wait. Nothing runs in signal
//! context: the request is observed on the main control flow when the wait
//! returns.

use crate::error::Result;
use nix::sys::signal::{SigSet, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};
use std::os::unix::io::{AsRawFd, RawFd};
use tracing::debug;

pub struct TerminationSignals {
    fd: SignalFd,
}

impl TerminationSignals {
    /// Block SIGINT/SIGTERM and route them to a non-blocking signalfd
    ///
    /// Must be called before any other thread is spawned so the mask is inherited.
    pub fn install() -> Result<Self> {
        let mut mask = SigSet::empty();
        mask.add(Signal::SIGINT);
        mask.add(Signal::SIGTERM);
        mask.thread_block()?;

        let fd = SignalFd::with_flags(&mask, SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC)?;
        debug!("Termination signals routed to signalfd {}", fd.as_raw_fd());

        Ok(Self { fd })
    }

    pub fn raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Take one pending termination request, if any
    pub fn take(&mut self) -> Result<Option<Signal>> {
        match self.fd.read_signal()? {
            Some(info) => Ok(Signal::try_from(info.ssi_signo as i32).ok()),
            None => Ok(None),
        }
    }
}
