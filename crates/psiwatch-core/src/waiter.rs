//! Multiplexed wait on all pressure sources

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::signals::TerminationSignals;
use crate::source::PressureSource;
use std::io;
use tracing::{debug, trace};

pub use nix::sys::signal::Signal;

/// Readiness of one source after a wake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Nothing signalled
    Idle,
    /// The registered trigger fired (POLLPRI)
    Distress,
    /// The pressure file went away (POLLERR)
    Gone,
    /// Any other condition; carries the raw revents bits
    Unrecognized(i16),
}

impl Readiness {
    /// Classify poll(2) revents for a pressure file
    ///
    /// POLLERR wins over POLLPRI: a vanished file cannot be reported on.
    pub fn classify(revents: i16) -> Self {
        if revents == 0 {
            Readiness::Idle
        } else if revents & libc::POLLERR != 0 {
            Readiness::Gone
        } else if revents & libc::POLLPRI != 0 {
            Readiness::Distress
        } else {
            Readiness::Unrecognized(revents)
        }
    }

    /// Turn fatal readiness into the matching error
    pub fn check(self, domain: Domain) -> Result<Self> {
        match self {
            Readiness::Gone => Err(Error::SourceGone { domain }),
            Readiness::Unrecognized(revents) => Err(Error::UnrecognizedEvent { domain, revents }),
            other => Ok(other),
        }
    }
}

/// Result of one wait
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wake {
    /// Per-source readiness in domain order
    pub events: Vec<(Domain, Readiness)>,
    /// Termination request observed during this wait
    pub termination: Option<Signal>,
}

impl Wake {
    pub fn new(events: Vec<(Domain, Readiness)>) -> Self {
        Self {
            events,
            termination: None,
        }
    }

    pub fn terminated(signal: Signal) -> Self {
        Self {
            events: Vec::new(),
            termination: Some(signal),
        }
    }
}

/// Blocks until a source or a termination request needs attention
pub trait Waiter {
    fn wait(&mut self, sources: &[PressureSource]) -> Result<Wake>;
}

/// poll(2) over the three trigger handles plus the termination signalfd
pub struct PollWaiter {
    signals: Option<TerminationSignals>,
}

impl PollWaiter {
    pub fn new(signals: TerminationSignals) -> Self {
        Self {
            signals: Some(signals),
        }
    }

    /// Waiter that only watches the pressure sources
    pub fn without_signals() -> Self {
        Self { signals: None }
    }
}

impl Waiter for PollWaiter {
    fn wait(&mut self, sources: &[PressureSource]) -> Result<Wake> {
        // Closed sources get fd -1, which poll(2) skips.
        let mut fds: Vec<libc::pollfd> = sources
            .iter()
            .map(|source| libc::pollfd {
                fd: source.raw_fd().unwrap_or(-1),
                events: libc::POLLPRI,
                revents: 0,
            })
            .collect();

        if let Some(signals) = &self.signals {
            fds.push(libc::pollfd {
                fd: signals.raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            });
        }

        trace!("Waiting on {} descriptors", fds.len());

        // SAFETY: fds is a valid, exclusively borrowed pollfd array of the given length;
        // timeout -1 blocks until an event arrives.
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                debug!("Wait interrupted, rechecking run state");
                return Ok(Wake::default());
            }
            return Err(Error::Wait(err));
        }

        let mut wake = Wake::new(
            sources
                .iter()
                .zip(&fds)
                .map(|(source, pfd)| (source.domain(), Readiness::classify(pfd.revents)))
                .collect(),
        );

        if let Some(signals) = self.signals.as_mut() {
            let signal_revents = fds[sources.len()].revents;
            if signal_revents & libc::POLLIN != 0 {
                wake.termination = signals.take()?;
            }
        }

        Ok(wake)
    }
}
