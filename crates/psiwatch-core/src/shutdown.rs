//! Run flag and the ordered release of pressure handles

use crate::domain::Domain;
use crate::source::PressureSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Shared run flag; starts running and flips to stopped exactly once
#[derive(Debug, Clone)]
pub struct RunState {
    running: Arc<AtomicBool>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Flip to stopped; true only for the call that actually flipped it
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// Pause taken before closing a domain's handle
pub trait Pause {
    fn pause(&mut self, domain: Domain, duration: Duration);
}

/// Sleeps on the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&mut self, _domain: Domain, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Draining,
    Stopped,
}

/// Owns the run flag and drains the sources on termination
pub struct ShutdownCoordinator {
    run_state: RunState,
    state: ShutdownState,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            run_state: RunState::new(),
            state: ShutdownState::Running,
        }
    }

    /// Handle on the same run flag
    pub fn run_state(&self) -> RunState {
        self.run_state.clone()
    }

    pub fn state(&self) -> ShutdownState {
        self.state
    }

    /// Record a termination request and enter draining
    ///
    /// Returns false if a drain is already underway or finished.
    pub fn request(&mut self, reason: &str) -> bool {
        if self.state != ShutdownState::Running {
            warn!("Ignoring {} request: shutdown already in progress", reason);
            return false;
        }

        self.run_state.stop();
        self.state = ShutdownState::Draining;
        info!("Terminating in response to {}", reason);
        true
    }

    /// Release every open handle in domain order, pausing one tracking window before each
    ///
    /// Returns the domains that were closed by this call. A second drain closes nothing.
    pub fn drain<P: Pause>(&mut self, sources: &mut [PressureSource], pause: &mut P) -> Vec<Domain> {
        if self.state == ShutdownState::Stopped {
            return Vec::new();
        }
        if self.state == ShutdownState::Running {
            self.request("shutdown");
        }

        info!("Please wait until all pressure file handles are closed");

        let mut order: Vec<usize> = (0..sources.len()).collect();
        order.sort_by_key(|&i| sources[i].domain());

        let mut closed = Vec::with_capacity(sources.len());
        for i in order {
            let source = &mut sources[i];
            if !source.is_open() {
                continue;
            }

            info!(
                "Closing {} handle for {:?} after {}ms",
                source.domain(),
                source.path(),
                source.trigger().window_ms
            );
            pause.pause(source.domain(), source.trigger().window());

            if source.release() {
                closed.push(source.domain());
            }
        }

        self.state = ShutdownState::Stopped;
        info!("All pressure file handles closed, exiting");
        closed
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
