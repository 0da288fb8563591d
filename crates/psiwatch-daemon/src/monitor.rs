use crate::config::Config;
use psiwatch_core::{
    kernel, Clock, Domain, EventReporter, Pause, PressureSource, Readiness, Registration,
    Result, RunState, ShutdownCoordinator, ThresholdRegistrar, Waiter, Wake,
};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// What a monitor run did before it stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub wakes: u64,
    /// Events per domain, in domain order
    pub events: Vec<(Domain, u64)>,
    /// Domains whose handles the drain closed, in close order
    pub closed: Vec<Domain>,
}

/// Pressure trigger monitor
///
/// Verifies the kernel interface, registers a trigger per domain, then blocks
/// on all of them and reports each distress event until told to stop.
pub struct PressureMonitor<O: Write, C: Clock> {
    root: PathBuf,
    sources: Vec<PressureSource>,
    registrar: ThresholdRegistrar,
    reporter: EventReporter<O, C>,
    coordinator: ShutdownCoordinator,
    wakes: u64,
}

impl<O: Write, C: Clock> PressureMonitor<O, C> {
    /// Create a monitor for the three domains described by `config`
    ///
    /// # Arguments
    /// * `config` - Validated configuration
    /// * `out` - Destination of event records (stdout in the daemon)
    /// * `clock` - Timestamp source for event records
    pub fn new(config: &Config, out: O, clock: C) -> Self {
        let sources = Domain::ALL
            .iter()
            .map(|&d| PressureSource::new(d, config.path(d), config.trigger(d)))
            .collect();

        Self {
            root: config.pressure.root.clone(),
            sources,
            registrar: ThresholdRegistrar::new(config.pressure.content_limit),
            reporter: EventReporter::new(out, clock, config.pressure.content_limit),
            coordinator: ShutdownCoordinator::new(),
            wakes: 0,
        }
    }

    /// Verify the pressure interface and register every trigger
    ///
    /// Nothing is opened when the interface is missing.
    pub fn start(&mut self) -> Result<Vec<Registration>> {
        let cpu = kernel::verify_interface(&self.root)?;
        info!("Pressure interface found at {:?}", cpu);

        let registrations = self.registrar.register_all(&mut self.sources)?;
        info!("Registered {} distress triggers", registrations.len());

        Ok(registrations)
    }

    /// Wait and report until stopped, then drain the handles
    pub fn run<W: Waiter, P: Pause>(&mut self, waiter: &mut W, pause: &mut P) -> Result<RunSummary> {
        info!("Polling for events...");
        let run_state = self.coordinator.run_state();

        while run_state.is_running() {
            let wake = waiter.wait(&self.sources)?;
            self.wakes += 1;
            self.handle_wake(wake)?;
        }

        let closed = self.coordinator.drain(&mut self.sources, pause);
        let summary = RunSummary {
            wakes: self.wakes,
            events: self.event_counts(),
            closed,
        };

        info!(
            "Stats: wakes={}, events={:?}, closed={:?}",
            summary.wakes, summary.events, summary.closed
        );
        Ok(summary)
    }

    /// Process one wake: termination first, then readiness in domain order
    pub fn handle_wake(&mut self, mut wake: Wake) -> Result<()> {
        if let Some(signal) = wake.termination {
            self.coordinator.request(signal.as_str());
            return Ok(());
        }

        wake.events.sort_by_key(|(domain, _)| *domain);

        for (domain, readiness) in wake.events {
            if !self.coordinator.run_state().is_running() {
                break;
            }

            if readiness.check(domain)? != Readiness::Distress {
                continue;
            }

            match self.sources.iter_mut().find(|s| s.domain() == domain) {
                Some(source) => {
                    self.reporter.report(source)?;
                }
                None => debug!("Wake for unmonitored domain {}", domain),
            }
        }

        Ok(())
    }

    /// Handle on the monitor's run flag; stopping it ends the loop after the current wake
    pub fn run_state(&self) -> RunState {
        self.coordinator.run_state()
    }

    pub fn sources(&self) -> &[PressureSource] {
        &self.sources
    }

    pub fn event_counts(&self) -> Vec<(Domain, u64)> {
        self.sources
            .iter()
            .map(|s| (s.domain(), s.event_count()))
            .collect()
    }

    /// Event records written so far
    pub fn output(&self) -> &O {
        self.reporter.writer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psiwatch_core::Signal;

    struct FixedClock;

    impl Clock for FixedClock {
        fn timestamp(&self) -> String {
            "2024-01-01 00:00:00".to_string()
        }
    }

    fn monitor_in(root: &std::path::Path) -> PressureMonitor<Vec<u8>, FixedClock> {
        let mut config = Config::default();
        config.pressure.root = root.to_path_buf();
        PressureMonitor::new(&config, Vec::new(), FixedClock)
    }

    #[test]
    fn test_monitor_creation() {
        let monitor = monitor_in(std::path::Path::new("/proc/pressure"));

        let domains: Vec<Domain> = monitor.sources().iter().map(|s| s.domain()).collect();
        assert_eq!(domains, vec![Domain::Cpu, Domain::Io, Domain::Memory]);
        assert!(monitor.sources().iter().all(|s| !s.is_open()));
        assert!(monitor.run_state().is_running());
    }

    #[test]
    fn test_initial_event_counts() {
        let monitor = monitor_in(std::path::Path::new("/proc/pressure"));

        assert_eq!(
            monitor.event_counts(),
            vec![(Domain::Cpu, 0), (Domain::Io, 0), (Domain::Memory, 0)]
        );
    }

    #[test]
    fn test_termination_wake_stops_run_state() {
        let mut monitor = monitor_in(std::path::Path::new("/proc/pressure"));

        monitor.handle_wake(Wake::terminated(Signal::SIGINT)).unwrap();
        assert!(!monitor.run_state().is_running());
    }

    #[test]
    fn test_idle_wake_reports_nothing() {
        let mut monitor = monitor_in(std::path::Path::new("/proc/pressure"));

        monitor
            .handle_wake(Wake::new(vec![
                (Domain::Cpu, Readiness::Idle),
                (Domain::Io, Readiness::Idle),
            ]))
            .unwrap();
        assert!(monitor.output().is_empty());
    }

    #[test]
    fn test_gone_wake_is_fatal() {
        let mut monitor = monitor_in(std::path::Path::new("/proc/pressure"));

        let err = monitor
            .handle_wake(Wake::new(vec![(Domain::Memory, Readiness::Gone)]))
            .unwrap_err();
        assert_eq!(err.exit_code(), psiwatch_core::exit_code::PRESSURE_FILE_GONE);
    }
}
