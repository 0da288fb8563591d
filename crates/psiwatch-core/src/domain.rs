use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default directory holding the kernel's PSI pseudo-files (kernel 5.2+)
pub const PRESSURE_ROOT: &str = "/proc/pressure";

/// Kernel limits for a PSI trigger, in milliseconds
pub const MIN_THRESHOLD_MS: u64 = 50;
pub const MAX_THRESHOLD_MS: u64 = 1_000;
pub const MIN_WINDOW_MS: u64 = 500;
pub const MAX_WINDOW_MS: u64 = 10_000;

const MS_TO_US: u64 = 1_000;

/// Monitored resource domain
///
/// The derived ordering is the fixed processing order: CPU, IO, MEMORY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Cpu,
    Io,
    Memory,
}

impl Domain {
    /// All domains in processing order
    pub const ALL: [Domain; 3] = [Domain::Cpu, Domain::Io, Domain::Memory];

    /// Name of the pseudo-file for this domain inside the pressure root
    pub fn file_name(&self) -> &'static str {
        match self {
            Domain::Cpu => "cpu",
            Domain::Io => "io",
            Domain::Memory => "memory",
        }
    }

    /// Full path of this domain's pseudo-file under `root`
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(self.file_name())
    }

    /// Position of this domain in [`Domain::ALL`]
    pub fn index(&self) -> usize {
        match self {
            Domain::Cpu => 0,
            Domain::Io => 1,
            Domain::Memory => 2,
        }
    }

    /// Built-in distress trigger for this domain
    pub fn default_trigger(&self) -> Trigger {
        match self {
            Domain::Cpu => Trigger::new(50, 500),
            Domain::Io => Trigger::new(100, 1_000),
            Domain::Memory => Trigger::new(75, 750),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Cpu => write!(f, "CPU"),
            Domain::Io => write!(f, "IO"),
            Domain::Memory => write!(f, "MEMORY"),
        }
    }
}

/// Distress condition: stall time `threshold_ms` accumulated within `window_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub threshold_ms: u64,
    pub window_ms: u64,
}

impl Trigger {
    pub fn new(threshold_ms: u64, window_ms: u64) -> Self {
        Self {
            threshold_ms,
            window_ms,
        }
    }

    /// Descriptor written to the pressure file to register the trigger
    ///
    /// Format: `some <threshold_us> <window_us>`. Call [`Trigger::validate`] first;
    /// out-of-range values saturate instead of overflowing.
    pub fn descriptor(&self) -> String {
        format!(
            "some {} {}",
            self.threshold_ms.saturating_mul(MS_TO_US),
            self.window_ms.saturating_mul(MS_TO_US)
        )
    }

    /// Tracking window as a duration (the drain pause for this domain)
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Check the trigger against the kernel's accepted ranges
    pub fn validate(&self) -> Result<()> {
        if !(MIN_THRESHOLD_MS..=MAX_THRESHOLD_MS).contains(&self.threshold_ms) {
            return Err(Error::InvalidTrigger(format!(
                "threshold must be {}-{}ms, got: {}ms",
                MIN_THRESHOLD_MS, MAX_THRESHOLD_MS, self.threshold_ms
            )));
        }

        if !(MIN_WINDOW_MS..=MAX_WINDOW_MS).contains(&self.window_ms) {
            return Err(Error::InvalidTrigger(format!(
                "window must be {}-{}ms, got: {}ms",
                MIN_WINDOW_MS, MAX_WINDOW_MS, self.window_ms
            )));
        }

        if self.threshold_ms >= self.window_ms {
            return Err(Error::InvalidTrigger(format!(
                "threshold ({}ms) must be below window ({}ms)",
                self.threshold_ms, self.window_ms
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptors_for_default_triggers() {
        assert_eq!(Domain::Cpu.default_trigger().descriptor(), "some 50000 500000");
        assert_eq!(Domain::Io.default_trigger().descriptor(), "some 100000 1000000");
        assert_eq!(Domain::Memory.default_trigger().descriptor(), "some 75000 750000");
    }

    #[test]
    fn test_descriptor_matches_microsecond_conversion() {
        for domain in Domain::ALL {
            let trigger = domain.default_trigger();
            let expected = format!(
                "some {} {}",
                trigger.threshold_ms * 1000,
                trigger.window_ms * 1000
            );
            assert_eq!(trigger.descriptor(), expected);
        }
    }

    #[test]
    fn test_domain_order() {
        assert_eq!(Domain::ALL, [Domain::Cpu, Domain::Io, Domain::Memory]);
        assert!(Domain::Cpu < Domain::Io);
        assert!(Domain::Io < Domain::Memory);
        for (i, domain) in Domain::ALL.iter().enumerate() {
            assert_eq!(domain.index(), i);
        }
    }

    #[test]
    fn test_paths() {
        let root = Path::new(PRESSURE_ROOT);
        assert_eq!(Domain::Cpu.path_in(root), PathBuf::from("/proc/pressure/cpu"));
        assert_eq!(Domain::Io.path_in(root), PathBuf::from("/proc/pressure/io"));
        assert_eq!(
            Domain::Memory.path_in(root),
            PathBuf::from("/proc/pressure/memory")
        );
    }

    #[test]
    fn test_default_triggers_are_valid() {
        for domain in Domain::ALL {
            assert!(domain.default_trigger().validate().is_ok());
        }
    }

    #[test]
    fn test_trigger_validation_bounds() {
        assert!(Trigger::new(49, 500).validate().is_err());
        assert!(Trigger::new(1001, 2000).validate().is_err());
        assert!(Trigger::new(50, 499).validate().is_err());
        assert!(Trigger::new(50, 10_001).validate().is_err());
        assert!(Trigger::new(1000, 10_000).validate().is_ok());

        let err = Trigger::new(600, 600).validate().unwrap_err();
        assert!(err.to_string().contains("below window"));
    }

    #[test]
    fn test_descriptor_saturates_huge_values() {
        let trigger = Trigger::new(u64::MAX / 100, 10_000);
        assert_eq!(trigger.descriptor(), format!("some {} 10000000", u64::MAX));
        assert!(trigger.validate().is_err());
    }

    #[test]
    fn test_window_duration() {
        assert_eq!(
            Domain::Io.default_trigger().window(),
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Domain::Cpu.to_string(), "CPU");
        assert_eq!(Domain::Memory.to_string(), "MEMORY");
    }
}
