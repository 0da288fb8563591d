//! Per-event report lines

use crate::error::Result;
use crate::psi::PressureSnapshot;
use crate::source::{PressureContent, PressureSource};
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// Report timestamp format (local time)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of report timestamps
pub trait Clock {
    fn timestamp(&self) -> String;
}

/// Wall clock in the local timezone
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn timestamp(&self) -> String {
        chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// One distress event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub path: PathBuf,
    pub count: u64,
    pub timestamp: String,
    pub content: PressureContent,
}

impl fmt::Display for EventRecord {
    /// `<path> <count> <timestamp> <content>`
    ///
    /// Content is the kernel text as read, minus trailing whitespace so the
    /// record ends in exactly one newline when written with `writeln!`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.path.display(),
            self.count,
            self.timestamp,
            self.content.text.trim_end()
        )
    }
}

/// Reads a triggered source and writes its record to `out`
pub struct EventReporter<W: Write, C: Clock> {
    out: W,
    clock: C,
    content_limit: usize,
}

impl<W: Write, C: Clock> EventReporter<W, C> {
    pub fn new(out: W, clock: C, content_limit: usize) -> Self {
        Self {
            out,
            clock,
            content_limit,
        }
    }

    /// Report one distress event for `source`
    ///
    /// The event count only advances once the content has been read.
    pub fn report(&mut self, source: &mut PressureSource) -> Result<EventRecord> {
        let content = source.read_content(self.content_limit)?;
        let count = source.record_event();

        let record = EventRecord {
            path: source.path().to_path_buf(),
            count,
            timestamp: self.clock.timestamp(),
            content,
        };

        writeln!(self.out, "{}", record)?;
        self.out.flush()?;

        if record.content.truncated {
            warn!(
                "{} pressure content exceeded {} bytes and was truncated",
                source.domain(),
                self.content_limit
            );
        }

        match PressureSnapshot::parse(&record.content.text) {
            Ok(snapshot) => info!(
                domain = %source.domain(),
                count,
                some_avg10 = snapshot.some.avg10,
                "Distress event"
            ),
            Err(_) => info!(domain = %source.domain(), count, "Distress event"),
        }

        Ok(record)
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use std::fs;
    use tempfile::TempDir;

    struct FixedClock;

    impl Clock for FixedClock {
        fn timestamp(&self) -> String {
            "2024-03-01 12:00:00".to_string()
        }
    }

    const CONTENT: &str = "some avg10=3.10 avg60=1.20 avg300=0.30 total=1000\n";

    #[test]
    fn test_record_format() {
        let record = EventRecord {
            path: PathBuf::from("/proc/pressure/cpu"),
            count: 3,
            timestamp: "2024-03-01 12:00:00".to_string(),
            content: PressureContent {
                text: CONTENT.to_string(),
                truncated: false,
            },
        };

        assert_eq!(
            record.to_string(),
            "/proc/pressure/cpu 3 2024-03-01 12:00:00 some avg10=3.10 avg60=1.20 avg300=0.30 total=1000"
        );
    }

    #[test]
    fn test_report_increments_count_from_one() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("io");
        fs::write(&path, CONTENT).unwrap();
        let mut source = PressureSource::new(Domain::Io, &path, Domain::Io.default_trigger());
        let mut reporter = EventReporter::new(Vec::new(), FixedClock, 128);

        let first = reporter.report(&mut source).unwrap();
        let second = reporter.report(&mut source).unwrap();

        assert_eq!(first.count, 1);
        assert_eq!(second.count, 2);

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(&format!("{} 1 2024-03-01 12:00:00 some", path.display())));
        assert!(lines[1].starts_with(&format!("{} 2 ", path.display())));
    }

    #[test]
    fn test_report_failure_does_not_count() {
        let dir = TempDir::new().unwrap();
        let mut source = PressureSource::new(
            Domain::Memory,
            dir.path().join("memory"),
            Domain::Memory.default_trigger(),
        );
        let mut reporter = EventReporter::new(Vec::new(), FixedClock, 128);

        assert!(reporter.report(&mut source).is_err());
        assert_eq!(source.event_count(), 0);
        assert!(reporter.writer().is_empty());
    }

    #[test]
    fn test_report_keeps_truncation_flag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cpu");
        fs::write(&path, CONTENT).unwrap();
        let mut source = PressureSource::new(Domain::Cpu, &path, Domain::Cpu.default_trigger());
        let mut reporter = EventReporter::new(Vec::new(), FixedClock, 10);

        let record = reporter.report(&mut source).unwrap();
        assert!(record.content.truncated);
        assert_eq!(record.content.text, "some avg10");
    }

    #[test]
    fn test_local_clock_format() {
        let ts = LocalClock.timestamp();
        assert_eq!(ts.len(), 19);
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok());
    }
}
