use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One PSI line: stall averages (percent) and cumulative stall time (microseconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureRecord {
    pub avg10: f64,
    pub avg60: f64,
    pub avg300: f64,
    pub total: u64,
}

/// Parsed content of a pressure file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureSnapshot {
    /// "some": at least one task stalled on the resource
    pub some: PressureRecord,
    /// "full": all non-idle tasks stalled at once; older kernels omit it for CPU
    pub full: Option<PressureRecord>,
}

impl PressureSnapshot {
    /// Read and parse a pressure file
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse PSI format
    ///
    /// ```text
    /// some avg10=0.00 avg60=0.00 avg300=0.00 total=634678
    /// full avg10=0.00 avg60=0.00 avg300=0.00 total=583219
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());

        let some_line = lines
            .next()
            .ok_or_else(|| Error::Parse("Invalid PSI format: empty content".to_string()))?;
        let some = parse_line(some_line, "some")?;

        let full = match lines.next() {
            Some(line) => Some(parse_line(line, "full")?),
            None => None,
        };

        Ok(Self { some, full })
    }

    /// Coarse level from the 10-second averages
    pub fn level(&self) -> &'static str {
        let full_avg10 = self.full.map(|f| f.avg10).unwrap_or(0.0);
        if full_avg10 > 0.0 {
            "CRITICAL"
        } else if self.some.avg10 > 10.0 {
            "HIGH"
        } else if self.some.avg10 > 5.0 {
            "MEDIUM"
        } else if self.some.avg10 > 0.0 {
            "LOW"
        } else {
            "NONE"
        }
    }
}

/// Parse "some avg10=0.00 avg60=0.00 avg300=0.00 total=634678"
fn parse_line(line: &str, expected_prefix: &str) -> Result<PressureRecord> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    if parts.first() != Some(&expected_prefix) {
        return Err(Error::Parse(format!(
            "Line should start with '{}', got: {}",
            expected_prefix, line
        )));
    }

    if parts.len() != 5 {
        return Err(Error::Parse(format!(
            "Expected 5 parts, got {}: {}",
            parts.len(),
            line
        )));
    }

    Ok(PressureRecord {
        avg10: parse_value(parts[1], "avg10=")?,
        avg60: parse_value(parts[2], "avg60=")?,
        avg300: parse_value(parts[3], "avg300=")?,
        total: parse_value(parts[4], "total=")?,
    })
}

/// Parse "key=value"
fn parse_value<T>(part: &str, expected_key: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = part.strip_prefix(expected_key).ok_or_else(|| {
        Error::Parse(format!("Expected key '{}', got: {}", expected_key, part))
    })?;

    value
        .parse::<T>()
        .map_err(|e| Error::Parse(format!("Failed to parse '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_psi_format() {
        let content = "some avg10=0.00 avg60=0.00 avg300=0.00 total=634678\n\
                       full avg10=0.00 avg60=0.00 avg300=0.00 total=583219\n";

        let snapshot = PressureSnapshot::parse(content).unwrap();
        assert_eq!(snapshot.some.avg10, 0.0);
        assert_eq!(snapshot.some.total, 634678);
        assert_eq!(snapshot.full.unwrap().total, 583219);
    }

    #[test]
    fn test_parse_cpu_without_full_line() {
        let snapshot =
            PressureSnapshot::parse("some avg10=2.04 avg60=0.75 avg300=0.40 total=157656722\n")
                .unwrap();

        assert_eq!(snapshot.some.avg10, 2.04);
        assert!(snapshot.full.is_none());
        assert_eq!(snapshot.level(), "LOW");
    }

    #[test]
    fn test_parse_with_pressure() {
        let content = "some avg10=12.50 avg60=8.32 avg300=5.12 total=1234567\n\
                       full avg10=3.21 avg60=2.11 avg300=1.05 total=654321\n";

        let snapshot = PressureSnapshot::parse(content).unwrap();
        let full = snapshot.full.unwrap();
        assert_eq!(snapshot.some.avg60, 8.32);
        assert_eq!(full.avg10, 3.21);
        assert!((full.avg300 - 1.05).abs() < 0.001);
        assert_eq!(snapshot.level(), "CRITICAL");
    }

    #[test]
    fn test_parse_rejects_bad_prefix() {
        let err = PressureSnapshot::parse("full avg10=0.00 avg60=0.00 avg300=0.00 total=1\n")
            .unwrap_err();
        assert!(err.to_string().contains("should start with 'some'"));
    }

    #[test]
    fn test_parse_rejects_bad_value() {
        let err = PressureSnapshot::parse("some avg10=abc avg60=0.00 avg300=0.00 total=1\n")
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_parse_empty() {
        assert!(PressureSnapshot::parse("").is_err());
    }

    #[test]
    fn test_levels() {
        let record = |avg10| PressureRecord {
            avg10,
            avg60: 0.0,
            avg300: 0.0,
            total: 0,
        };

        let none = PressureSnapshot {
            some: record(0.0),
            full: Some(record(0.0)),
        };
        assert_eq!(none.level(), "NONE");

        let medium = PressureSnapshot {
            some: record(7.5),
            full: None,
        };
        assert_eq!(medium.level(), "MEDIUM");

        let high = PressureSnapshot {
            some: record(25.0),
            full: Some(record(0.0)),
        };
        assert_eq!(high.level(), "HIGH");
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot =
            PressureSnapshot::parse("some avg10=1.00 avg60=0.00 avg300=0.00 total=7\n").unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"avg10\":1.0"));
        assert!(json.contains("\"full\":null"));
    }
}
