use psiwatch_core::{Domain, Trigger, CONTENT_LIMIT, PRESSURE_ROOT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the psiwatch daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the pressure files live and how much of them is read
    pub pressure: PressureConfig,

    /// CPU distress trigger (default: 50ms within 500ms)
    pub cpu: Trigger,

    /// IO distress trigger (default: 100ms within 1000ms)
    pub io: Trigger,

    /// Memory distress trigger (default: 75ms within 750ms)
    pub memory: Trigger,

    /// Logging configuration
    pub logging: LogConfig,
}

/// Pressure interface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureConfig {
    /// Directory holding cpu/io/memory pressure files (default: /proc/pressure)
    pub root: PathBuf,

    /// Bytes of file content read per report (default: 128)
    pub content_limit: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log directory path (default: ./logs/)
    pub log_dir: PathBuf,

    /// Daily-rotated log file name (default: psiwatch.log)
    pub file_name: String,

    /// Write logs to file in addition to stderr (default: true)
    pub file_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pressure: PressureConfig::default(),
            cpu: Domain::Cpu.default_trigger(),
            io: Domain::Io.default_trigger(),
            memory: Domain::Memory.default_trigger(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(PRESSURE_ROOT),
            content_limit: CONTENT_LIMIT,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            file_name: "psiwatch.log".to_string(),
            file_enabled: true,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use psiwatch_daemon::config::Config;
    ///
    /// let config = Config::load_from_file("/etc/psiwatch/config.toml").unwrap();
    /// println!("CPU trigger: {}", config.cpu.descriptor());
    /// ```
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Validate triggers against kernel limits and the remaining settings
    pub fn validate(&self) -> Result<(), String> {
        for domain in Domain::ALL {
            self.trigger(domain)
                .validate()
                .map_err(|e| format!("{} {}", domain, e))?;
        }

        if self.pressure.content_limit == 0 {
            return Err("Content limit must be > 0".to_string());
        }

        if self.logging.file_enabled && self.logging.file_name.trim().is_empty() {
            return Err("Log file name must not be empty".to_string());
        }

        Ok(())
    }

    /// Configured trigger for a domain
    pub fn trigger(&self, domain: Domain) -> Trigger {
        match domain {
            Domain::Cpu => self.cpu,
            Domain::Io => self.io,
            Domain::Memory => self.memory,
        }
    }

    /// Pressure file path for a domain
    pub fn path(&self, domain: Domain) -> PathBuf {
        domain.path_in(&self.pressure.root)
    }
}
