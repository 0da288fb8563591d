//! Trigger registration with the kernel

use crate::domain::Domain;
use crate::error::Result;
use crate::source::{PressureContent, PressureSource};
use tracing::{info, warn};

/// What was registered for one domain, plus the file content seen just before
#[derive(Debug, Clone)]
pub struct Registration {
    pub domain: Domain,
    pub descriptor: String,
    /// Diagnostic read; `None` when the file could not be read
    pub content: Option<PressureContent>,
}

/// Registers distress triggers on every pressure source
pub struct ThresholdRegistrar {
    content_limit: usize,
}

impl ThresholdRegistrar {
    pub fn new(content_limit: usize) -> Self {
        Self { content_limit }
    }

    /// Open each source and write its trigger descriptor, in domain order
    ///
    /// The first failure aborts registration: a monitor tracking only some
    /// domains is not a valid state. Triggers outside kernel bounds are
    /// rejected before their file is opened.
    pub fn register_all(&self, sources: &mut [PressureSource]) -> Result<Vec<Registration>> {
        let mut registrations = Vec::with_capacity(sources.len());

        for source in sources.iter_mut() {
            registrations.push(self.register(source)?);
        }

        Ok(registrations)
    }

    fn register(&self, source: &mut PressureSource) -> Result<Registration> {
        source.trigger().validate()?;
        source.open()?;

        let descriptor = source.trigger().descriptor();
        info!(
            "{:?} distress trigger: {}",
            source.path(),
            descriptor
        );

        let content = match source.read_content(self.content_limit) {
            Ok(content) => {
                info!("{:?} content:\n{}", source.path(), content.text.trim_end());
                Some(content)
            }
            Err(e) => {
                warn!("Could not read {:?} before registering: {}", source.path(), e);
                None
            }
        };

        source.write_trigger()?;

        Ok(Registration {
            domain: source.domain(),
            descriptor,
            content,
        })
    }
}
