use crate::domain::Domain;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Check that the kernel exposes pressure files under `root`
///
/// The CPU file stands in for the whole interface. Returns its path.
pub fn verify_interface(root: &Path) -> Result<PathBuf> {
    let cpu = Domain::Cpu.path_in(root);

    if let Err(e) = std::fs::metadata(&cpu) {
        debug!("stat {:?} failed: {}", cpu, e);
        return Err(Error::KernelUnsupported {
            path: cpu,
            hint: format!(
                "trigger monitoring needs kernel 5.2+ with PSI enabled, running {}",
                kernel_release()
            ),
        });
    }

    Ok(cpu)
}

/// Running kernel release as reported by uname(2)
pub fn kernel_release() -> String {
    match nix::sys::utsname::uname() {
        Ok(uts) => uts.release().to_string_lossy().into_owned(),
        Err(_) => "unknown".to_string(),
    }
}
