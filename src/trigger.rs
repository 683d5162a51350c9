// src/trigger.rs

use crate::domain::RunOutcome;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Body of the file the CI workflow polls for. `None` means "no file".
pub fn trigger_contents(outcome: RunOutcome) -> Option<String> {
    match outcome {
        RunOutcome::NoChange => None,
        other => Some(format!("mode={}\nsearch=narrow", other.as_str())),
    }
}

/// Writes (or clears) the workflow trigger for this run's outcome.
pub fn write_trigger(path: &Path, outcome: RunOutcome) -> std::io::Result<()> {
    match trigger_contents(outcome) {
        Some(body) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, body)?;
            log::info!("✅ Trigger written to {}: mode={}", path.display(), outcome.as_str());
        }
        None => match fs::remove_file(path) {
            Ok(()) => log::info!("Removed stale trigger {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        },
    }
    Ok(())
}
