//! The process-wide [`DatManager`].
//!
//! Installed once at startup; every later caller shares its caches for the
//! rest of the process.

use std::sync::OnceLock;

use crate::DatManager;

static PORTAL: OnceLock<DatManager> = OnceLock::new();

/// Install the process-wide manager.
///
/// Returns the manager back if one was already installed.
pub fn init(manager: DatManager) -> Result<(), DatManager> {
    PORTAL.set(manager)
}

/// The process-wide manager, if [`init`] has run.
pub fn get() -> Option<&'static DatManager> {
    PORTAL.get()
}
