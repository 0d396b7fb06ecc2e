//! Auto-update coordinator (§4.9): version polling and restart timing.

pub mod coordinator;
pub mod registry;

pub use coordinator::{Installer, UpdateAction, UpdateCoordinator, UpdateMode, UpdateState};
pub use registry::VersionRegistry;
