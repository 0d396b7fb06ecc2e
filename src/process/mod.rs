//! Subprocess lifecycle management: spawning, stderr capture, graceful shutdown.
//!
//! The AI CLI process itself lives in [`crate::ai::process`]; this module
//! provides the injected [`ProcessSpawner`] seam so tests can exercise session
//! startup without forking real subprocesses (REDESIGN FLAGS: replace
//! dynamic module-mocking of the process layer with an interface boundary).

pub mod spawner;

pub use spawner::{ProcessSpawner, SpawnedChild, TokioSpawner};
