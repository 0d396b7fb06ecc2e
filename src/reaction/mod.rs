//! Reaction routing (§4.10): dispatch an inbound reaction to whichever
//! pending state machine it resolves.

pub mod router;

pub use router::{ReactionRouter, RouteOutcome};
