//! Autoblock Core - Schedule model and activation engine.
//!
//! This crate decides, given a set of recurring block windows and a
//! timestamp, whether a blocking session should be active and for how many
//! more minutes. It is pure: no I/O, no clock access, no shared state.
//! Collaborators (config loading, launchd registration, preference writing)
//! live in the `autoblock-app` crate.

pub mod policy;
pub mod schedule;
pub mod session;

pub use policy::{BlockPolicy, EffectiveOptions, StartEvent};
pub use schedule::{Schedule, TimeOfDay};
pub use session::{plan_session, RunOutcome, SessionPlan};
