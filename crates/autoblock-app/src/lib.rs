//! Collaborators around the autoblock core engine: configuration loading,
//! launchd trigger registration, the SelfControl preference/launch interface,
//! and process privilege checks.

pub mod config;
pub mod launchd;
pub mod selfcontrol;
pub mod system;
