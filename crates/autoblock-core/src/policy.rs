//! Policy resolution across an ordered set of block windows.
//!
//! A [`BlockPolicy`] holds the declared schedules plus the global defaults.
//! It answers "which window is active now" (declaration order is the
//! tie-break), applies the per-window option override chain, and derives the
//! weekly start events handed to the recurring-trigger installer.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::schedule::Schedule;

/// One weekly calendar firing derived from a window's start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartEvent {
    /// ISO weekday (Monday = 1 .. Sunday = 7).
    pub weekday: u8,
    /// Start hour (0-23).
    pub hour: u8,
    /// Start minute (0-59).
    pub minute: u8,
}

/// Per-window blocking options after applying the override chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveOptions {
    /// Whether the host list is a whitelist instead of a blacklist.
    pub block_as_whitelist: bool,
    /// The host list to block (or allow, in whitelist mode). `None` when
    /// neither the window nor the policy configures one.
    pub host_blacklist: Option<Vec<String>>,
}

/// The whole blocking policy: ordered windows plus global defaults.
///
/// Immutable value object, constructed once from validated configuration.
/// Every query is pure given (policy, now).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPolicy {
    /// Declared windows; earlier entries win when windows overlap.
    pub block_schedules: Vec<Schedule>,
    /// Global default host list, used when a window has none of its own.
    pub host_blacklist: Option<Vec<String>>,
}

impl BlockPolicy {
    /// Creates a policy with no global host list.
    pub fn new(block_schedules: Vec<Schedule>) -> Self {
        Self {
            block_schedules,
            host_blacklist: None,
        }
    }

    /// Sets the global default host list.
    pub fn with_host_blacklist(mut self, hosts: Vec<String>) -> Self {
        self.host_blacklist = Some(hosts);
        self
    }

    /// Returns the first declared window containing `now`, if any.
    pub fn active_schedule(&self, now: NaiveDateTime) -> Option<&Schedule> {
        self.block_schedules.iter().find(|s| s.is_active(now))
    }

    /// Computes the effective options for a winning window.
    ///
    /// Two-level chain: the window's own value when set, else the global
    /// default. An unset whitelist flag means blacklist mode; a window's
    /// empty host list is kept as-is (explicit "block nothing").
    pub fn resolve_options(&self, schedule: &Schedule) -> EffectiveOptions {
        EffectiveOptions {
            block_as_whitelist: schedule.block_as_whitelist.unwrap_or(false),
            host_blacklist: schedule
                .host_blacklist
                .clone()
                .or_else(|| self.host_blacklist.clone()),
        }
    }

    /// Derives the full weekly start-event list for the trigger installer.
    ///
    /// One event per (window, weekday), independent of the current time.
    /// Order is deterministic: declaration order, then ascending weekday.
    pub fn start_events(&self) -> Vec<StartEvent> {
        self.block_schedules
            .iter()
            .flat_map(|schedule| {
                schedule.weekdays().into_iter().map(|weekday| StartEvent {
                    weekday,
                    hour: schedule.start_time.hour,
                    minute: schedule.start_time.minute,
                })
            })
            .collect()
    }
}
