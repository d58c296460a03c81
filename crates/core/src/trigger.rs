// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The package lifecycle trigger and its canonical execution order.

use serde::{Deserialize, Serialize};

/// A side-effect-producing package-lifecycle operation.
///
/// The *execution* order used by the trigger manager is [`TRIGGER_ORDER`],
/// which differs from declaration order here (StopService runs before
/// StartService).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Extract,
    Install,
    StartService,
    StopService,
    RunBinaries,
    Remove,
    Purge,
}

crate::simple_display! {
    Trigger {
        Extract => "EXTRACT",
        Install => "INSTALL",
        StartService => "START_SERVICE",
        StopService => "STOP_SERVICE",
        RunBinaries => "RUN_BINARIES",
        Remove => "REMOVE",
        Purge => "PURGE",
    }
}

/// The concrete order triggers run in during one analysis: extract,
/// install, stop services, start services, run binaries, remove, purge.
pub const TRIGGER_ORDER: [Trigger; 7] = [
    Trigger::Extract,
    Trigger::Install,
    Trigger::StopService,
    Trigger::StartService,
    Trigger::RunBinaries,
    Trigger::Remove,
    Trigger::Purge,
];

/// An ordered pair `(before, after)` identifying a state comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiffPair {
    pub before: Trigger,
    pub after: Trigger,
}

impl DiffPair {
    /// Construct a diff pair; `before` must be strictly earlier than
    /// `after` in [`TRIGGER_ORDER`], else `None`.
    pub fn new(before: Trigger, after: Trigger) -> Option<Self> {
        let pos = |t: Trigger| TRIGGER_ORDER.iter().position(|x| *x == t);
        match (pos(before), pos(after)) {
            (Some(b), Some(a)) if b < a => Some(Self { before, after }),
            _ => None,
        }
    }
}

impl std::fmt::Display for DiffPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.before, self.after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_pair_requires_order() {
        assert!(DiffPair::new(Trigger::Extract, Trigger::Install).is_some());
        assert!(DiffPair::new(Trigger::Install, Trigger::Extract).is_none());
        assert!(DiffPair::new(Trigger::Extract, Trigger::Extract).is_none());
    }

    #[test]
    fn trigger_order_matches_deb_trigger_manager() {
        assert_eq!(
            TRIGGER_ORDER,
            [
                Trigger::Extract,
                Trigger::Install,
                Trigger::StopService,
                Trigger::StartService,
                Trigger::RunBinaries,
                Trigger::Remove,
                Trigger::Purge,
            ]
        );
    }

    #[test]
    fn trigger_display_matches_wire_names() {
        assert_eq!(Trigger::StopService.to_string(), "STOP_SERVICE");
    }
}
