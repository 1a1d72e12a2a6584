/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Reconciliation of the local participant collection with the room roster.
//!
//! The room reports its membership as a set of [`MemberDescriptor`]s. The
//! collection shown in the grid is rebuilt from that set while keeping the
//! existing [`Participant`] records, and therefore their attached media
//! handles, for every member that is still present.

use std::collections::HashSet;
use videochat_types::{MemberDescriptor, Participant};

/// Result of reconciling a collection against a roster.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RosterUpdate {
    /// Kept records in their previous relative order, followed by new ones.
    pub participants: Vec<Participant>,
    /// Ids that were not in the previous collection.
    pub added: Vec<String>,
    /// Records whose id is no longer in the roster.
    ///
    /// Their media handles are handed back untouched; releasing them is up to
    /// the caller.
    pub dropped: Vec<Participant>,
}

impl RosterUpdate {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.dropped.is_empty()
    }
}

/// Rebuilds `current` so that it contains exactly the members in `members`.
///
/// Members already present keep their record unchanged, members that are new
/// get a fresh remote record with no media, members that are gone are dropped.
/// New records are appended in the order they appear in `members`; a repeated
/// id only counts once.
pub fn reconcile(current: &[Participant], members: &[MemberDescriptor]) -> RosterUpdate {
    let observed: HashSet<&str> = members.iter().map(|m| m.id.as_str()).collect();

    let (kept, dropped): (Vec<Participant>, Vec<Participant>) = current
        .iter()
        .cloned()
        .partition(|p| observed.contains(p.id.as_str()));

    let mut seen: HashSet<&str> = kept.iter().map(|p| p.id.as_str()).collect();
    let mut added = Vec::new();
    let mut fresh = Vec::new();
    for member in members {
        if seen.insert(member.id.as_str()) {
            added.push(member.id.clone());
            fresh.push(Participant::remote(member.id.clone(), member.name.clone()));
        }
    }

    let mut participants = kept;
    participants.extend(fresh);
    RosterUpdate {
        participants,
        added,
        dropped,
    }
}

/// Convenience wrapper around [`reconcile`] returning only the new collection.
pub fn synchronize(current: &[Participant], members: &[MemberDescriptor]) -> Vec<Participant> {
    reconcile(current, members).participants
}
