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

//! Observable container for the participant collection.
//!
//! Every write publishes a brand new `Arc<Vec<Participant>>`; snapshots handed
//! out earlier are never mutated. Readers either poll [`ParticipantStore::snapshot`]
//! or hold a [`watch::Receiver`] and get woken on each change.

use std::sync::Arc;
use tokio::sync::watch;
use videochat_types::Participant;

pub type Snapshot = Arc<Vec<Participant>>;

#[derive(Debug)]
pub struct ParticipantStore {
    tx: watch::Sender<Snapshot>,
}

impl Default for ParticipantStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticipantStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Vec::new()));
        Self { tx }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    pub fn replace(&self, participants: Vec<Participant>) {
        self.tx.send_replace(Arc::new(participants));
    }

    /// Computes a new collection from the current one and publishes it.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&[Participant]) -> Vec<Participant>,
    {
        let next = f(&self.snapshot());
        self.replace(next);
    }

    /// Applies `f` to a copy of the record with `id` and publishes the result.
    ///
    /// Returns `false`, without notifying readers, when no such record exists.
    pub fn modify<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Participant),
    {
        let current = self.snapshot();
        let Some(index) = current.iter().position(|p| p.id == id) else {
            return false;
        };
        let mut next = current.as_ref().clone();
        f(&mut next[index]);
        next[index].id = id.to_string();
        self.replace(next);
        true
    }

    pub fn get(&self, id: &str) -> Option<Participant> {
        self.tx.borrow().iter().find(|p| p.id == id).cloned()
    }

    pub fn local(&self) -> Option<Participant> {
        self.tx.borrow().iter().find(|p| p.is_local).cloned()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.replace(Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use videochat_types::{ContentType, StreamHandle, StreamOrigin};

    #[test]
    fn published_snapshots_are_never_mutated() {
        let store = ParticipantStore::new();
        store.replace(vec![Participant::remote("1", None)]);
        let before = store.snapshot();

        let handle = StreamHandle::new("v", ContentType::Video, StreamOrigin::Remote);
        assert!(store.modify("1", |p| p.video = Some(handle.clone())));

        assert!(before[0].video.is_none());
        assert_eq!(store.get("1").unwrap().video, Some(handle));
    }

    #[test]
    fn modify_unknown_id_is_rejected() {
        let store = ParticipantStore::new();
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        assert!(!store.modify("ghost", |p| p.is_local = true));
        assert!(!rx.has_changed().unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn modify_cannot_rename_a_record() {
        let store = ParticipantStore::new();
        store.replace(vec![Participant::remote("1", None)]);
        store.modify("1", |p| p.id = "2".into());
        assert!(store.get("1").is_some());
        assert!(store.get("2").is_none());
    }

    #[tokio::test]
    async fn subscribers_see_every_replacement() {
        let store = ParticipantStore::new();
        let mut rx = store.subscribe();

        store.update(|_| vec![Participant::remote("1", None), Participant::remote("2", None)]);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 2);

        store.clear();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_empty());
        assert_eq!(store.len(), 0);
    }
}
