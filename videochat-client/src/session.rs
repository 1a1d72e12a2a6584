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

//! Capabilities the controller needs from a communication SDK.
//!
//! The SDK owns signaling, room management and media transport. These traits
//! describe the slice of it the call flow consumes, so that a binding to a
//! real SDK and the in-process [`simulated`](crate::simulated) backend are
//! interchangeable.

use crate::error::Result;
use async_broadcast::Receiver;
use async_trait::async_trait;
use std::sync::Arc;
use videochat_types::{LocalMember, MemberDescriptor, Publication, StreamHandle};

/// Notifications raised by a room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoomEvent {
    /// The full, current set of members.
    MembershipChanged(Vec<MemberDescriptor>),
    MemberJoined(MemberDescriptor),
    MemberLeft(String),
    StreamPublished(Publication),
    StreamUnpublished(Publication),
}

/// Entry point of the SDK: initialization and room lookup.
#[async_trait]
pub trait RoomService: Send + Sync {
    /// Initializes the SDK with the given auth token.
    async fn setup(&self, auth_token: &str) -> Result<()>;

    /// Finds the room called `name`, creating it if needed.
    ///
    /// `Ok(None)` means the SDK answered but produced no room.
    async fn find_or_create_room(&self, name: &str) -> Result<Option<Arc<dyn Room>>>;
}

/// An SFU room.
#[async_trait]
pub trait Room: Send + Sync {
    fn name(&self) -> &str;

    /// Current members, the local one included once joined.
    fn members(&self) -> Vec<MemberDescriptor>;

    /// Publications currently available in the room.
    fn publications(&self) -> Vec<Publication>;

    /// A fresh receiver for the room's notifications.
    fn events(&self) -> Receiver<RoomEvent>;

    async fn join(&self, display_name: &str) -> Result<LocalMember>;

    async fn publish(&self, member_id: &str, stream: StreamHandle) -> Result<Publication>;

    /// Subscribes to `publication`. `Ok(None)` is a subscription that carries
    /// no stream.
    async fn subscribe(
        &self,
        member_id: &str,
        publication: &Publication,
    ) -> Result<Option<StreamHandle>>;

    async fn leave(&self, member_id: &str) -> Result<()>;

    /// Releases the room. Called once after leaving.
    async fn dispose(&self);
}
