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

//! In-process SFU backend.
//!
//! Implements [`RoomService`], [`Room`] and [`MediaCapture`] entirely in memory
//! so the call flow can run without a real SDK: the CLI uses it for demos and
//! the tests use it to script remote members. No media is actually carried;
//! streams are bare handles.

use crate::capture::MediaCapture;
use crate::error::{ChatError, Result};
use crate::session::{Room, RoomEvent, RoomService};
use crate::utils::lock;
use async_broadcast::{broadcast, InactiveReceiver, Receiver, Sender};
use async_trait::async_trait;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use videochat_types::{
    CaptureOptions, ContentType, LocalMember, MemberDescriptor, Publication, StreamHandle,
    StreamOrigin, VideoDevice,
};

const ROOM_EVENT_CAPACITY: usize = 128;

/// Steps of the call flow the simulation should fail.
#[derive(Clone, Debug, Default)]
pub struct Faults {
    pub setup: bool,
    /// `find_or_create_room` answers with no room.
    pub room_unavailable: bool,
    pub join: bool,
    pub publish: bool,
    pub subscribe: bool,
    /// Subscriptions succeed but carry no stream.
    pub empty_stream: bool,
}

/// Entry point of the simulated SDK.
#[derive(Debug, Default)]
pub struct SimulatedSfu {
    rooms: Mutex<HashMap<String, Arc<SimulatedRoom>>>,
    faults: Faults,
    latency: Duration,
    initialized: AtomicBool,
}

impl SimulatedSfu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: Faults) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    /// Delays every room operation by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Returns the room called `name`, creating it if needed.
    pub fn room(&self, name: &str) -> Arc<SimulatedRoom> {
        lock(&self.rooms)
            .entry(name.to_string())
            .or_insert_with(|| {
                info!("Creating simulated room '{name}'");
                Arc::new(SimulatedRoom::new(
                    name,
                    self.faults.clone(),
                    self.latency,
                ))
            })
            .clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RoomService for SimulatedSfu {
    async fn setup(&self, auth_token: &str) -> Result<()> {
        if self.faults.setup {
            return Err(ChatError::Setup("auth token rejected".to_string()));
        }
        debug!("Simulated SDK set up (token length {})", auth_token.len());
        self.initialized.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn find_or_create_room(&self, name: &str) -> Result<Option<Arc<dyn Room>>> {
        if !self.is_initialized() {
            return Err(ChatError::Setup("SDK not initialized".to_string()));
        }
        if self.faults.room_unavailable {
            return Ok(None);
        }
        let room: Arc<dyn Room> = self.room(name);
        Ok(Some(room))
    }
}

#[derive(Debug, Default)]
struct RoomState {
    members: Vec<MemberDescriptor>,
    publications: Vec<Publication>,
    disposed: bool,
}

/// A room of the simulated SFU.
pub struct SimulatedRoom {
    name: String,
    state: Mutex<RoomState>,
    events: Sender<RoomEvent>,
    _keepalive: InactiveReceiver<RoomEvent>,
    next_id: AtomicU64,
    faults: Faults,
    latency: Duration,
}

impl std::fmt::Debug for SimulatedRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedRoom")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SimulatedRoom {
    fn new(name: &str, faults: Faults, latency: Duration) -> Self {
        let (mut events, receiver) = broadcast(ROOM_EVENT_CAPACITY);
        events.set_overflow(true);
        Self {
            name: name.to_string(),
            state: Mutex::new(RoomState::default()),
            events,
            _keepalive: receiver.deactivate(),
            next_id: AtomicU64::new(1),
            faults,
            latency,
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn emit(&self, event: RoomEvent) {
        let _ = self.events.try_broadcast(event);
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Adds a remote member, as if another device joined.
    pub fn add_remote_member(&self, name: &str) -> MemberDescriptor {
        let member = MemberDescriptor::new(self.next_id("member"), Some(name));
        let members = {
            let mut state = lock(&self.state);
            state.members.push(member.clone());
            state.members.clone()
        };
        debug!("'{}' joined room '{}' as {}", name, self.name, member.id);
        self.emit(RoomEvent::MemberJoined(member.clone()));
        self.emit(RoomEvent::MembershipChanged(members));
        member
    }

    /// Removes a member together with everything it published.
    pub fn remove_member(&self, member_id: &str) -> bool {
        let (removed, unpublished, members) = {
            let mut state = lock(&self.state);
            let before = state.members.len();
            state.members.retain(|m| m.id != member_id);
            let removed = state.members.len() != before;
            let (unpublished, kept): (Vec<_>, Vec<_>) = state
                .publications
                .drain(..)
                .partition(|p| p.publisher_id == member_id);
            state.publications = kept;
            (removed, unpublished, state.members.clone())
        };
        if !removed {
            return false;
        }
        for publication in unpublished {
            self.emit(RoomEvent::StreamUnpublished(publication));
        }
        self.emit(RoomEvent::MemberLeft(member_id.to_string()));
        self.emit(RoomEvent::MembershipChanged(members));
        true
    }

    /// Publishes a stream on behalf of a remote member.
    pub fn publish_remote(
        &self,
        member_id: &str,
        content_type: ContentType,
    ) -> Option<Publication> {
        let publication = Publication {
            id: self.next_id("pub"),
            publisher_id: member_id.to_string(),
            content_type,
            stream_id: self.next_id("stream"),
        };
        {
            let mut state = lock(&self.state);
            if !state.members.iter().any(|m| m.id == member_id) {
                return None;
            }
            state.publications.push(publication.clone());
        }
        self.emit(RoomEvent::StreamPublished(publication.clone()));
        Some(publication)
    }

    pub fn unpublish(&self, publication_id: &str) -> Option<Publication> {
        let publication = {
            let mut state = lock(&self.state);
            let index = state
                .publications
                .iter()
                .position(|p| p.id == publication_id)?;
            state.publications.remove(index)
        };
        self.emit(RoomEvent::StreamUnpublished(publication.clone()));
        Some(publication)
    }

    pub fn has_member(&self, member_id: &str) -> bool {
        lock(&self.state).members.iter().any(|m| m.id == member_id)
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.state).disposed
    }
}

#[async_trait]
impl Room for SimulatedRoom {
    fn name(&self) -> &str {
        &self.name
    }

    fn members(&self) -> Vec<MemberDescriptor> {
        lock(&self.state).members.clone()
    }

    fn publications(&self) -> Vec<Publication> {
        lock(&self.state).publications.clone()
    }

    fn events(&self) -> Receiver<RoomEvent> {
        self.events.new_receiver()
    }

    async fn join(&self, display_name: &str) -> Result<LocalMember> {
        self.delay().await;
        if self.faults.join {
            return Err(ChatError::Join(format!("room '{}' refused member", self.name)));
        }
        let member = self.add_remote_member(display_name);
        Ok(LocalMember {
            id: member.id,
            name: display_name.to_string(),
        })
    }

    async fn publish(&self, member_id: &str, stream: StreamHandle) -> Result<Publication> {
        self.delay().await;
        if self.faults.publish {
            return Err(ChatError::Publish(format!("{} rejected", stream.id())));
        }
        let publication = Publication {
            id: self.next_id("pub"),
            publisher_id: member_id.to_string(),
            content_type: stream.content_type(),
            stream_id: stream.id().to_string(),
        };
        {
            let mut state = lock(&self.state);
            if !state.members.iter().any(|m| m.id == member_id) {
                return Err(ChatError::Publish(format!("{member_id} is not in the room")));
            }
            state.publications.push(publication.clone());
        }
        self.emit(RoomEvent::StreamPublished(publication.clone()));
        Ok(publication)
    }

    async fn subscribe(
        &self,
        member_id: &str,
        publication: &Publication,
    ) -> Result<Option<StreamHandle>> {
        self.delay().await;
        if self.faults.subscribe {
            return Err(ChatError::Subscribe(format!("{} rejected", publication.id)));
        }
        let known = lock(&self.state)
            .publications
            .iter()
            .any(|p| p.id == publication.id);
        if !known {
            return Err(ChatError::Subscribe(format!(
                "{} is no longer published",
                publication.id
            )));
        }
        if self.faults.empty_stream {
            return Ok(None);
        }
        debug!("{member_id} subscribed to {}", publication.id);
        Ok(Some(StreamHandle::new(
            publication.stream_id.clone(),
            publication.content_type,
            StreamOrigin::Remote,
        )))
    }

    async fn leave(&self, member_id: &str) -> Result<()> {
        self.delay().await;
        if self.remove_member(member_id) {
            Ok(())
        } else {
            Err(ChatError::NotJoined)
        }
    }

    async fn dispose(&self) {
        lock(&self.state).disposed = true;
        debug!("Room '{}' disposed", self.name);
    }
}

/// Capture facility producing local stream handles.
#[derive(Debug)]
pub struct SimulatedCapture {
    devices: Vec<VideoDevice>,
    fail: bool,
    next_id: AtomicU64,
}

impl Default for SimulatedCapture {
    fn default() -> Self {
        Self::with_devices(vec![
            VideoDevice {
                id: "camera-front".to_string(),
                name: "Simulated Front Camera".to_string(),
            },
            VideoDevice {
                id: "camera-back".to_string(),
                name: "Simulated Back Camera".to_string(),
            },
        ])
    }
}

impl SimulatedCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: Vec<VideoDevice>) -> Self {
        Self {
            devices,
            fail: false,
            next_id: AtomicU64::new(1),
        }
    }

    /// A facility whose sources refuse to start.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

#[async_trait]
impl MediaCapture for SimulatedCapture {
    fn video_devices(&self) -> Vec<VideoDevice> {
        self.devices.clone()
    }

    async fn start_video(
        &self,
        device: &VideoDevice,
        options: CaptureOptions,
    ) -> Result<StreamHandle> {
        if self.fail {
            return Err(ChatError::Capture(format!("{} busy", device.name)));
        }
        debug!("Started {} at {}", device.name, options.resolution);
        Ok(StreamHandle::new(
            self.next_id("local-video"),
            ContentType::Video,
            StreamOrigin::Local,
        ))
    }

    async fn start_audio(&self) -> Result<StreamHandle> {
        if self.fail {
            return Err(ChatError::Capture("microphone busy".to_string()));
        }
        Ok(StreamHandle::new(
            self.next_id("local-audio"),
            ContentType::Audio,
            StreamOrigin::Local,
        ))
    }
}
