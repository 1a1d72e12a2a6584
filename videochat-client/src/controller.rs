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

//! Call controller: drives the SDK through the call flow and keeps the
//! participant collection in sync with the room.
//!
//! All writes to the collection happen on a single task, the update loop.
//! The call flow, the room event forwarder and every subscription run as
//! separate tasks and report back to it through an unbounded channel, so
//! readers only ever observe complete collections.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use videochat_client::simulated::{SimulatedCapture, SimulatedSfu};
//! use videochat_client::{ClientOptions, VideoChatController};
//!
//! #[tokio::main]
//! async fn main() -> videochat_client::Result<()> {
//!     let controller = VideoChatController::new(
//!         Arc::new(SimulatedSfu::new()),
//!         Arc::new(SimulatedCapture::new()),
//!         ClientOptions::default(),
//!     )?;
//!     let mut participants = controller.watch();
//!     controller.join_room()?;
//!
//!     participants.changed().await.ok();
//!     for p in participants.borrow().iter() {
//!         println!("{}", p.display_label().unwrap_or_default());
//!     }
//!
//!     controller.leave().await.ok();
//!     Ok(())
//! }
//! ```

use crate::capture::{capture_first_camera, MediaCapture};
use crate::config::ClientOptions;
use crate::context::SessionContext;
use crate::error::{ChatError, Result};
use crate::event_bus::EventBus;
use crate::events::{ClientEvent, FlowStep};
use crate::roster;
use crate::session::{Room, RoomEvent, RoomService};
use crate::store::{ParticipantStore, Snapshot};
use crate::utils::lock;
use async_broadcast::RecvError;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use videochat_types::{
    ContentType, LocalMember, MemberDescriptor, Participant, Publication, StreamHandle,
};

/// Completions and notifications applied by the update loop.
#[derive(Debug)]
enum Update {
    Roster(Vec<MemberDescriptor>),
    Joined(LocalMember),
    LocalStream(StreamHandle),
    Subscribed {
        publication_id: String,
        publisher_id: String,
        stream: StreamHandle,
    },
    Unpublished(Publication),
    /// Full publication list, after room events were missed.
    Publications(Vec<Publication>),
    MemberJoined(String),
    MemberLeft(String),
    SessionEnded(oneshot::Sender<()>),
}

/// State shared by the controller and its tasks.
struct Shared {
    store: ParticipantStore,
    bus: EventBus,
    context: Mutex<SessionContext>,
    room: Mutex<Option<Arc<dyn Room>>>,
    subscribed: Mutex<HashSet<String>>,
    ended: AtomicBool,
    /// Held for every write to the collection, so a leave that outlived the
    /// update loop cannot interleave with an update still being applied.
    writer: Mutex<()>,
}

impl Shared {
    fn local_member_id(&self) -> Option<String> {
        lock(&self.context).local_member_id.clone()
    }

    fn fail(&self, step: FlowStep, err: ChatError) {
        match step {
            FlowStep::Setup | FlowStep::FindRoom | FlowStep::Join => {
                error!("{step} failed: {err}")
            }
            _ => warn!("{step} failed: {err}"),
        }
        self.bus.emit(ClientEvent::StepFailed {
            step,
            reason: err.to_string(),
        });
    }

    fn end_session(&self) {
        let _writer = lock(&self.writer);
        self.clear_session();
    }

    /// Clears the collection once per session. Callers hold `writer`.
    fn clear_session(&self) {
        if self.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        let dropped = self.store.snapshot();
        self.store.clear();
        lock(&self.context).local_member_id = None;
        lock(&self.subscribed).clear();
        for participant in dropped.iter() {
            self.bus
                .emit(ClientEvent::ParticipantRemoved(participant.id.clone()));
        }
        self.bus.emit(ClientEvent::Left);
        info!("Session ended, participant collection cleared");
    }
}

/// Drives one call: joins a room, publishes local media, subscribes to remote
/// media and exposes the resulting participant collection.
pub struct VideoChatController {
    shared: Arc<Shared>,
    updates: mpsc::UnboundedSender<Update>,
    service: Arc<dyn RoomService>,
    capture: Arc<dyn MediaCapture>,
    options: ClientOptions,
    runtime: Handle,
    cancel: CancellationToken,
    flow_cancel: CancellationToken,
    started: AtomicBool,
}

impl VideoChatController {
    /// Create a controller and start its update loop.
    ///
    /// Must be called from within a tokio runtime. The call itself does not
    /// start until [`join_room`](Self::join_room).
    pub fn new(
        service: Arc<dyn RoomService>,
        capture: Arc<dyn MediaCapture>,
        options: ClientOptions,
    ) -> Result<Self> {
        options.validate()?;
        let runtime = Handle::try_current().map_err(|e| ChatError::Runtime(e.to_string()))?;
        let context = options.session_context();
        info!(
            "Creating VideoChatController for '{}' in room '{}'",
            context.display_name, options.room_name
        );

        let shared = Arc::new(Shared {
            store: ParticipantStore::new(),
            bus: EventBus::new(),
            context: Mutex::new(context),
            room: Mutex::new(None),
            subscribed: Mutex::new(HashSet::new()),
            ended: AtomicBool::new(false),
            writer: Mutex::new(()),
        });
        let (updates, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let flow_cancel = cancel.child_token();

        runtime.spawn(run_updates(shared.clone(), rx, cancel.clone()));

        Ok(Self {
            shared,
            updates,
            service,
            capture,
            options,
            runtime,
            cancel,
            flow_cancel,
            started: AtomicBool::new(false),
        })
    }

    /// Start the call flow: set up the SDK, find or create the room, join it,
    /// capture and publish local media and subscribe to remote media.
    ///
    /// Each step that fails is logged and reported as
    /// [`ClientEvent::StepFailed`]; the returned handle completes when the
    /// flow has run as far as it could.
    pub fn join_room(&self) -> Result<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ChatError::AlreadyStarted);
        }
        let flow = CallFlow {
            shared: self.shared.clone(),
            updates: self.updates.clone(),
            service: self.service.clone(),
            capture: self.capture.clone(),
            options: self.options.clone(),
            cancel: self.flow_cancel.clone(),
        };
        let cancel = self.flow_cancel.clone();
        Ok(self.runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => debug!("Call flow cancelled"),
                _ = flow.run() => {}
            }
        }))
    }

    /// Leave the room and clear the participant collection.
    ///
    /// The leave runs on the runtime the controller was created on and is
    /// not tied to the controller's lifetime: dropping the controller, or the
    /// returned handle, does not abort it. Once the handle completes the
    /// collection is empty.
    pub fn leave(&self) -> JoinHandle<()> {
        self.flow_cancel.cancel();
        let shared = self.shared.clone();
        let updates = self.updates.clone();
        let loop_cancel = self.cancel.clone();
        self.runtime.spawn(async move {
            let room = lock(&shared.room).take();
            let member_id = shared.local_member_id();
            match (room, member_id) {
                (Some(room), Some(member_id)) => {
                    info!("Leaving room '{}' as {}", room.name(), member_id);
                    if let Err(e) = room.leave(&member_id).await {
                        shared.fail(FlowStep::Leave, e);
                    }
                    room.dispose().await;
                }
                (Some(room), None) => {
                    debug!("Disposing room '{}' without having joined", room.name());
                    room.dispose().await;
                }
                (None, _) => shared.fail(FlowStep::Leave, ChatError::NotJoined),
            }
            // The loop may be gone or stop before getting to the request.
            let (done, ended) = oneshot::channel();
            if loop_cancel.is_cancelled()
                || updates.send(Update::SessionEnded(done)).is_err()
                || ended.await.is_err()
            {
                shared.end_session();
            }
        })
    }

    /// The current participant collection.
    pub fn participants(&self) -> Snapshot {
        self.shared.store.snapshot()
    }

    /// A receiver notified on every change of the participant collection.
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.shared.store.subscribe()
    }

    pub fn events(&self) -> async_broadcast::Receiver<ClientEvent> {
        self.shared.bus.subscribe()
    }

    pub fn context(&self) -> SessionContext {
        lock(&self.shared.context).clone()
    }

    pub fn local_participant(&self) -> Option<Participant> {
        self.shared.store.local()
    }

    pub fn room_name(&self) -> &str {
        &self.options.room_name
    }
}

impl Drop for VideoChatController {
    fn drop(&mut self) {
        debug!("Dropping VideoChatController for '{}'", self.options.room_name);
        self.cancel.cancel();
    }
}

/// The sequence of SDK calls that brings the local user into the room.
struct CallFlow {
    shared: Arc<Shared>,
    updates: mpsc::UnboundedSender<Update>,
    service: Arc<dyn RoomService>,
    capture: Arc<dyn MediaCapture>,
    options: ClientOptions,
    cancel: CancellationToken,
}

impl CallFlow {
    async fn run(self) {
        if let Err(e) = self.service.setup(&self.options.auth_token).await {
            self.shared.fail(FlowStep::Setup, e);
            return;
        }
        self.shared.bus.emit(ClientEvent::SetupComplete);

        let room = match self.service.find_or_create_room(&self.options.room_name).await {
            Ok(Some(room)) => room,
            Ok(None) => {
                self.shared.fail(
                    FlowStep::FindRoom,
                    ChatError::RoomUnavailable(self.options.room_name.clone()),
                );
                return;
            }
            Err(e) => {
                self.shared.fail(FlowStep::FindRoom, e);
                return;
            }
        };
        *lock(&self.shared.room) = Some(room.clone());
        self.shared
            .bus
            .emit(ClientEvent::RoomReady(room.name().to_string()));

        // Subscribe before joining so no membership change is missed.
        tokio::spawn(forward_room_events(
            self.shared.clone(),
            self.updates.clone(),
            room.clone(),
            room.events(),
            self.cancel.clone(),
        ));

        let display_name = lock(&self.shared.context).display_name.clone();
        let me = match room.join(&display_name).await {
            Ok(me) => me,
            Err(e) => {
                self.shared.fail(FlowStep::Join, e);
                return;
            }
        };
        info!("Joined '{}' as {} ({})", room.name(), me.name, me.id);
        self.send(Update::Joined(me.clone()));
        self.send(Update::Roster(room.members()));

        if self.options.enable_video {
            match capture_first_camera(self.capture.as_ref(), self.options.capture).await {
                Ok(stream) => self.publish_local(room.as_ref(), &me, stream).await,
                Err(e) => self.shared.fail(FlowStep::CaptureVideo, e),
            }
        }
        if self.options.enable_audio {
            match self.capture.start_audio().await {
                Ok(stream) => self.publish_local(room.as_ref(), &me, stream).await,
                Err(e) => self.shared.fail(FlowStep::CaptureAudio, e),
            }
        }

        for publication in room.publications() {
            spawn_subscription(
                self.shared.clone(),
                self.updates.clone(),
                room.clone(),
                me.id.clone(),
                publication,
                self.cancel.clone(),
            );
        }
    }

    async fn publish_local(&self, room: &dyn Room, me: &LocalMember, stream: StreamHandle) {
        let content_type = stream.content_type();
        self.send(Update::LocalStream(stream.clone()));
        match room.publish(&me.id, stream).await {
            Ok(publication) => {
                debug!("Published local {content_type} as {}", publication.id);
                self.shared
                    .bus
                    .emit(ClientEvent::LocalStreamPublished(content_type));
            }
            Err(e) => self.shared.fail(FlowStep::Publish, e),
        }
    }

    fn send(&self, update: Update) {
        if self.updates.send(update).is_err() {
            debug!("Update loop gone, dropping update");
        }
    }
}

/// Subscribes to `publication` unless it is our own or already subscribed.
fn spawn_subscription(
    shared: Arc<Shared>,
    updates: mpsc::UnboundedSender<Update>,
    room: Arc<dyn Room>,
    member_id: String,
    publication: Publication,
    cancel: CancellationToken,
) {
    if publication.publisher_id == member_id {
        return;
    }
    if !lock(&shared.subscribed).insert(publication.id.clone()) {
        return;
    }
    tokio::spawn(async move {
        let result = tokio::select! {
            _ = cancel.cancelled() => return,
            result = room.subscribe(&member_id, &publication) => result,
        };
        match result {
            Ok(Some(stream)) => {
                let _ = updates.send(Update::Subscribed {
                    publication_id: publication.id,
                    publisher_id: publication.publisher_id,
                    stream,
                });
            }
            Ok(None) => {
                lock(&shared.subscribed).remove(&publication.id);
                shared.fail(FlowStep::Subscribe, ChatError::EmptyStream(publication.id));
            }
            Err(e) => {
                lock(&shared.subscribed).remove(&publication.id);
                shared.fail(FlowStep::Subscribe, e);
            }
        }
    });
}

/// Turns room notifications into updates until cancelled or the room closes.
async fn forward_room_events(
    shared: Arc<Shared>,
    updates: mpsc::UnboundedSender<Update>,
    room: Arc<dyn Room>,
    mut events: async_broadcast::Receiver<RoomEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };
        let update = match event {
            Ok(RoomEvent::MembershipChanged(members)) => Update::Roster(members),
            Ok(RoomEvent::MemberJoined(member)) => Update::MemberJoined(member.id),
            Ok(RoomEvent::MemberLeft(member_id)) => Update::MemberLeft(member_id),
            Ok(RoomEvent::StreamPublished(publication)) => {
                // Publications seen before joining are picked up by the
                // sweep right after join.
                if let Some(member_id) = shared.local_member_id() {
                    spawn_subscription(
                        shared.clone(),
                        updates.clone(),
                        room.clone(),
                        member_id,
                        publication,
                        cancel.clone(),
                    );
                }
                continue;
            }
            Ok(RoomEvent::StreamUnpublished(publication)) => {
                lock(&shared.subscribed).remove(&publication.id);
                Update::Unpublished(publication)
            }
            Err(RecvError::Overflowed(missed)) => {
                warn!("Missed {missed} room events, resynchronizing roster and publications");
                let publications = room.publications();
                if updates.send(Update::Roster(room.members())).is_err() {
                    break;
                }
                if let Some(member_id) = shared.local_member_id() {
                    for publication in &publications {
                        spawn_subscription(
                            shared.clone(),
                            updates.clone(),
                            room.clone(),
                            member_id.clone(),
                            publication.clone(),
                            cancel.clone(),
                        );
                    }
                }
                Update::Publications(publications)
            }
            Err(RecvError::Closed) => break,
        };
        if updates.send(update).is_err() {
            break;
        }
    }
    debug!("Room event forwarder for '{}' stopped", room.name());
}

/// The single writer of the participant collection.
async fn run_updates(
    shared: Arc<Shared>,
    mut rx: mpsc::UnboundedReceiver<Update>,
    cancel: CancellationToken,
) {
    loop {
        let update = tokio::select! {
            _ = cancel.cancelled() => break,
            update = rx.recv() => match update {
                Some(update) => update,
                None => break,
            },
        };
        apply(&shared, update);
    }
    debug!("Update loop stopped");
}

fn apply(shared: &Shared, update: Update) {
    let _writer = lock(&shared.writer);
    if shared.ended.load(Ordering::SeqCst) {
        debug!("Ignoring {update:?} after session end");
        return;
    }
    match update {
        Update::Roster(members) => apply_roster(shared, &members),
        Update::Joined(me) => {
            lock(&shared.context).local_member_id = Some(me.id.clone());
            let known = shared.store.modify(&me.id, |p| {
                p.is_local = true;
                p.name = Some(me.name.clone());
            });
            if !known {
                shared.store.update(|current| {
                    let mut next = current.to_vec();
                    next.push(Participant::local(&me));
                    next
                });
                shared.bus.emit(ClientEvent::ParticipantAdded(me.id.clone()));
            }
            shared.bus.emit(ClientEvent::Joined {
                member_id: me.id,
                display_name: me.name,
            });
        }
        Update::LocalStream(stream) => {
            let content_type = stream.content_type();
            let step = match content_type {
                ContentType::Video => FlowStep::CaptureVideo,
                ContentType::Audio => FlowStep::CaptureAudio,
            };
            let Some(member_id) = shared.local_member_id() else {
                shared.fail(step, ChatError::MissingLocalMember);
                return;
            };
            if !attach(shared, &member_id, stream) {
                shared.fail(step, ChatError::MissingLocalMember);
            }
        }
        Update::Subscribed {
            publication_id,
            publisher_id,
            stream,
        } => {
            if !lock(&shared.subscribed).contains(&publication_id) {
                debug!("{publication_id} was unpublished while subscribing, dropping its stream");
                return;
            }
            if !attach(shared, &publisher_id, stream) {
                warn!("Subscribed stream for {publisher_id} arrived after they left, dropping it");
            }
        }
        Update::Unpublished(publication) => {
            let attached = shared
                .store
                .get(&publication.publisher_id)
                .and_then(|p| p.stream(publication.content_type).cloned());
            match attached {
                Some(stream) if stream.id() == publication.stream_id => {
                    shared.store.modify(&publication.publisher_id, |p| {
                        p.set_stream(publication.content_type, None);
                    });
                    shared.bus.emit(ClientEvent::StreamDetached {
                        participant_id: publication.publisher_id,
                        content_type: publication.content_type,
                    });
                }
                _ => debug!("Unpublished {} was not attached", publication.id),
            }
        }
        Update::Publications(publications) => detach_unpublished(shared, &publications),
        Update::MemberJoined(member_id) => {
            shared.bus.emit(ClientEvent::MemberJoined(member_id));
        }
        Update::MemberLeft(member_id) => {
            shared.bus.emit(ClientEvent::MemberLeft(member_id));
        }
        Update::SessionEnded(done) => {
            shared.clear_session();
            let _ = done.send(());
        }
    }
}

fn apply_roster(shared: &Shared, members: &[MemberDescriptor]) {
    let context = lock(&shared.context).clone();
    let mut members = members.to_vec();
    // The local record lives from the join to the leave; a roster the room
    // sent before our join must not drop it.
    if let Some(local_id) = &context.local_member_id {
        if !members.iter().any(|m| m.id == *local_id) {
            members.push(MemberDescriptor::new(
                local_id.clone(),
                Some(context.display_name.as_str()),
            ));
        }
    }

    let current = shared.store.snapshot();
    let mut update = roster::reconcile(&current, &members);
    let mut relabeled = false;
    if let Some(local_id) = &context.local_member_id {
        if let Some(me) = update
            .participants
            .iter_mut()
            .find(|p| p.id == *local_id && !p.is_local)
        {
            me.is_local = true;
            me.name = Some(context.display_name.clone());
            relabeled = true;
        }
    }
    if update.is_unchanged() && !relabeled {
        return;
    }
    shared.store.replace(update.participants);

    for participant in &update.dropped {
        // Handles are left to whoever owns the stream.
        if participant.has_media() {
            debug!(
                "{} dropped from roster with media still attached",
                participant.id
            );
        }
        shared
            .bus
            .emit(ClientEvent::ParticipantRemoved(participant.id.clone()));
    }
    for id in update.added {
        shared.bus.emit(ClientEvent::ParticipantAdded(id));
    }
}

/// Detaches remote streams whose publication is no longer in `publications`.
fn detach_unpublished(shared: &Shared, publications: &[Publication]) {
    lock(&shared.subscribed).retain(|id| publications.iter().any(|p| p.id == *id));

    let local_id = shared.local_member_id();
    let mut stale = Vec::new();
    for participant in shared.store.snapshot().iter() {
        if local_id.as_deref() == Some(participant.id.as_str()) {
            continue;
        }
        for content_type in [ContentType::Video, ContentType::Audio] {
            let Some(stream) = participant.stream(content_type) else {
                continue;
            };
            let published = publications
                .iter()
                .any(|p| p.publisher_id == participant.id && p.stream_id == stream.id());
            if !published {
                stale.push((participant.id.clone(), content_type));
            }
        }
    }

    for (participant_id, content_type) in stale {
        debug!("{content_type} of {participant_id} is no longer published, detaching");
        shared.store.modify(&participant_id, |p| {
            p.set_stream(content_type, None);
        });
        shared.bus.emit(ClientEvent::StreamDetached {
            participant_id,
            content_type,
        });
    }
}

/// Attaches `stream` to the participant `id`. Never adds a participant.
fn attach(shared: &Shared, id: &str, stream: StreamHandle) -> bool {
    let content_type = stream.content_type();
    let attached = shared.store.modify(id, |p| {
        p.set_stream(content_type, Some(stream));
    });
    if attached {
        shared.bus.emit(ClientEvent::StreamAttached {
            participant_id: id.to_string(),
            content_type,
        });
    }
    attached
}
