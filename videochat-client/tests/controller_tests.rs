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

//! Integration tests for the VideoChatController against the simulated SFU.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use videochat_client::simulated::{Faults, SimulatedCapture, SimulatedRoom, SimulatedSfu};
use videochat_client::videochat_types::{ContentType, Participant};
use videochat_client::{
    ChatError, ClientEvent, ClientOptions, FlowStep, Room, Snapshot, VideoChatController,
};

const ROOM: &str = "test-room";
const WAIT: Duration = Duration::from_secs(5);

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn options() -> ClientOptions {
    ClientOptions {
        room_name: ROOM.to_string(),
        display_name: Some("Alice_1".to_string()),
        ..Default::default()
    }
}

fn controller(sfu: &Arc<SimulatedSfu>) -> VideoChatController {
    VideoChatController::new(sfu.clone(), Arc::new(SimulatedCapture::new()), options()).unwrap()
}

async fn wait_for<F>(controller: &VideoChatController, mut predicate: F) -> Snapshot
where
    F: FnMut(&[Participant]) -> bool,
{
    let mut rx = controller.watch();
    let snapshot = timeout(WAIT, rx.wait_for(|s| predicate(s.as_slice())))
        .await
        .expect("timed out waiting for participants")
        .expect("store closed");
    Arc::clone(&snapshot)
}

async fn expect_event<F>(
    rx: &mut async_broadcast::Receiver<ClientEvent>,
    predicate: F,
) -> ClientEvent
where
    F: Fn(&ClientEvent) -> bool,
{
    timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(event) if predicate(&event) => return event,
                Ok(_) => continue,
                Err(e) => panic!("event bus failed: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

fn find<'a>(participants: &'a [Participant], id: &str) -> Option<&'a Participant> {
    participants.iter().find(|p| p.id == id)
}

fn fully_joined(participants: &[Participant]) -> bool {
    participants
        .iter()
        .any(|p| p.is_local && p.video.is_some() && p.audio.is_some())
}

async fn joined(sfu: &Arc<SimulatedSfu>) -> (VideoChatController, Arc<SimulatedRoom>) {
    let controller = controller(sfu);
    controller.join_room().unwrap();
    wait_for(&controller, fully_joined).await;
    (controller, sfu.room(ROOM))
}

#[tokio::test]
async fn join_shows_local_participant_with_media() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::new());
    let controller = controller(&sfu);
    let mut events = controller.events();
    let mut published = controller.events();

    controller.join_room().unwrap();
    let participants = wait_for(&controller, fully_joined).await;

    assert_eq!(participants.len(), 1);
    let me = &participants[0];
    assert_eq!(me.display_label().as_deref(), Some("Alice_1(me)"));
    assert!(me.video.as_ref().unwrap().is_local());
    assert_eq!(controller.context().local_member_id.as_deref(), Some(me.id.as_str()));
    assert!(sfu.room(ROOM).has_member(&me.id));
    assert_eq!(controller.local_participant().unwrap().id, me.id);

    expect_event(&mut events, |e| *e == ClientEvent::SetupComplete).await;
    expect_event(&mut events, |e| *e == ClientEvent::RoomReady(ROOM.into())).await;
    expect_event(&mut events, |e| matches!(e, ClientEvent::Joined { .. })).await;
    // Published by the call flow, so not ordered against `Joined`.
    expect_event(&mut published, |e| {
        *e == ClientEvent::LocalStreamPublished(ContentType::Video)
    })
    .await;
}

#[tokio::test]
async fn existing_members_are_subscribed_on_join() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::new());
    let room = sfu.room(ROOM);
    let bob = room.add_remote_member("Bob");
    room.publish_remote(&bob.id, ContentType::Video).unwrap();
    room.publish_remote(&bob.id, ContentType::Audio).unwrap();

    let controller = controller(&sfu);
    controller.join_room().unwrap();

    let participants = wait_for(&controller, |ps| {
        fully_joined(ps)
            && find(ps, &bob.id).is_some_and(|b| b.video.is_some() && b.audio.is_some())
    })
    .await;

    let mut ids: Vec<&str> = participants.iter().map(|p| p.id.as_str()).collect();
    let mut expected: Vec<String> = room.members().into_iter().map(|m| m.id).collect();
    ids.sort_unstable();
    expected.sort_unstable();
    assert_eq!(ids, expected);
    let bob = find(&participants, &bob.id).unwrap();
    assert!(!bob.is_local);
    assert_eq!(bob.display_label().as_deref(), Some("Bob"));
    assert!(!bob.video.as_ref().unwrap().is_local());
}

#[tokio::test]
async fn later_members_are_appended_and_subscribed() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::new());
    let (controller, room) = joined(&sfu).await;
    let mut events = controller.events();

    let carol = room.add_remote_member("Carol");
    room.publish_remote(&carol.id, ContentType::Video).unwrap();

    let participants = wait_for(&controller, |ps| {
        find(ps, &carol.id).is_some_and(Participant::has_video)
    })
    .await;
    assert_eq!(participants.len(), 2);
    assert!(participants[0].is_local);
    assert_eq!(participants[1].id, carol.id);
    assert!(participants[1].audio.is_none());

    expect_event(&mut events, |e| *e == ClientEvent::MemberJoined(carol.id.clone())).await;
    expect_event(&mut events, |e| *e == ClientEvent::ParticipantAdded(carol.id.clone())).await;
}

#[tokio::test]
async fn departed_members_are_dropped() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::new());
    let (controller, room) = joined(&sfu).await;
    let bob = room.add_remote_member("Bob");
    room.publish_remote(&bob.id, ContentType::Video).unwrap();
    wait_for(&controller, |ps| find(ps, &bob.id).is_some_and(Participant::has_video)).await;
    let mut events = controller.events();

    room.remove_member(&bob.id);

    let participants = wait_for(&controller, |ps| find(ps, &bob.id).is_none()).await;
    assert_eq!(participants.len(), 1);
    assert!(participants[0].is_local);
    expect_event(&mut events, |e| *e == ClientEvent::ParticipantRemoved(bob.id.clone())).await;
}

#[tokio::test]
async fn unpublish_detaches_only_that_stream() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::new());
    let (controller, room) = joined(&sfu).await;
    let bob = room.add_remote_member("Bob");
    let video = room.publish_remote(&bob.id, ContentType::Video).unwrap();
    room.publish_remote(&bob.id, ContentType::Audio).unwrap();
    wait_for(&controller, |ps| {
        find(ps, &bob.id).is_some_and(|b| b.video.is_some() && b.audio.is_some())
    })
    .await;

    room.unpublish(&video.id).unwrap();

    let participants = wait_for(&controller, |ps| {
        find(ps, &bob.id).is_some_and(|b| b.video.is_none())
    })
    .await;
    let bob = find(&participants, &bob.id).unwrap();
    assert!(bob.audio.is_some());
}

#[tokio::test]
async fn roster_changes_keep_attached_streams() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::new());
    let (controller, room) = joined(&sfu).await;
    let bob = room.add_remote_member("Bob");
    room.publish_remote(&bob.id, ContentType::Video).unwrap();
    let before = wait_for(&controller, |ps| {
        find(ps, &bob.id).is_some_and(Participant::has_video)
    })
    .await;
    let bob_video = find(&before, &bob.id).unwrap().video.clone().unwrap();
    let my_video = before.iter().find(|p| p.is_local).unwrap().video.clone().unwrap();

    let dave = room.add_remote_member("Dave");
    let eve = room.add_remote_member("Eve");
    room.remove_member(&eve.id);

    let after = wait_for(&controller, |ps| {
        find(ps, &dave.id).is_some() && find(ps, &eve.id).is_none()
    })
    .await;
    let bob_after = find(&after, &bob.id).unwrap();
    assert!(bob_after.video.as_ref().unwrap().same_stream(&bob_video));
    let me_after = after.iter().find(|p| p.is_local).unwrap();
    assert!(me_after.video.as_ref().unwrap().same_stream(&my_video));
    assert!(find(&after, &dave.id).unwrap().video.is_none());
}

#[tokio::test]
async fn leave_clears_collection_and_room() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::new());
    let (controller, room) = joined(&sfu).await;
    room.add_remote_member("Bob");
    wait_for(&controller, |ps| ps.len() == 2).await;
    let me = controller.context().local_member_id.unwrap();
    let mut events = controller.events();

    controller.leave().await.unwrap();

    assert!(controller.participants().is_empty());
    assert!(!room.has_member(&me));
    assert!(room.is_disposed());
    assert!(controller.context().local_member_id.is_none());
    expect_event(&mut events, |e| *e == ClientEvent::Left).await;

    // Later room activity no longer reaches the collection.
    room.add_remote_member("Carol");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(controller.participants().is_empty());
}

#[tokio::test]
async fn leave_outlives_the_controller() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::new().with_latency(Duration::from_millis(30)));
    let (controller, room) = joined(&sfu).await;
    let me = controller.context().local_member_id.unwrap();

    let leaving = controller.leave();
    drop(controller);
    leaving.await.unwrap();

    assert!(!room.has_member(&me));
    assert!(room.is_disposed());
}

#[tokio::test]
async fn missed_room_events_are_recovered() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::new());
    let (controller, room) = joined(&sfu).await;
    let carol = room.add_remote_member("Carol");
    let carol_video = room.publish_remote(&carol.id, ContentType::Video).unwrap();
    wait_for(&controller, |ps| {
        find(ps, &carol.id).is_some_and(Participant::has_video)
    })
    .await;

    // Nothing else runs until the next await, so the forwarder falls behind
    // the room's event buffer.
    room.unpublish(&carol_video.id).unwrap();
    let bob = room.add_remote_member("Bob");
    room.publish_remote(&bob.id, ContentType::Video).unwrap();
    for _ in 0..40 {
        let filler = room.add_remote_member("Filler");
        room.remove_member(&filler.id);
    }

    let participants = wait_for(&controller, |ps| {
        ps.len() == 3
            && find(ps, &bob.id).is_some_and(Participant::has_video)
            && find(ps, &carol.id).is_some_and(|c| c.video.is_none())
    })
    .await;
    assert!(participants[0].is_local);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn leave_after_drop_is_not_overwritten() {
    init_logger();
    for _ in 0..20 {
        let sfu = Arc::new(SimulatedSfu::new());
        let (controller, room) = joined(&sfu).await;
        let churn = tokio::spawn({
            let room = room.clone();
            async move {
                for _ in 0..50 {
                    let member = room.add_remote_member("Churn");
                    tokio::task::yield_now().await;
                    room.remove_member(&member.id);
                }
            }
        });
        let participants = controller.watch();

        let leaving = controller.leave();
        drop(controller);
        leaving.await.unwrap();
        churn.await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(participants.borrow().is_empty());
    }
}

#[tokio::test]
async fn setup_failure_stops_the_flow() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::with_faults(Faults {
        setup: true,
        ..Default::default()
    }));
    let controller = controller(&sfu);
    let mut events = controller.events();

    controller.join_room().unwrap().await.unwrap();

    let event = expect_event(&mut events, |e| matches!(e, ClientEvent::StepFailed { .. })).await;
    assert!(matches!(event, ClientEvent::StepFailed { step: FlowStep::Setup, .. }));
    assert!(controller.participants().is_empty());
    assert!(!sfu.is_initialized());
}

#[tokio::test]
async fn missing_room_is_reported() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::with_faults(Faults {
        room_unavailable: true,
        ..Default::default()
    }));
    let controller = controller(&sfu);
    let mut events = controller.events();

    controller.join_room().unwrap().await.unwrap();

    match expect_event(&mut events, |e| matches!(e, ClientEvent::StepFailed { .. })).await {
        ClientEvent::StepFailed { step, reason } => {
            assert_eq!(step, FlowStep::FindRoom);
            assert!(reason.contains(ROOM));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn join_failure_leaves_collection_empty() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::with_faults(Faults {
        join: true,
        ..Default::default()
    }));
    let controller = controller(&sfu);
    let mut events = controller.events();

    controller.join_room().unwrap().await.unwrap();

    expect_event(&mut events, |e| {
        matches!(e, ClientEvent::StepFailed { step: FlowStep::Join, .. })
    })
    .await;
    assert!(controller.participants().is_empty());
    assert!(!controller.context().is_joined());
}

#[tokio::test]
async fn publish_failure_keeps_local_preview() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::with_faults(Faults {
        publish: true,
        ..Default::default()
    }));
    let controller = controller(&sfu);
    let mut events = controller.events();

    controller.join_room().unwrap().await.unwrap();

    expect_event(&mut events, |e| {
        matches!(e, ClientEvent::StepFailed { step: FlowStep::Publish, .. })
    })
    .await;
    let participants = wait_for(&controller, fully_joined).await;
    assert_eq!(participants.len(), 1);
    assert!(sfu.room(ROOM).publications().is_empty());
}

#[tokio::test]
async fn empty_subscription_is_a_failure() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::with_faults(Faults {
        empty_stream: true,
        ..Default::default()
    }));
    let room = sfu.room(ROOM);
    let bob = room.add_remote_member("Bob");
    let publication = room.publish_remote(&bob.id, ContentType::Video).unwrap();
    let controller = controller(&sfu);
    let mut events = controller.events();

    controller.join_room().unwrap();

    match expect_event(&mut events, |e| {
        matches!(e, ClientEvent::StepFailed { step: FlowStep::Subscribe, .. })
    })
    .await
    {
        ClientEvent::StepFailed { reason, .. } => {
            assert_eq!(reason, ChatError::EmptyStream(publication.id).to_string())
        }
        other => panic!("unexpected {other:?}"),
    }
    let participants = wait_for(&controller, |ps| find(ps, &bob.id).is_some()).await;
    assert!(find(&participants, &bob.id).unwrap().video.is_none());
}

#[tokio::test]
async fn missing_camera_still_publishes_audio() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::new());
    let controller = VideoChatController::new(
        sfu.clone(),
        Arc::new(SimulatedCapture::with_devices(vec![])),
        options(),
    )
    .unwrap();
    let mut events = controller.events();

    controller.join_room().unwrap().await.unwrap();

    expect_event(&mut events, |e| {
        matches!(e, ClientEvent::StepFailed { step: FlowStep::CaptureVideo, .. })
    })
    .await;
    let participants = wait_for(&controller, |ps| ps.iter().any(|p| p.audio.is_some())).await;
    assert!(participants[0].video.is_none());
    let publications = sfu.room(ROOM).publications();
    assert_eq!(publications.len(), 1);
    assert_eq!(publications[0].content_type, ContentType::Audio);
}

#[tokio::test]
async fn disabled_video_is_not_captured() {
    init_logger();
    let sfu = Arc::new(SimulatedSfu::new());
    let controller = VideoChatController::new(
        sfu.clone(),
        Arc::new(SimulatedCapture::new()),
        ClientOptions {
            enable_video: false,
            ..options()
        },
    )
    .unwrap();

    controller.join_room().unwrap().await.unwrap();

    let participants = wait_for(&controller, |ps| ps.iter().any(|p| p.audio.is_some())).await;
    assert!(participants[0].video.is_none());
}

#[tokio::test]
async fn join_room_runs_once() {
    let sfu = Arc::new(SimulatedSfu::new());
    let controller = controller(&sfu);
    controller.join_room().unwrap();
    assert!(matches!(controller.join_room(), Err(ChatError::AlreadyStarted)));
}

#[tokio::test]
async fn leave_without_joining_is_reported() {
    let sfu = Arc::new(SimulatedSfu::new());
    let controller = controller(&sfu);
    let mut events = controller.events();

    controller.leave().await.unwrap();

    expect_event(&mut events, |e| {
        matches!(e, ClientEvent::StepFailed { step: FlowStep::Leave, .. })
    })
    .await;
    expect_event(&mut events, |e| *e == ClientEvent::Left).await;
}

#[test]
fn controller_requires_a_runtime() {
    let result = VideoChatController::new(
        Arc::new(SimulatedSfu::new()),
        Arc::new(SimulatedCapture::new()),
        options(),
    );
    assert!(matches!(result, Err(ChatError::Runtime(_))));
}

#[tokio::test]
async fn invalid_options_are_rejected() {
    let result = VideoChatController::new(
        Arc::new(SimulatedSfu::new()),
        Arc::new(SimulatedCapture::new()),
        ClientOptions {
            room_name: String::new(),
            ..options()
        },
    );
    assert!(matches!(result, Err(ChatError::Config(_))));
}
