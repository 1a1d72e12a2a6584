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

//! Framework-agnostic event types for the videochat client.
//!
//! These events are emitted via the [`EventBus`](crate::EventBus) and can be
//! consumed by any front end. They describe what happened; the participant
//! collection itself is observed through the store.

use std::fmt;
use videochat_types::ContentType;

/// Steps of the call flow, used to tag failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowStep {
    Setup,
    FindRoom,
    Join,
    CaptureVideo,
    CaptureAudio,
    Publish,
    Subscribe,
    Leave,
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowStep::Setup => "setup",
            FlowStep::FindRoom => "find room",
            FlowStep::Join => "join",
            FlowStep::CaptureVideo => "capture video",
            FlowStep::CaptureAudio => "capture audio",
            FlowStep::Publish => "publish",
            FlowStep::Subscribe => "subscribe",
            FlowStep::Leave => "leave",
        };
        f.write_str(name)
    }
}

/// Events emitted by the [`VideoChatController`](crate::VideoChatController).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    // === Session Events ===
    /// The communication SDK accepted its configuration
    SetupComplete,

    /// The room was found or created
    RoomReady(String),

    /// The local user joined the room
    Joined {
        member_id: String,
        display_name: String,
    },

    /// The local user left and the collection was cleared
    Left,

    // === Roster Events ===
    /// A record was added to the participant collection
    ParticipantAdded(String),

    /// A record was removed from the participant collection
    ParticipantRemoved(String),

    /// The room reported a member joining
    MemberJoined(String),

    /// The room reported a member leaving
    MemberLeft(String),

    // === Media Events ===
    /// A locally captured stream was published to the room
    LocalStreamPublished(ContentType),

    /// A stream handle was attached to a participant
    StreamAttached {
        participant_id: String,
        content_type: ContentType,
    },

    /// A stream handle was removed from a participant
    StreamDetached {
        participant_id: String,
        content_type: ContentType,
    },

    // === Failures ===
    /// A step of the call flow failed and was abandoned
    StepFailed { step: FlowStep, reason: String },
}
