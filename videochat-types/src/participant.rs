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

//! Participants of a call and the member descriptors they are built from.

use crate::media::{ContentType, StreamHandle};
use serde::{Deserialize, Serialize};

/// A room member as reported by the communication SDK.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberDescriptor {
    pub id: String,
    pub name: Option<String>,
}

impl MemberDescriptor {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
        }
    }
}

/// The local user's membership, returned once joining a room succeeds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalMember {
    pub id: String,
    pub name: String,
}

impl From<&LocalMember> for MemberDescriptor {
    fn from(member: &LocalMember) -> Self {
        MemberDescriptor {
            id: member.id.clone(),
            name: Some(member.name.clone()),
        }
    }
}

/// One visible member of the call.
///
/// Media handles are optional: a participant appears in the grid as soon as
/// the room reports them and gets its video and audio attached later, once
/// capture or subscription completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: Option<String>,
    pub is_local: bool,
    pub video: Option<StreamHandle>,
    pub audio: Option<StreamHandle>,
}

impl Participant {
    /// A remote participant without any media attached.
    pub fn remote(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
            is_local: false,
            video: None,
            audio: None,
        }
    }

    pub fn local(member: &LocalMember) -> Self {
        Self {
            id: member.id.clone(),
            name: Some(member.name.clone()),
            is_local: true,
            video: None,
            audio: None,
        }
    }

    /// Caption shown on the participant's card. A member without a name
    /// gets no caption.
    pub fn display_label(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        Some(if self.is_local {
            format!("{name}(me)")
        } else {
            name.to_string()
        })
    }

    pub fn stream(&self, content_type: ContentType) -> Option<&StreamHandle> {
        match content_type {
            ContentType::Video => self.video.as_ref(),
            ContentType::Audio => self.audio.as_ref(),
        }
    }

    /// Replaces the handle for `content_type`, returning the previous one.
    pub fn set_stream(
        &mut self,
        content_type: ContentType,
        stream: Option<StreamHandle>,
    ) -> Option<StreamHandle> {
        let slot = match content_type {
            ContentType::Video => &mut self.video,
            ContentType::Audio => &mut self.audio,
        };
        std::mem::replace(slot, stream)
    }

    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    pub fn has_media(&self) -> bool {
        self.video.is_some() || self.audio.is_some()
    }
}
