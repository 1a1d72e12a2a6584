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

//! Media stream handles, publications and capture settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Kind of media carried by a stream or publication.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Audio,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContentType::Video => write!(f, "video"),
            ContentType::Audio => write!(f, "audio"),
        }
    }
}

/// Whether a stream was captured on this device or received from the room.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamOrigin {
    Local,
    Remote,
}

/// Description of a media stream owned by the communication SDK.
#[derive(Debug, PartialEq, Eq)]
pub struct MediaStream {
    pub id: String,
    pub content_type: ContentType,
    pub origin: StreamOrigin,
}

/// Shared reference to a [`MediaStream`].
///
/// Handles compare by identity, not by value: two handles are equal only when
/// they point at the same underlying stream. Cloning a handle never creates a
/// new stream.
#[derive(Clone, Debug)]
pub struct StreamHandle(Arc<MediaStream>);

impl StreamHandle {
    pub fn new(id: impl Into<String>, content_type: ContentType, origin: StreamOrigin) -> Self {
        Self(Arc::new(MediaStream {
            id: id.into(),
            content_type,
            origin,
        }))
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn content_type(&self) -> ContentType {
        self.0.content_type
    }

    pub fn origin(&self) -> StreamOrigin {
        self.0.origin
    }

    pub fn is_local(&self) -> bool {
        self.0.origin == StreamOrigin::Local
    }

    /// Returns `true` if both handles refer to the same stream instance.
    pub fn same_stream(&self, other: &StreamHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for StreamHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_stream(other)
    }
}

impl Eq for StreamHandle {}

/// Announcement that a member has made a stream available in the room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub id: String,
    pub publisher_id: String,
    pub content_type: ContentType,
    pub stream_id: String,
}

/// A video source that can be captured from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDevice {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Settings passed to the capture facility when starting a video source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    pub resolution: Resolution,
    pub frame_rate: u32,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            resolution: Resolution {
                width: 800,
                height: 800,
            },
            frame_rate: 30,
        }
    }
}
