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

//! Shared types for the videochat roster client.
//!
//! This crate only holds plain values: participants, member descriptors as
//! reported by the communication SDK, and opaque media stream handles. It is
//! intentionally free of any SDK, runtime or UI framework dependency.

pub mod media;
pub mod participant;

pub use media::{
    CaptureOptions, ContentType, MediaStream, Publication, Resolution, StreamHandle, StreamOrigin,
    VideoDevice,
};
pub use participant::{LocalMember, MemberDescriptor, Participant};
