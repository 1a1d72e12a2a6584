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

//! Error types for the call flow.

use thiserror::Error;

/// Errors produced by the communication backend, the capture facility or the
/// controller itself.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The communication SDK rejected its initialization (bad token, no network).
    #[error("Session setup failed: {0}")]
    Setup(String),

    /// The room could neither be found nor created.
    #[error("Room unavailable: {0}")]
    RoomUnavailable(String),

    #[error("Join failed: {0}")]
    Join(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    /// The capture facility reported no video source.
    #[error("No video source available")]
    NoVideoSource,

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Subscribe failed: {0}")]
    Subscribe(String),

    /// A subscription completed without yielding a stream.
    #[error("Subscription to {0} yielded no stream")]
    EmptyStream(String),

    /// The local user's record is missing from the participant collection.
    #[error("Local member record not found")]
    MissingLocalMember,

    /// An operation needing a joined room was attempted before joining.
    #[error("Not joined to a room")]
    NotJoined,

    /// The call flow was started twice on the same controller.
    #[error("Call already started")]
    AlreadyStarted,

    /// The controller was created outside of a tokio runtime.
    #[error("No async runtime: {0}")]
    Runtime(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;
