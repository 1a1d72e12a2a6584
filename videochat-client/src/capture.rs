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

//! Local media capture and the surfaces captured or received video is shown on.

use crate::error::{ChatError, Result};
use async_trait::async_trait;
use log::debug;
use videochat_types::{CaptureOptions, StreamHandle, VideoDevice};

/// Local capture facility: cameras and the microphone.
#[async_trait]
pub trait MediaCapture: Send + Sync {
    fn video_devices(&self) -> Vec<VideoDevice>;

    async fn start_video(&self, device: &VideoDevice, options: CaptureOptions)
        -> Result<StreamHandle>;

    async fn start_audio(&self) -> Result<StreamHandle>;
}

/// Starts capturing from the first available video source.
pub async fn capture_first_camera(
    capture: &dyn MediaCapture,
    options: CaptureOptions,
) -> Result<StreamHandle> {
    let devices = capture.video_devices();
    let device = devices.first().ok_or(ChatError::NoVideoSource)?;
    debug!(
        "Capturing video from '{}' at {} @ {}fps",
        device.name, options.resolution, options.frame_rate
    );
    capture.start_video(device, options).await
}

/// A rendering target that can display one video stream at a time.
pub trait VideoSurface {
    fn attach(&mut self, stream: &StreamHandle);
    fn detach(&mut self, stream: &StreamHandle);
}

/// Keeps a [`VideoSurface`] showing a participant's current video.
///
/// Binding a stream detaches whatever was shown before, including when the
/// same stream is bound again, so the surface always holds exactly one
/// attachment.
#[derive(Debug)]
pub struct SurfaceBinding<S: VideoSurface> {
    surface: S,
    current: Option<StreamHandle>,
}

impl<S: VideoSurface> SurfaceBinding<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            current: None,
        }
    }

    pub fn bind(&mut self, stream: Option<&StreamHandle>) {
        if let Some(previous) = self.current.take() {
            self.surface.detach(&previous);
        }
        if let Some(stream) = stream {
            self.surface.attach(stream);
            self.current = Some(stream.clone());
        }
    }

    pub fn current(&self) -> Option<&StreamHandle> {
        self.current.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Detaches the current stream and hands the surface back.
    pub fn into_surface(mut self) -> S {
        self.bind(None);
        self.surface
    }
}
