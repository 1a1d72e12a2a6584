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

use crate::context::SessionContext;
use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use videochat_types::CaptureOptions;

/// Configuration for [`VideoChatController`](crate::VideoChatController).
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub room_name: String,
    /// Display name of the local user. A random one is generated when absent.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Token handed to the SDK on setup.
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub capture: CaptureOptions,
    #[serde(default = "enabled")]
    pub enable_video: bool,
    #[serde(default = "enabled")]
    pub enable_audio: bool,
}

fn enabled() -> bool {
    true
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            room_name: "test-room".to_string(),
            display_name: None,
            auth_token: String::new(),
            capture: CaptureOptions::default(),
            enable_video: true,
            enable_audio: true,
        }
    }
}

impl ClientOptions {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let options: ClientOptions = serde_yaml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_env_or_default() -> Result<Self> {
        // Try to load from config file first
        if let Ok(config_path) = std::env::var("VIDEOCHAT_CONFIG_PATH") {
            return Self::from_file(&config_path);
        }

        let room_name = std::env::var("ROOM").unwrap_or_else(|_| "test-room".to_string());
        let display_name = std::env::var("DISPLAY_NAME").ok();
        let auth_token = std::env::var("AUTH_TOKEN").unwrap_or_default();
        let enable_video = std::env::var("ENABLE_VIDEO")
            .map(|v| truthy(&v))
            .unwrap_or(true);
        let enable_audio = std::env::var("ENABLE_AUDIO")
            .map(|v| truthy(&v))
            .unwrap_or(true);

        let options = ClientOptions {
            room_name,
            display_name,
            auth_token,
            capture: CaptureOptions::default(),
            enable_video,
            enable_audio,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.room_name.trim().is_empty() {
            return Err(ChatError::Config("room_name must not be empty".to_string()));
        }
        if self.capture.resolution.width == 0 || self.capture.resolution.height == 0 {
            return Err(ChatError::Config(format!(
                "invalid capture resolution {}",
                self.capture.resolution
            )));
        }
        Ok(())
    }

    /// The session context for a call started with these options.
    pub fn session_context(&self) -> SessionContext {
        match &self.display_name {
            Some(name) if !name.trim().is_empty() => SessionContext::new(name.clone()),
            _ => SessionContext::generated(),
        }
    }
}

pub fn truthy(s: &str) -> bool {
    ["true", "1", "yes"].contains(&s.to_lowercase().as_str())
}
