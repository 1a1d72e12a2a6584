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

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;
use videochat_types::Resolution;

#[derive(Parser, Debug)]
#[clap(name = "videochat-cli")]
pub struct Opt {
    #[clap(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Join a room on the in-process SFU and print the participant grid as it changes.
    Join(Join),

    /// List the cameras the capture facility offers.
    Devices,
}

#[derive(Args, Debug, Clone)]
pub struct Join {
    /// Room to join. Overrides the configuration file and `ROOM`.
    #[clap(long = "room")]
    pub room: Option<String>,

    /// Display name. A random one is generated when neither this, the
    /// configuration file nor `DISPLAY_NAME` provide one.
    #[clap(long = "name")]
    pub name: Option<String>,

    /// YAML configuration file. Falls back to `VIDEOCHAT_CONFIG_PATH` and
    /// environment variables when absent.
    #[clap(long = "config", short = 'c')]
    pub config: Option<PathBuf>,

    /// Number of scripted remote members that join the room and publish.
    #[clap(long = "remote-members")]
    #[clap(default_value = "2")]
    pub remote_members: usize,

    /// How long to stay in the room before leaving.
    #[clap(long = "duration-secs")]
    #[clap(default_value = "10")]
    pub duration_secs: u64,

    /// Capture resolution in WIDTHxHEIGHT format (e.g., 800x800)
    #[clap(long = "resolution", short = 'r', value_parser = parse_resolution)]
    pub resolution: Option<Resolution>,

    /// Capture frame rate.
    #[clap(long = "fps")]
    pub fps: Option<u32>,

    #[clap(long = "no-video")]
    pub no_video: bool,

    #[clap(long = "no-audio")]
    pub no_audio: bool,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseResolutionError {
    #[error("Invalid resolution '{0}', expected WIDTHxHEIGHT")]
    Format(String),
    #[error("Resolution must not be zero: {0}")]
    Zero(String),
}

pub fn parse_resolution(s: &str) -> Result<Resolution, ParseResolutionError> {
    let (width, height) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| ParseResolutionError::Format(s.to_string()))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|_| ParseResolutionError::Format(s.to_string()))
    };
    let resolution = Resolution {
        width: parse(width)?,
        height: parse(height)?,
    };
    if resolution.width == 0 || resolution.height == 0 {
        return Err(ParseResolutionError::Zero(s.to_string()));
    }
    Ok(resolution)
}
