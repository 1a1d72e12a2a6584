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

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use videochat_cli::cli_args::Join;
use videochat_cli::grid::{render_grid, GRID_COLUMNS};
use videochat_client::simulated::{SimulatedCapture, SimulatedRoom, SimulatedSfu};
use videochat_client::videochat_types::ContentType;
use videochat_client::{generate_display_name, ClientEvent, ClientOptions, VideoChatController};

/// Delay between scripted remote member actions.
const SCRIPT_STEP: Duration = Duration::from_millis(750);

fn options(args: &Join) -> anyhow::Result<ClientOptions> {
    let mut options = match &args.config {
        Some(path) => ClientOptions::from_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => ClientOptions::from_env_or_default()?,
    };
    if let Some(room) = &args.room {
        options.room_name = room.clone();
    }
    if let Some(name) = &args.name {
        options.display_name = Some(name.clone());
    }
    if let Some(resolution) = args.resolution {
        options.capture.resolution = resolution;
    }
    if let Some(fps) = args.fps {
        options.capture.frame_rate = fps;
    }
    if args.no_video {
        options.enable_video = false;
    }
    if args.no_audio {
        options.enable_audio = false;
    }
    Ok(options)
}

/// Remote members join one by one and publish; the first one leaves again
/// once everyone is in.
async fn script_remote_members(room: Arc<SimulatedRoom>, count: usize) {
    let mut joined = Vec::with_capacity(count);
    for _ in 0..count {
        sleep(SCRIPT_STEP).await;
        let name = generate_display_name(&mut rand::thread_rng());
        let member = room.add_remote_member(&name);
        room.publish_remote(&member.id, ContentType::Video);
        room.publish_remote(&member.id, ContentType::Audio);
        joined.push(member);
    }
    if count > 1 {
        sleep(SCRIPT_STEP).await;
        let first = &joined[0];
        info!("Scripted member {} leaves", first.id);
        room.remove_member(&first.id);
    }
}

pub async fn join(args: Join) -> anyhow::Result<()> {
    let options = options(&args)?;
    let sfu = Arc::new(SimulatedSfu::new());
    let controller =
        VideoChatController::new(sfu.clone(), Arc::new(SimulatedCapture::new()), options)?;
    let mut participants = controller.watch();
    let mut events = controller.events();

    controller.join_room()?;
    let script = tokio::spawn(script_remote_members(
        sfu.room(controller.room_name()),
        args.remote_members,
    ));

    let deadline = sleep(Duration::from_secs(args.duration_secs));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, leaving");
                break;
            }
            changed = participants.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = participants.borrow_and_update().clone();
                println!("\n{}", render_grid(&snapshot, GRID_COLUMNS));
            }
            event = events.recv() => match event {
                Ok(ClientEvent::StepFailed { step, reason }) => warn!("{step} failed: {reason}"),
                Ok(event) => debug!(?event, "client event"),
                Err(e) => debug!("event stream: {e}"),
            }
        }
    }

    script.abort();
    controller.leave().await?;
    info!("Left room '{}'", controller.room_name());
    Ok(())
}
