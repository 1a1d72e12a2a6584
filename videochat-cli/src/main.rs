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

use clap::Parser;
mod modes;

use modes::devices::list_devices;
use modes::join::join;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::util::SubscriberInitExt;
use videochat_cli::cli_args::{Mode, Opt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `try_init` also forwards records of the `log` facade used by the client.
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .finish()
        .try_init()?;

    let opt = Opt::parse();

    match opt.mode {
        Mode::Join(args) => join(args).await?,
        Mode::Devices => list_devices(),
    };

    Ok(())
}
