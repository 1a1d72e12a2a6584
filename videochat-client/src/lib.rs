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

//! This crate keeps the participant grid of an SFU video chat in sync with the
//! room it is showing. Signaling, media transport and codec negotiation belong
//! to the communication SDK; this crate only drives that SDK through the call
//! flow and maintains the ordered collection of participants a UI renders.
//!
//! The crate makes no assumptions about the UI. A front end holds a read-only
//! view of the collection through [`VideoChatController::watch`] and listens
//! to [`ClientEvent`]s for everything else.
//!
//! # Outline of usage
//!
//! ## Controller creation and joining:
//! ```no_run
//! # use std::sync::Arc;
//! # use videochat_client::{ClientOptions, VideoChatController};
//! # use videochat_client::simulated::{SimulatedCapture, SimulatedSfu};
//! # #[tokio::main] async fn main() -> videochat_client::Result<()> {
//! let options = ClientOptions::from_env_or_default()?;
//! let controller = VideoChatController::new(
//!     Arc::new(SimulatedSfu::new()),     // any RoomService
//!     Arc::new(SimulatedCapture::new()), // any MediaCapture
//!     options,
//! )?;
//! controller.join_room()?;
//! # Ok(()) }
//! ```
//!
//! ## Observing the roster:
//! ```ignore
//! let mut rx = controller.watch();
//! while rx.changed().await.is_ok() {
//!     render(&rx.borrow_and_update());
//! }
//! ```
//!
//! ## Leaving:
//! ```ignore
//! controller.leave().await?;
//! ```
//!
//! ## Reconciling a roster by hand:
//! ```
//! use videochat_client::roster::synchronize;
//! use videochat_client::videochat_types::{MemberDescriptor, Participant};
//!
//! let current = vec![Participant::remote("1", Some("Alice".into()))];
//! let next = synchronize(&current, &[MemberDescriptor::new("2", Some("Bob"))]);
//! assert_eq!(next.len(), 1);
//! assert_eq!(next[0].id, "2");
//! ```

mod capture;
mod config;
mod context;
mod controller;
mod error;
mod event_bus;
mod events;
mod session;
mod store;
mod utils;

pub mod roster;
pub mod simulated;

pub use capture::{capture_first_camera, MediaCapture, SurfaceBinding, VideoSurface};
pub use config::{truthy, ClientOptions};
pub use context::{generate_display_name, SessionContext};
pub use controller::VideoChatController;
pub use error::{ChatError, Result};
pub use event_bus::{EventBus, EVENT_BUS_CAPACITY};
pub use events::{ClientEvent, FlowStep};
pub use roster::{reconcile, synchronize, RosterUpdate};
pub use session::{Room, RoomEvent, RoomService};
pub use store::{ParticipantStore, Snapshot};
pub use videochat_types;
