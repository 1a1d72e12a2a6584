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

//! Event bus for framework-agnostic client events.
//!
//! This module provides a MPMC (multi-producer, multi-consumer) broadcast channel
//! for client events. Each controller owns its own bus, so two calls running in
//! the same process never see each other's events.
//!
//! # Example
//!
//! ```ignore
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = rx.recv().await {
//!         if let ClientEvent::ParticipantAdded(id) = event {
//!             println!("{id} joined");
//!         }
//!     }
//! });
//!
//! bus.emit(ClientEvent::SetupComplete);
//! ```

use crate::events::ClientEvent;
use async_broadcast::{broadcast, InactiveReceiver, Receiver, Sender};
use log::trace;

/// Capacity of the event bus channel
pub const EVENT_BUS_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    sender: Sender<ClientEvent>,
    // Keeps the channel open while nobody is subscribed.
    _keepalive: InactiveReceiver<ClientEvent>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (mut sender, receiver) = broadcast(EVENT_BUS_CAPACITY);
        sender.set_overflow(true);
        Self {
            sender,
            _keepalive: receiver.deactivate(),
        }
    }

    /// Subscribe to client events.
    ///
    /// Returns a receiver that will receive all future client events.
    /// Each subscriber receives all events independently (broadcast pattern).
    pub fn subscribe(&self) -> Receiver<ClientEvent> {
        self.sender.new_receiver()
    }

    /// Emit a client event to all subscribers.
    ///
    /// This is a non-blocking operation. If the channel is full, the oldest
    /// message will be dropped to make room (overflow behavior).
    pub fn emit(&self, event: ClientEvent) {
        if let Err(e) = self.sender.try_broadcast(event) {
            trace!("event not delivered: {e}");
        }
    }

    pub fn capacity(&self) -> usize {
        self.sender.capacity()
    }
}
