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

use rand::seq::SliceRandom;
use rand::Rng;

const NAMES: [&str; 30] = [
    "Alice", "Bob", "Charlie", "Diana", "Eve", "Frank", "Grace", "Hank", "Ivy", "Jack", "Karen",
    "Leo", "Mona", "Nate", "Olivia", "Paul", "Quinn", "Rachel", "Steve", "Tina", "Uma", "Victor",
    "Wendy", "Xander", "Yara", "Zack", "Aaron", "Bella", "Cody", "Daisy",
];

/// Who the local user is within one call.
///
/// Owned by the controller; the member id is filled in once joining succeeds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub display_name: String,
    pub local_member_id: Option<String>,
}

impl SessionContext {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            local_member_id: None,
        }
    }

    /// A context with a random display name such as `Grace_412`.
    pub fn generated() -> Self {
        Self::new(generate_display_name(&mut rand::thread_rng()))
    }

    pub fn is_joined(&self) -> bool {
        self.local_member_id.is_some()
    }

    pub fn is_local(&self, member_id: &str) -> bool {
        self.local_member_id.as_deref() == Some(member_id)
    }
}

pub fn generate_display_name<R: Rng>(rng: &mut R) -> String {
    let name = NAMES.choose(rng).copied().unwrap_or("Guest");
    format!("{}_{}", name, rng.gen_range(0..1000))
}
