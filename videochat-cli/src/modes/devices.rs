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

use videochat_client::simulated::SimulatedCapture;
use videochat_client::MediaCapture;

pub fn list_devices() {
    let capture = SimulatedCapture::new();
    let devices = capture.video_devices();
    println!("There are {} available cameras.", devices.len());
    for (index, device) in devices.iter().enumerate() {
        println!("{index}: {} ({})", device.name, device.id);
    }
}
