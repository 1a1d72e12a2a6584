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

//! Text rendering of the participant collection.

use videochat_types::Participant;

/// Number of cells per row in the terminal grid.
pub const GRID_COLUMNS: usize = 2;

const CELL_WIDTH: usize = 28;

fn cell(participant: &Participant) -> String {
    let media = match (participant.video.is_some(), participant.audio.is_some()) {
        (true, true) => "video+audio",
        (true, false) => "video",
        (false, true) => "audio",
        (false, false) => "no media",
    };
    match participant.display_label() {
        Some(label) => format!("{label} [{media}]"),
        None => format!("[{media}]"),
    }
}

/// Lays `participants` out row by row, `columns` cells per row, in
/// collection order.
pub fn render_grid(participants: &[Participant], columns: usize) -> String {
    if participants.is_empty() {
        return "(no participants)".to_string();
    }
    participants
        .chunks(columns.max(1))
        .map(|row| {
            row.iter()
                .map(|p| format!("{:<CELL_WIDTH$}", cell(p)))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
