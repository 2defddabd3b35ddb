// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Exit summary table.

use comfy_table::Table;
use spiview_session::SessionStats;

use crate::console::ConsoleReport;

/// Counter table for the end of a run.
pub fn summary_table(stats: &SessionStats, console: &ConsoleReport) -> Table {
    let rows: [(&str, u64); 14] = [
        ("messages", stats.pipeline.messages),
        ("commands applied", stats.scene.commands),
        ("shapes committed", stats.scene.shapes_committed),
        ("empty uploads", stats.scene.empty_uploads),
        ("frames finalized", stats.scene.frames_finalized),
        ("frames shown", console.frames),
        ("triangles drawn", console.triangles),
        ("primitives skipped", console.skipped),
        ("camera updates", stats.scene.camera_updates),
        ("resets", stats.scene.resets),
        ("dropped messages", stats.dropped_messages()),
        ("redundant frame ends", stats.scene.redundant_frame_ends),
        ("framing overflows", stats.pipeline.overflows),
        ("backend errors", stats.pipeline.backend_errors),
    ];
    let mut table = Table::new();
    table.set_header(vec!["counter", "value"]);
    for (name, value) in rows {
        table.add_row(vec![name.to_owned(), value.to_string()]);
    }
    table
}
