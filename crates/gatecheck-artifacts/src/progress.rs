// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stage-4 checkpoint state (`check_progress.json`).
//!
//! The checkpoint maps item ids to their terminal probe state so a run can
//! resume without repeating completed probes. It is scoped per job: a new
//! job starts from an empty checkpoint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Terminal state of one probed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Ok,
    Failed,
}

/// Checkpoint record for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemProgress {
    pub status: ItemStatus,
    /// Epoch second of the attempt whose response/screenshot files this
    /// item's artifacts carry in their names.
    pub epoch: i64,
}

/// The whole checkpoint: item id -> terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckProgress {
    #[serde(default)]
    pub items: BTreeMap<String, ItemProgress>,
}

impl CheckProgress {
    /// True when the item already probed successfully; such items are
    /// skipped on resume.
    pub fn is_done_ok(&self, item_id: &str) -> bool {
        matches!(
            self.items.get(item_id),
            Some(ItemProgress {
                status: ItemStatus::Ok,
                ..
            })
        )
    }

    /// Record an item's terminal state.
    pub fn record(&mut self, item_id: &str, status: ItemStatus, epoch: i64) {
        self.items
            .insert(item_id.to_string(), ItemProgress { status, epoch });
    }
}
