// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stage-2 filtering of the raw container listing.
//!
//! Retains rows still waiting on a pregate ticket with no holds, then
//! appends the five output columns later stages fill in. "N/A" is a
//! meaningful literal in the listing and is never coerced to a missing
//! value.

use gatecheck_artifacts::Table;

/// Listing columns the pipeline reads.
pub const COL_CONTAINER: &str = "Container #";
pub const COL_TRADE_TYPE: &str = "Trade Type";
pub const COL_HOLDS: &str = "Holds";
pub const COL_PREGATE: &str = "Pregate Ticket#";
pub const COL_CURRENT_LOC: &str = "Current Loc";
pub const COL_ORIGIN: &str = "Origin";
pub const COL_DESTINATION: &str = "Destination";

/// Output columns appended by the filter, in order.
pub const COL_MANIFESTED: &str = "Manifested";
pub const COL_FIRST_APPT_BEFORE: &str = "First Appointment Available (Before)";
pub const COL_DEPARTED: &str = "Departed Terminal";
pub const COL_FIRST_APPT_AFTER: &str = "First Appointment Available (After)";
pub const COL_EMPTY_RECEIVED: &str = "Empty Received";

/// The placeholder the appended columns start as and keep until a stage
/// writes a real value.
pub const NA: &str = "N/A";

/// Applies the stage-2 filter and appends the five output columns.
///
/// A row survives when `Holds` equals "NO" (case-insensitive) AND
/// `Pregate Ticket#` contains the substring "N/A" (case-insensitive).
/// When the listing is missing either column, nothing survives.
pub fn filter_listing(listing: &Table) -> Table {
    let mut filtered = Table::new(listing.columns.clone());

    let holds_col = listing.column_index(COL_HOLDS);
    let pregate_col = listing.column_index(COL_PREGATE);

    if let (Some(holds_col), Some(pregate_col)) = (holds_col, pregate_col) {
        for row in &listing.rows {
            let holds = row.get(holds_col).map(|s| s.trim()).unwrap_or("");
            let pregate = row.get(pregate_col).map(|s| s.as_str()).unwrap_or("");
            if holds.eq_ignore_ascii_case("NO")
                && pregate.to_ascii_uppercase().contains("N/A")
            {
                filtered.rows.push(row.clone());
            }
        }
    }

    for column in [
        COL_MANIFESTED,
        COL_FIRST_APPT_BEFORE,
        COL_DEPARTED,
        COL_FIRST_APPT_AFTER,
        COL_EMPTY_RECEIVED,
    ] {
        filtered.add_column(column, NA);
    }
    filtered
}
