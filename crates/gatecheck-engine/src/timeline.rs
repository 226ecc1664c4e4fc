// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Date extraction from loosely formatted upstream payloads.
//!
//! Two pure functions: milestone dates out of an import timeline, and the
//! earliest slot out of a probe's human-formatted availability list.

use chrono::NaiveDateTime;
use gatecheck_upstream::Milestone;

/// Extracts the date of a named milestone, normalized to `MM/DD/YYYY`.
///
/// Timeline dates arrive as `MM/DD/YYYY` or `MM/DD/YYYY HH:MM`; the
/// time-of-day is stripped. Absent milestones and "N/A" placeholders
/// yield `None`, which the caller renders as the literal `N/A`.
pub fn extract_milestone_date(timeline: &[Milestone], milestone_name: &str) -> Option<String> {
    let entry = timeline.iter().find(|m| m.milestone == milestone_name)?;
    let date = entry.date.as_deref()?.trim();
    if date.is_empty() || date.eq_ignore_ascii_case("N/A") {
        return None;
    }
    Some(date.split_whitespace().next().unwrap_or(date).to_string())
}

/// Finds the earliest appointment date in a list of slot strings of the
/// form `"MM/DD/YYYY HH:MM AM - HH:MM PM"`.
///
/// The list is NOT assumed to be sorted. Entries that fail to parse are
/// skipped; the result is the minimum start timestamp's date formatted
/// `MM/DD/YYYY`, or `None` when nothing parses.
pub fn find_earliest_appointment(available_times: &[String]) -> Option<String> {
    available_times
        .iter()
        .filter_map(|slot| parse_slot_start(slot))
        .min()
        .map(|dt| dt.format("%m/%d/%Y").to_string())
}

fn parse_slot_start(slot: &str) -> Option<NaiveDateTime> {
    let start = slot.split(" - ").next()?.trim();
    NaiveDateTime::parse_from_str(start, "%m/%d/%Y %I:%M %p").ok()
}
