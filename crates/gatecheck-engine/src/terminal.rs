// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal resolution for appointment probes.
//!
//! The listing carries short terminal codes; the upstream's appointment
//! form wants the full terminal names. Unknown codes pass through
//! literally so a new terminal degrades to a probe failure for that item
//! instead of a lookup error.

use gatecheck_core::TradeType;

/// Maps a short terminal code to the full name the appointment form expects.
pub fn terminal_full_name(code: &str) -> Option<&'static str> {
    let name = match code {
        "BNLPC" => "Long Beach Container Terminal",
        "ETSLAX" => "Everport Terminal Services - Los Angeles",
        "ETSOAK" => "Everport Terminal Services - Oakland",
        "ETSTAC" => "Everport Terminal Services Inc. - Tacoma, WA",
        "FIT" => "Florida International Terminal (FIT)",
        "HUSKY" => "Husky Terminal and Stevedoring, Inc.",
        "ITS" => "ITS Long Beach",
        "LPCHI" => "Long Beach Container Terminal - Chicago",
        "OICT" => "OICT",
        "PACKR" => "Packer Avenue Marine Terminal",
        "PCT" => "Pacific Container Terminal",
        "PET" => "Port Everglades Terminal",
        "SSA" => "SSA Terminal - PierA / LB",
        "SSAT30" => "SSAT - Terminal 30",
        "SSAT5" => "SSAT - Terminal 5",
        "T18" => "Terminal 18",
        "TRP1" => "TraPac LLC - Los Angeles",
        "TRPOAK" => "TraPac - Oakland",
        "TTI" => "Total Terminals Intl LLC",
        "WUT" => "Washington United Terminals",
        _ => return None,
    };
    Some(name)
}

/// Resolves the terminal for one item.
///
/// The current location wins when present; otherwise imports fall back to
/// their origin and exports to their destination. The resolved code is
/// mapped through [`terminal_full_name`]; unmapped codes are returned
/// as-is.
pub fn determine_terminal(
    trade: TradeType,
    current_loc: &str,
    origin: &str,
    destination: &str,
) -> String {
    let current_loc = current_loc.trim();
    let fallback = match trade {
        TradeType::Import => origin.trim(),
        TradeType::Export => destination.trim(),
    };
    let code = if current_loc.is_empty() {
        fallback
    } else {
        current_loc
    };
    terminal_full_name(code)
        .map(|s| s.to_string())
        .unwrap_or_else(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_to_full_names() {
        assert_eq!(terminal_full_name("ITS"), Some("ITS Long Beach"));
        assert_eq!(
            terminal_full_name("TRP1"),
            Some("TraPac LLC - Los Angeles")
        );
        assert_eq!(terminal_full_name("T18"), Some("Terminal 18"));
        assert_eq!(terminal_full_name("NOPE"), None);
    }

    #[test]
    fn current_loc_wins_over_fallbacks() {
        let terminal = determine_terminal(TradeType::Import, "TTI", "ITS", "PCT");
        assert_eq!(terminal, "Total Terminals Intl LLC");
    }

    #[test]
    fn import_falls_back_to_origin() {
        let terminal = determine_terminal(TradeType::Import, "  ", "ETSLAX", "PCT");
        assert_eq!(terminal, "Everport Terminal Services - Los Angeles");
    }

    #[test]
    fn export_falls_back_to_destination() {
        let terminal = determine_terminal(TradeType::Export, "", "ETSLAX", "PCT");
        assert_eq!(terminal, "Pacific Container Terminal");
    }

    #[test]
    fn unknown_codes_pass_through_literally() {
        let terminal = determine_terminal(TradeType::Import, "XYZ9", "", "");
        assert_eq!(terminal, "XYZ9");
    }
}
