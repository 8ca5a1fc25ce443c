//! Participant display names and colors
//!
//! Names arrive from clients unchecked. This module normalises them before
//! they reach the roster: whitespace is collapsed, length is clamped,
//! inappropriate words are censored, and empty names are either replaced
//! by a generated one or rejected depending on the session settings.

use heck::ToTitleCase;
use rustrict::CensorStr;

use crate::constants::participant::{DEFAULT_COLOR, DEFAULT_NAME, MAX_NAME_LENGTH};

/// Number of words in a generated name
const GENERATED_NAME_WORDS: u8 = 2;

/// Generates a random pet-style name such as "Brave Otter"
pub fn generate_name() -> String {
    petname::petname(GENERATED_NAME_WORDS, " ")
        .unwrap_or_else(|| DEFAULT_NAME.to_owned())
        .to_title_case()
}

/// Collapses whitespace runs to single spaces and clamps the length
fn clean(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_NAME_LENGTH)
        .collect::<String>()
        .trim_end()
        .to_owned()
}

/// Resolves the display name for a joining participant
///
/// Returns `None` when the participant offered no usable name and the
/// session requires one; the join should then be ignored.
pub fn resolve_name(raw: Option<&str>, require_player_names: bool) -> Option<String> {
    let cleaned = raw.map(clean).unwrap_or_default();
    if cleaned.is_empty() {
        return match (require_player_names, raw) {
            (true, _) => None,
            (false, None) => Some(DEFAULT_NAME.to_owned()),
            (false, Some(_)) => Some(generate_name()),
        };
    }

    if cleaned.as_str().is_inappropriate() {
        return Some(cleaned.as_str().censor());
    }

    Some(cleaned)
}

/// Resolves the display color for a joining participant
///
/// Only `#rgb` and `#rrggbb` hex colors are accepted; anything else falls
/// back to the default color.
pub fn resolve_color(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|color| {
            color
                .strip_prefix('#')
                .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.bytes().all(|b| b.is_ascii_hexdigit()))
        })
        .unwrap_or(DEFAULT_COLOR)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_name_collapses_whitespace() {
        assert_eq!(
            resolve_name(Some("  Ada \n  Lovelace "), false),
            Some("Ada Lovelace".to_owned())
        );
    }

    #[test]
    fn test_resolve_name_clamps_length() {
        let long = "a".repeat(MAX_NAME_LENGTH * 2);
        let name = resolve_name(Some(&long), false).unwrap();
        assert_eq!(name.chars().count(), MAX_NAME_LENGTH);
    }

    #[test]
    fn test_resolve_name_missing_uses_default() {
        assert_eq!(resolve_name(None, false), Some(DEFAULT_NAME.to_owned()));
    }

    #[test]
    fn test_resolve_name_blank_is_generated() {
        let name = resolve_name(Some("   "), false).unwrap();
        assert!(!name.trim().is_empty());
    }

    #[test]
    fn test_resolve_name_required() {
        assert_eq!(resolve_name(None, true), None);
        assert_eq!(resolve_name(Some(" "), true), None);
        assert_eq!(resolve_name(Some("Grace"), true), Some("Grace".to_owned()));
    }

    #[test]
    fn test_resolve_name_censors() {
        let name = resolve_name(Some("fuck"), false).unwrap();
        assert_ne!(name, "fuck");
    }

    #[test]
    fn test_generate_name_is_title_case() {
        let name = generate_name();
        assert!(name.split(' ').all(|word| {
            word.chars().next().is_some_and(char::is_uppercase)
        }));
    }

    #[test]
    fn test_resolve_color() {
        assert_eq!(resolve_color(Some("#EF4444")), "#EF4444");
        assert_eq!(resolve_color(Some("#abc")), "#abc");
        assert_eq!(resolve_color(Some("red")), DEFAULT_COLOR);
        assert_eq!(resolve_color(Some("#12345")), DEFAULT_COLOR);
        assert_eq!(resolve_color(Some("#GGGGGG")), DEFAULT_COLOR);
        assert_eq!(resolve_color(None), DEFAULT_COLOR);
    }
}
