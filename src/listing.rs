//! Listing draft model and the title/folder naming rules derived from it.

use serde::{Deserialize, Serialize};

/// Command that starts the add-listing dialogue.
pub const ADD_COMMAND: &str = "/add";
/// Command that starts the delete-listing dialogue.
pub const DELETE_COMMAND: &str = "/delete";

/// Marketing tag appended to every listing folder name on Drive.
pub const FOLDER_TAG: &str = "#LISTABOT";

/// Room layout that lives directly under the root listings folder instead of
/// a per-layout subfolder.
pub const DEFAULT_ROOM_LAYOUT: &str = "3 + 1";

/// Structured listing fields produced by the detail parser.
///
/// All fields are free text as extracted; numeric coercion of `area` and
/// `price` happens only at finalization time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub room_count: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub price: String,
}

/// Strip a field down to alphanumeric and space characters.
fn sanitize(field: &str) -> String {
    field
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

/// Substitute a placeholder for placement fields the parser left empty.
fn part_or_unknown(field: &str) -> &str {
    if field.trim().is_empty() {
        "Unknown"
    } else {
        field
    }
}

/// Derive the canonical listing title: `{neighborhood}-{street}-{room_count}`
/// with neighborhood and street sanitized.
pub fn listing_title(draft: &ListingDraft) -> String {
    let neighborhood = sanitize(part_or_unknown(&draft.neighborhood));
    let street = sanitize(part_or_unknown(&draft.street));
    format!(
        "{}-{}-{}",
        neighborhood,
        street,
        part_or_unknown(&draft.room_count)
    )
}

/// Derive the Drive folder name: the listing title plus the marketing tag.
pub fn folder_name(draft: &ListingDraft) -> String {
    format!("{} {}", listing_title(draft), FOLDER_TAG)
}

/// Whether the draft's room layout is the canonical default, compared
/// case- and whitespace-insensitively.
pub fn is_default_layout(room_count: &str) -> bool {
    room_count.trim().eq_ignore_ascii_case(DEFAULT_ROOM_LAYOUT)
}

/// Coerce a free-text numeric field to a number. Unparsable or empty text
/// becomes `None` rather than an error.
pub fn parse_metric(field: &str) -> Option<f64> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(neighborhood: &str, street: &str, room_count: &str) -> ListingDraft {
        ListingDraft {
            neighborhood: neighborhood.to_string(),
            street: street.to_string(),
            room_count: room_count.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_title_canonical_case() {
        let d = draft("Acme Heights", "Elm St", "3 + 1");
        assert_eq!(listing_title(&d), "Acme Heights-Elm St-3 + 1");
    }

    #[test]
    fn test_title_strips_non_alphanumerics() {
        let d = draft("Acme, Heights!", "Elm St. #4", "2 + 1");
        assert_eq!(listing_title(&d), "Acme Heights-Elm St 4-2 + 1");
    }

    #[test]
    fn test_title_empty_fields_become_unknown() {
        let d = draft("", "  ", "2 + 1");
        assert_eq!(listing_title(&d), "Unknown-Unknown-2 + 1");
    }

    #[test]
    fn test_folder_name_appends_tag() {
        let d = draft("Acme Heights", "Elm St", "3 + 1");
        assert_eq!(folder_name(&d), "Acme Heights-Elm St-3 + 1 #LISTABOT");
    }

    #[test]
    fn test_default_layout_check() {
        assert!(is_default_layout("3 + 1"));
        assert!(is_default_layout("  3 + 1  "));
        assert!(!is_default_layout("2 + 1"));
        assert!(!is_default_layout(""));
    }

    #[test]
    fn test_parse_metric() {
        assert_eq!(parse_metric("150"), Some(150.0));
        assert_eq!(parse_metric(" 95.5 "), Some(95.5));
        assert_eq!(parse_metric("about 120"), None);
        assert_eq!(parse_metric(""), None);
    }

    #[test]
    fn test_draft_deserializes_with_missing_fields() {
        let d: ListingDraft =
            serde_json::from_str(r#"{"neighborhood":"Acme Heights","street":"Elm St"}"#).unwrap();
        assert_eq!(d.neighborhood, "Acme Heights");
        assert!(d.room_count.is_empty());
        assert!(d.price.is_empty());
    }
}
