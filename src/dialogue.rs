//! Dialogue state and the pure transition decision for the intake bot.
//!
//! `decide` maps the current state and a normalized inbound message to a
//! `Step` naming the action to perform. It never touches collaborators, so
//! every branch of the state machine is unit-testable without I/O; the
//! handlers in `crate::bot` execute the side effects.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;

use crate::inbound::IncomingMessage;
use crate::listing::{ListingDraft, ADD_COMMAND, DELETE_COMMAND};

lazy_static! {
    /// Folder id token users echo back from the candidate list, e.g. `(id: 1aB_x-9)`.
    static ref FOLDER_ID_PATTERN: Regex =
        Regex::new(r"id: ([A-Za-z0-9_-]+)").expect("Folder id pattern should be valid");
}

/// A delete-flow search result surfaced to the user: display path plus the
/// remote folder id.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateFolder {
    pub display_path: String,
    pub folder_id: String,
}

/// Per-sender conversation state. One variant per dialogue phase; fields only
/// exist on the phases that use them, so stale drafts or counters cannot leak
/// across flows.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DialogueState {
    #[default]
    Idle,
    AwaitingListingDetails,
    AwaitingPhotoCount {
        draft: ListingDraft,
    },
    AwaitingPhotos {
        draft: ListingDraft,
        expected: u32,
        received: u32,
        staging_dir: PathBuf,
        staged: Vec<PathBuf>,
    },
    AwaitingDeleteKeyword,
    AwaitingDeleteFolderChoice {
        candidates: Vec<CandidateFolder>,
    },
}

/// The action the engine should perform for one inbound message.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Reset the session and start collecting listing details.
    StartListing,
    /// Reset the session and ask for a deletion keyword.
    StartDeletion,
    /// Run the detail parser over the message text.
    ParseDetails { text: String },
    /// A valid non-negative photo count was supplied.
    AcceptPhotoCount { count: u32 },
    /// The photo-count message did not parse as a non-negative integer.
    RejectPhotoCount,
    /// Stage the attached photos and check the running total.
    CollectPhotos,
    /// A photo was expected but the delivery had no attachments.
    PromptForPhotos,
    /// Search remote folders by keyword.
    SearchFolders { keyword: String },
    /// The user picked a folder to delete.
    DeleteChosen {
        folder_id: String,
        choice_text: String,
    },
    /// The folder-choice message carried no id token.
    RejectChoice,
    /// Nothing matched; reply with usage guidance.
    Unrecognized,
}

/// Extract the folder id token from a delete-choice message, if present.
pub fn extract_folder_id(text: &str) -> Option<String> {
    FOLDER_ID_PATTERN
        .captures(text)
        .map(|caps| caps[1].to_string())
}

/// Decide the next step for `msg` given the sender's current state.
///
/// The add/delete commands take precedence over every phase so a sender can
/// always escape a stuck flow by reissuing them.
pub fn decide(state: &DialogueState, msg: &IncomingMessage) -> Step {
    let trimmed = msg.body.trim();

    if trimmed.eq_ignore_ascii_case(ADD_COMMAND) {
        return Step::StartListing;
    }
    if trimmed.eq_ignore_ascii_case(DELETE_COMMAND) {
        return Step::StartDeletion;
    }

    match state {
        DialogueState::AwaitingListingDetails if !trimmed.is_empty() => Step::ParseDetails {
            text: msg.body.clone(),
        },
        DialogueState::AwaitingPhotoCount { .. } => match trimmed.parse::<u32>() {
            Ok(count) => Step::AcceptPhotoCount { count },
            Err(_) => Step::RejectPhotoCount,
        },
        DialogueState::AwaitingPhotos { .. } => {
            if msg.media.is_empty() {
                Step::PromptForPhotos
            } else {
                Step::CollectPhotos
            }
        }
        DialogueState::AwaitingDeleteKeyword if !trimmed.is_empty() => Step::SearchFolders {
            keyword: trimmed.to_string(),
        },
        DialogueState::AwaitingDeleteFolderChoice { .. } => match extract_folder_id(trimmed) {
            Some(folder_id) => Step::DeleteChosen {
                folder_id,
                choice_text: trimmed.to_string(),
            },
            None => Step::RejectChoice,
        },
        _ => Step::Unrecognized,
    }
}
