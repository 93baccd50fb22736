//! Effectful handlers for each dialogue phase.
//!
//! Every non-terminal branch either advances the sender or keeps them in the
//! same phase with a corrective prompt; every terminal branch resets to
//! `Idle`, so reissuing /add or /delete always recovers a session.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::dialogue::DialogueState;
use crate::inbound::MediaItem;

use super::deletion;
use super::finalizer;
use super::Services;

pub const DETAILS_PROMPT: &str = "Please enter the listing details.";
pub const DELETE_KEYWORD_PROMPT: &str =
    "Please enter a keyword for the folder you want to delete (e.g. neighborhood or room layout).";
pub const PARSE_FAILURE_REPLY: &str =
    "The listing details could not be understood. Please try again with a clearer description.";
pub const PHOTO_COUNT_PROMPT: &str = "How many photos will you add?";
pub const INVALID_COUNT_REPLY: &str = "Please enter a valid number.";
pub const SEND_PHOTOS_REPLY: &str = "Please send the photos.";
pub const FINALIZE_FAILURE_REPLY: &str =
    "An error occurred while saving your listing. Please try again.";
pub const NOT_FOUND_REPLY: &str =
    "No folders matched. Please check the keyword and start over with /delete.";
pub const MISSING_ID_REPLY: &str =
    "Could not find a folder id. Please reply in the format:\n(id: xxxxxxxx)";
pub const DELETE_SUCCESS_REPLY: &str = "The listing and its folder were deleted.";

/// Start a fresh add-listing dialogue, discarding any prior draft, counters
/// and staged paths.
pub fn start_listing(sender: &str, state: &mut DialogueState) -> String {
    info!(sender = %sender, "starting add-listing dialogue");
    *state = DialogueState::AwaitingListingDetails;
    DETAILS_PROMPT.to_string()
}

/// Start a fresh delete-listing dialogue.
pub fn start_deletion(sender: &str, state: &mut DialogueState) -> String {
    info!(sender = %sender, "starting delete-listing dialogue");
    *state = DialogueState::AwaitingDeleteKeyword;
    DELETE_KEYWORD_PROMPT.to_string()
}

/// Run the external parser over the detail text. An unusable result keeps the
/// sender in the details phase with a corrective prompt; only a parsed draft
/// advances to the photo-count phase.
pub async fn handle_details(
    services: &Services,
    sender: &str,
    state: &mut DialogueState,
    text: &str,
) -> String {
    match services.parser.parse(text).await {
        Ok(Some(draft)) => {
            info!(sender = %sender, "listing details parsed");
            *state = DialogueState::AwaitingPhotoCount { draft };
            PHOTO_COUNT_PROMPT.to_string()
        }
        Ok(None) => {
            info!(sender = %sender, "listing details could not be extracted");
            PARSE_FAILURE_REPLY.to_string()
        }
        Err(e) => {
            error!(sender = %sender, error = ?e, "detail parser failed");
            PARSE_FAILURE_REPLY.to_string()
        }
    }
}

/// Sanitize a sender id into something usable as a directory name component.
fn sanitize_sender(sender: &str) -> String {
    sender
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Accept the expected photo count and create the staging directory for this
/// listing attempt. The directory is unique per attempt and never reused.
pub async fn handle_photo_count(
    services: &Services,
    sender: &str,
    state: &mut DialogueState,
    count: u32,
) -> Result<String> {
    let DialogueState::AwaitingPhotoCount { draft } = std::mem::take(state) else {
        bail!("photo count accepted outside AwaitingPhotoCount");
    };

    let staging_dir = services.staging_root.join(format!(
        "{}_{}",
        sanitize_sender(sender),
        Utc::now().format("%Y%m%d_%H%M%S%f")
    ));
    std::fs::create_dir_all(&staging_dir).with_context(|| {
        format!("failed to create staging dir {}", staging_dir.display())
    })?;

    info!(sender = %sender, expected = count, staging_dir = %staging_dir.display(), "photo count accepted");
    *state = DialogueState::AwaitingPhotos {
        draft,
        expected: count,
        received: 0,
        staging_dir,
        staged: Vec::new(),
    };
    Ok(format!("Please send all {count} photos in a single message."))
}

/// Remind the sender that photos are still expected. Sent out-of-band; the
/// webhook reply stays empty.
pub async fn prompt_for_photos(services: &Services, sender: &str) {
    services.messenger.send(sender, SEND_PHOTOS_REPLY).await;
}

/// Stage the delivered attachments and either finalize the listing (running
/// total reached the target) or ask for the remainder out-of-band.
///
/// Individual download failures are logged and skipped; the received counter
/// still advances by the attachment count so the sender is never asked for
/// photos the transport already delivered.
pub async fn handle_photos(
    services: &Services,
    sender: &str,
    state: &mut DialogueState,
    media: &[MediaItem],
) -> Result<Option<String>> {
    let DialogueState::AwaitingPhotos {
        draft,
        expected,
        mut received,
        staging_dir,
        mut staged,
    } = std::mem::take(state)
    else {
        bail!("photos collected outside AwaitingPhotos");
    };

    let batch_stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    for (i, item) in media.iter().enumerate() {
        match services.messenger.fetch_media(&item.url).await {
            Ok(bytes) => {
                let path = staging_dir.join(format!("photo_{batch_stamp}_{i}{}", item.extension));
                if let Err(e) = std::fs::write(&path, &bytes) {
                    error!(sender = %sender, path = %path.display(), error = %e, "failed to stage photo");
                } else {
                    info!(sender = %sender, path = %path.display(), "photo staged");
                    staged.push(path);
                }
            }
            Err(e) => {
                error!(sender = %sender, url = %item.url, error = ?e, "photo download failed");
            }
        }
    }

    received += media.len() as u32;
    info!(sender = %sender, received, expected, "photo batch recorded");

    if received >= expected {
        let reply = match finalizer::finalize_listing(services, &draft, &staging_dir).await {
            Ok(link) => {
                format!("Your listing has been saved!\n\nFolder link: {link}")
            }
            Err(e) => {
                // Staged files stay behind for manual recovery.
                error!(sender = %sender, error = ?e, "listing finalization failed");
                FINALIZE_FAILURE_REPLY.to_string()
            }
        };
        *state = DialogueState::Idle;
        return Ok(Some(reply));
    }

    let remaining = expected - received;
    services
        .messenger
        .send(sender, &format!("{remaining} more photo(s) needed."))
        .await;
    *state = DialogueState::AwaitingPhotos {
        draft,
        expected,
        received,
        staging_dir,
        staged,
    };
    Ok(None)
}

/// Search remote folders by keyword and present the candidates. A miss (or a
/// search failure) ends the flow so the sender is never parked waiting for a
/// choice that cannot come.
pub async fn handle_search(
    services: &Services,
    sender: &str,
    state: &mut DialogueState,
    keyword: &str,
) -> String {
    let candidates = match deletion::search_candidates(services.drive.as_ref(), keyword).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(sender = %sender, keyword = %keyword, error = ?e, "folder search failed");
            *state = DialogueState::Idle;
            return NOT_FOUND_REPLY.to_string();
        }
    };

    if candidates.is_empty() {
        info!(sender = %sender, keyword = %keyword, "folder search matched nothing");
        *state = DialogueState::Idle;
        return NOT_FOUND_REPLY.to_string();
    }

    let folder_list = candidates
        .iter()
        .map(|c| format!("- {} (id: {})", c.display_path, c.folder_id))
        .collect::<Vec<_>>()
        .join("\n");
    info!(sender = %sender, keyword = %keyword, matches = candidates.len(), "folder candidates listed");
    *state = DialogueState::AwaitingDeleteFolderChoice { candidates };

    format!(
        "Matching folders:\n{folder_list}\n\nPlease reply with the full name and id of the folder to delete."
    )
}

/// Delete the chosen folder and its listing record, reporting the aggregated
/// outcome. Terminal either way: the session returns to `Idle`.
pub async fn handle_delete_choice(
    services: &Services,
    sender: &str,
    state: &mut DialogueState,
    folder_id: &str,
    choice_text: &str,
) -> String {
    let outcome = deletion::delete_listing(services, folder_id, choice_text).await;
    *state = DialogueState::Idle;

    match outcome {
        deletion::DeleteOutcome::Deleted => {
            info!(sender = %sender, folder_id = %folder_id, "listing deleted");
            DELETE_SUCCESS_REPLY.to_string()
        }
        deletion::DeleteOutcome::Failed(errors) => {
            warn!(sender = %sender, folder_id = %folder_id, "listing deletion incomplete");
            let mut reply = String::from("Problems occurred while deleting:\n");
            reply.push_str(&errors.join("\n"));
            reply
        }
    }
}
