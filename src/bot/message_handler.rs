//! Webhook entry point: serializes per-sender processing, dispatches the
//! decided step and keeps every failure inside a valid reply.

use tracing::{error, info};

use crate::dialogue::{decide, DialogueState, Step};
use crate::inbound::IncomingMessage;

use super::dialogue_manager;
use super::Services;

pub const INVALID_COMMAND_REPLY: &str = "Invalid command. Use /add to create a listing.";
pub const GENERIC_FAILURE_REPLY: &str = "Something went wrong. Please try again.";

/// Process one inbound message and produce the reply body, if any.
///
/// The sender's state cell is locked for the whole step, so a second delivery
/// from the same sender waits until this one has committed its transition.
/// Collaborator errors never escape: they are logged, the sender is returned
/// to `Idle`, and a generic retry reply is produced.
pub async fn handle_incoming(services: &Services, msg: IncomingMessage) -> Option<String> {
    let cell = services.sessions.entry(&msg.from);
    let mut state = cell.lock().await;

    info!(
        sender = %msg.from,
        media = msg.media.len(),
        "processing inbound message"
    );

    match dispatch(services, &msg, &mut state).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(sender = %msg.from, error = ?e, "dialogue step failed");
            *state = DialogueState::Idle;
            Some(GENERIC_FAILURE_REPLY.to_string())
        }
    }
}

async fn dispatch(
    services: &Services,
    msg: &IncomingMessage,
    state: &mut DialogueState,
) -> anyhow::Result<Option<String>> {
    let step = decide(state, msg);

    let reply = match step {
        Step::StartListing => Some(dialogue_manager::start_listing(&msg.from, state)),
        Step::StartDeletion => Some(dialogue_manager::start_deletion(&msg.from, state)),
        Step::ParseDetails { text } => {
            Some(dialogue_manager::handle_details(services, &msg.from, state, &text).await)
        }
        Step::AcceptPhotoCount { count } => Some(
            dialogue_manager::handle_photo_count(services, &msg.from, state, count).await?,
        ),
        Step::RejectPhotoCount => Some(dialogue_manager::INVALID_COUNT_REPLY.to_string()),
        Step::CollectPhotos => {
            dialogue_manager::handle_photos(services, &msg.from, state, &msg.media).await?
        }
        Step::PromptForPhotos => {
            dialogue_manager::prompt_for_photos(services, &msg.from).await;
            None
        }
        Step::SearchFolders { keyword } => {
            Some(dialogue_manager::handle_search(services, &msg.from, state, &keyword).await)
        }
        Step::DeleteChosen {
            folder_id,
            choice_text,
        } => Some(
            dialogue_manager::handle_delete_choice(
                services,
                &msg.from,
                state,
                &folder_id,
                &choice_text,
            )
            .await,
        ),
        Step::RejectChoice => Some(dialogue_manager::MISSING_ID_REPLY.to_string()),
        Step::Unrecognized => Some(INVALID_COMMAND_REPLY.to_string()),
    };

    Ok(reply)
}
