//! Transition-table coverage for the pure dialogue decision step.

use std::path::PathBuf;

use listabot::dialogue::{decide, extract_folder_id, CandidateFolder, DialogueState, Step};
use listabot::inbound::{IncomingMessage, MediaItem};
use listabot::listing::ListingDraft;

fn msg(body: &str, media_count: usize) -> IncomingMessage {
    IncomingMessage {
        from: "whatsapp:+15551234567".to_string(),
        body: body.to_string(),
        media: (0..media_count)
            .map(|i| MediaItem {
                url: format!("https://api.twilio.com/media/{i}"),
                extension: ".jpg",
            })
            .collect(),
    }
}

fn all_states() -> Vec<DialogueState> {
    vec![
        DialogueState::Idle,
        DialogueState::AwaitingListingDetails,
        DialogueState::AwaitingPhotoCount {
            draft: ListingDraft::default(),
        },
        DialogueState::AwaitingPhotos {
            draft: ListingDraft::default(),
            expected: 2,
            received: 1,
            staging_dir: PathBuf::from("staging/session"),
            staged: vec![PathBuf::from("staging/session/photo_0.jpg")],
        },
        DialogueState::AwaitingDeleteKeyword,
        DialogueState::AwaitingDeleteFolderChoice {
            candidates: vec![CandidateFolder {
                display_path: "Listings/Acme".to_string(),
                folder_id: "f1".to_string(),
            }],
        },
    ]
}

/// The add command wins from every phase, however it is cased or padded.
#[test]
fn test_add_command_from_every_state() {
    for state in all_states() {
        for body in ["/add", "/ADD", "  /Add  "] {
            assert_eq!(
                decide(&state, &msg(body, 0)),
                Step::StartListing,
                "state {state:?} body {body:?}"
            );
        }
    }
}

/// The delete command wins from every phase too.
#[test]
fn test_delete_command_from_every_state() {
    for state in all_states() {
        assert_eq!(decide(&state, &msg("/delete", 0)), Step::StartDeletion);
    }
}

/// A command arriving with attachments is still a command.
#[test]
fn test_command_with_attachments_still_wins() {
    let state = DialogueState::AwaitingPhotos {
        draft: ListingDraft::default(),
        expected: 2,
        received: 0,
        staging_dir: PathBuf::from("staging/session"),
        staged: Vec::new(),
    };
    assert_eq!(decide(&state, &msg("/add", 2)), Step::StartListing);
}

#[test]
fn test_photo_count_boundaries() {
    let state = DialogueState::AwaitingPhotoCount {
        draft: ListingDraft::default(),
    };
    assert_eq!(
        decide(&state, &msg("0", 0)),
        Step::AcceptPhotoCount { count: 0 }
    );
    assert_eq!(
        decide(&state, &msg("10", 0)),
        Step::AcceptPhotoCount { count: 10 }
    );
    for body in ["-3", "3,5", "ten", "1e2", ""] {
        assert_eq!(
            decide(&state, &msg(body, 0)),
            Step::RejectPhotoCount,
            "body {body:?}"
        );
    }
}

#[test]
fn test_photo_delivery_vs_text() {
    let state = DialogueState::AwaitingPhotos {
        draft: ListingDraft::default(),
        expected: 3,
        received: 0,
        staging_dir: PathBuf::from("staging/session"),
        staged: Vec::new(),
    };
    assert_eq!(decide(&state, &msg("", 3)), Step::CollectPhotos);
    assert_eq!(decide(&state, &msg("coming", 0)), Step::PromptForPhotos);
}

#[test]
fn test_delete_choice_id_extraction() {
    assert_eq!(
        extract_folder_id("Listings/Acme (id: 1aB_x-9)"),
        Some("1aB_x-9".to_string())
    );
    assert_eq!(extract_folder_id("(id: )"), None);
    assert_eq!(extract_folder_id("id 123"), None);

    let state = DialogueState::AwaitingDeleteFolderChoice {
        candidates: Vec::new(),
    };
    assert_eq!(decide(&state, &msg("just delete it", 0)), Step::RejectChoice);
}

#[test]
fn test_idle_free_text_is_unrecognized() {
    assert_eq!(
        decide(&DialogueState::Idle, &msg("hi there", 0)),
        Step::Unrecognized
    );
    assert_eq!(decide(&DialogueState::Idle, &msg("", 2)), Step::Unrecognized);
}
