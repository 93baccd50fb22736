//! Listing deletion: keyword search with full display paths, then paired
//! folder/record deletion with per-side failure reporting.

use anyhow::Result;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::dialogue::CandidateFolder;
use crate::drive::{DriveStorage, FolderMeta};
use crate::listing::FOLDER_TAG;

use super::Services;

/// Outcome of a confirmed deletion.
#[derive(Clone, Debug, PartialEq)]
pub enum DeleteOutcome {
    /// Both the remote folder and the database record were removed.
    Deleted,
    /// One or both sides failed; each line names the failing side.
    Failed(Vec<String>),
}

/// Resolve a folder's ancestor-chain display path, e.g.
/// `Listings/2 + 1/Acme Heights-Elm St-2 + 1 #LISTABOT`.
///
/// `memo` caches folder metadata for the duration of one search so candidates
/// sharing ancestors do not re-fetch them. Any lookup failure returns `None`
/// and the caller falls back to the folder's own name.
async fn display_path(
    drive: &dyn DriveStorage,
    folder_id: &str,
    memo: &mut HashMap<String, FolderMeta>,
) -> Option<String> {
    let mut segments = Vec::new();
    let mut current = folder_id.to_string();

    loop {
        let meta = match memo.get(&current).cloned() {
            Some(meta) => meta,
            None => {
                let fetched = match drive.folder_metadata(&current).await {
                    Ok(meta) => meta,
                    Err(e) => {
                        debug!(folder_id = %current, error = ?e, "ancestor lookup failed");
                        return None;
                    }
                };
                memo.insert(current.clone(), fetched.clone());
                fetched
            }
        };

        segments.push(meta.name);
        match meta.parents.first() {
            Some(parent) => current = parent.clone(),
            None => break,
        }
    }

    segments.reverse();
    Some(segments.join("/"))
}

/// Search remote folders by keyword, resolving each match's display path.
pub async fn search_candidates(
    drive: &dyn DriveStorage,
    keyword: &str,
) -> Result<Vec<CandidateFolder>> {
    let matches = drive.search_folders(keyword).await?;

    // The matches themselves count as resolved metadata.
    let mut memo: HashMap<String, FolderMeta> = matches
        .iter()
        .map(|f| (f.id.clone(), f.clone()))
        .collect();
    let mut candidates = Vec::with_capacity(matches.len());
    for folder in matches {
        let path = display_path(drive, &folder.id, &mut memo)
            .await
            .unwrap_or_else(|| folder.name.clone());
        candidates.push(CandidateFolder {
            display_path: path,
            folder_id: folder.id,
        });
    }
    Ok(candidates)
}

/// Derive the persisted listing title from the user's choice text: drop the
/// ` (id: ...)` suffix, keep the last path segment, strip the marketing tag.
pub fn title_from_choice(choice_text: &str) -> String {
    let name = choice_text
        .split(" (id:")
        .next()
        .unwrap_or(choice_text);
    let name = name.rsplit('/').next().unwrap_or(name);
    name.replace(&format!(" {FOLDER_TAG}"), "").trim().to_string()
}

/// Delete the remote folder and the matching listing record. Both sides are
/// attempted regardless of the other's outcome; success requires both.
pub async fn delete_listing(
    services: &Services,
    folder_id: &str,
    choice_text: &str,
) -> DeleteOutcome {
    let (drive_ok, drive_message) = services.drive.delete_folder(folder_id).await;

    let title = title_from_choice(choice_text);
    let (db_ok, db_message) = services.listings.delete_by_title(&title).await;

    if drive_ok && db_ok {
        return DeleteOutcome::Deleted;
    }

    let mut errors = Vec::new();
    if !drive_ok {
        warn!(folder_id = %folder_id, message = %drive_message, "drive-side delete failed");
        errors.push(format!("Storage: {drive_message}"));
    }
    if !db_ok {
        warn!(title = %title, message = %db_message, "database-side delete failed");
        errors.push(format!("Database: {db_message}"));
    }
    DeleteOutcome::Failed(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_full_choice_text() {
        let title = title_from_choice(
            "Listings/2 + 1/Acme Heights-Elm St-2 + 1 #LISTABOT (id: 1aB_x-9)",
        );
        assert_eq!(title, "Acme Heights-Elm St-2 + 1");
    }

    #[test]
    fn test_title_without_path_or_id() {
        assert_eq!(
            title_from_choice("Acme Heights-Elm St-3 + 1 #LISTABOT"),
            "Acme Heights-Elm St-3 + 1"
        );
    }

    #[test]
    fn test_title_without_tag() {
        assert_eq!(
            title_from_choice("Acme Heights-Elm St-3 + 1 (id: abc)"),
            "Acme Heights-Elm St-3 + 1"
        );
    }
}
