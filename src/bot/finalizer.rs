//! Listing finalization: remote folder, photo uploads, database record.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tracing::{error, info};

use crate::db::NewListing;
use crate::drive::DriveStorage;
use crate::listing::{self, ListingDraft};

use super::Services;

/// Find the parent folder for a listing: the root listings folder for the
/// default room layout, otherwise a per-layout folder created on demand.
async fn resolve_parent_folder(
    drive: &dyn DriveStorage,
    root_folder: &str,
    room_count: &str,
) -> Result<String> {
    if listing::is_default_layout(room_count) {
        return Ok(root_folder.to_string());
    }

    let layout_name = room_count.trim();
    let existing = drive
        .search_folders(layout_name)
        .await
        .context("room layout folder lookup failed")?
        .into_iter()
        .find(|f| f.name == layout_name && f.parents.iter().any(|p| p == root_folder));

    match existing {
        Some(folder) => Ok(folder.id),
        None => drive
            .create_folder(layout_name, root_folder)
            .await
            .context("room layout folder create failed"),
    }
}

/// Run the finalization pipeline for a completed photo set.
///
/// Folder creation, uploads and persistence each fail independently; any
/// failure aborts the remaining steps and leaves the staging directory in
/// place for manual recovery. Only a fully persisted listing removes it.
/// Returns the shareable folder link.
pub async fn finalize_listing(
    services: &Services,
    draft: &ListingDraft,
    staging_dir: &Path,
) -> Result<String> {
    let parent_id = resolve_parent_folder(
        services.drive.as_ref(),
        &services.drive_root_folder,
        &draft.room_count,
    )
    .await?;

    let folder_name = listing::folder_name(draft);
    let folder_id = services
        .drive
        .create_folder(&folder_name, &parent_id)
        .await
        .context("listing folder create failed")?;
    services
        .drive
        .set_public_read(&folder_id)
        .await
        .context("listing folder permission failed")?;

    let staged_count = std::fs::read_dir(staging_dir)
        .with_context(|| format!("failed to read staging dir {}", staging_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .count();

    let links = services.drive.upload_all(staging_dir, &folder_id).await?;
    if staged_count > 0 && links.is_empty() {
        return Err(anyhow!("no photos were uploaded to the listing folder"));
    }
    info!(folder_id = %folder_id, uploaded = links.len(), "listing photos uploaded");

    let drive_link = format!("https://drive.google.com/drive/folders/{folder_id}");
    let record = NewListing {
        title: listing::listing_title(draft),
        description: draft.description.clone(),
        price: listing::parse_metric(&draft.price),
        neighborhood: draft.neighborhood.clone(),
        street: draft.street.clone(),
        room_count: draft.room_count.clone(),
        area: listing::parse_metric(&draft.area),
        drive_link: drive_link.clone(),
    };
    let stored = services
        .listings
        .create(record)
        .await
        .context("listing persistence failed")?;
    info!(id = stored.id, title = %stored.title, "listing persisted");

    if let Err(e) = std::fs::remove_dir_all(staging_dir) {
        // The listing is saved; a leftover staging dir is an operator chore,
        // not a user-facing failure.
        error!(staging_dir = %staging_dir.display(), error = %e, "failed to remove staging dir");
    }

    Ok(drive_link)
}
