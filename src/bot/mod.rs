//! Bot module wiring the dialogue engine to its collaborators.
//!
//! Split into several submodules:
//! - `message_handler`: per-sender locking, step dispatch and the error boundary
//! - `dialogue_manager`: effectful handlers for each dialogue phase
//! - `finalizer`: folder creation, photo upload and persistence of a finished listing
//! - `deletion`: keyword search and confirmed folder/record deletion

pub mod deletion;
pub mod dialogue_manager;
pub mod finalizer;
pub mod message_handler;

use std::path::PathBuf;
use std::sync::Arc;

use crate::db::ListingStore;
use crate::drive::DriveStorage;
use crate::parser::DetailParser;
use crate::session::SessionStore;
use crate::twilio::Messenger;

// Re-export the webhook entry point for use in main.rs
pub use message_handler::handle_incoming;

/// Everything a dialogue step may need: the conversation store plus the four
/// external collaborators behind their trait boundaries, and the two settings
/// the finalizer places folders and staged photos with.
pub struct Services {
    pub sessions: SessionStore,
    pub parser: Arc<dyn DetailParser>,
    pub drive: Arc<dyn DriveStorage>,
    pub listings: Arc<dyn ListingStore>,
    pub messenger: Arc<dyn Messenger>,
    /// Drive folder all listing folders live under.
    pub drive_root_folder: String,
    /// Local directory staging directories are created in.
    pub staging_root: PathBuf,
}
