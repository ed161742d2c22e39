use std::{path::Path, sync::OnceLock};

use directories::ProjectDirs;

/// Vector animation players and their scheduling.
pub mod animation;
/// Interfaces to the chat data and services that the menu depends on.
pub mod collaborators;
pub mod error;
/// The message context menu, reaction strip, viewers button, and connection status banner.
pub mod home;
/// Saving and restoring settings.
pub mod persistence;
/// Shared geometry, cancellation, and async lookup helpers.
pub mod shared;
pub mod utils;


pub const APP_QUALIFIER: &str = "org";
pub const APP_ORGANIZATION: &str = "robius";
pub const APP_NAME: &str = "chat-menu";

/// Returns the app's project directories, or `None` if no home directory could be found.
pub fn project_dir() -> Option<&'static ProjectDirs> {
    static CHAT_MENU_PROJECT_DIRS: OnceLock<Option<ProjectDirs>> = OnceLock::new();

    CHAT_MENU_PROJECT_DIRS.get_or_init(|| {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
    }).as_ref()
}

pub fn app_data_dir() -> Option<&'static Path> {
    project_dir().map(ProjectDirs::data_dir)
}
