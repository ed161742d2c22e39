//! Modules for saving/restoring application data to persistent storage.

/// For persisting the user's context menu settings.
pub mod menu_settings;
pub use menu_settings::*;
