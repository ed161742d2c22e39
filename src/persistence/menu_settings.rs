use std::{io::Write, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::{
    app_data_dir,
    home::reaction_item::REACTION_CONTAINER_SIZE,
    shared::geometry::Orientation,
};

const MENU_SETTINGS_FILE_NAME: &str = "menu_settings.json";

/// The kind of device the app runs on, which decides how menus are laid out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Platform {
    /// The device has a touchscreen and no hover-capable pointer.
    pub is_touch: bool,
    pub is_apple: bool,
}

impl Platform {
    /// Desktop devices place the reaction strip vertically beside the menu;
    /// touch and Apple devices place it horizontally above the menu.
    pub fn reaction_strip_orientation(&self) -> Orientation {
        if self.is_touch || self.is_apple {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }
}

/// User-configurable settings of the message context menu.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuSettings {
    /// If false, reactions show only their static icons.
    pub animations_enabled: bool,
    pub platform: Platform,
    /// How long a closed menu stays attached so that its closing transition can play.
    pub close_delay_ms: u64,
    /// The visible length of the reaction strip along its scroll axis.
    pub reactions_viewport_extent: f64,
    pub menu_width: f64,
    pub button_height: f64,
    /// The prefix of shareable message links.
    pub message_link_base: String,
}

impl Default for MenuSettings {
    fn default() -> Self {
        Self {
            animations_enabled: true,
            platform: Platform::default(),
            close_delay_ms: 300,
            reactions_viewport_extent: REACTION_CONTAINER_SIZE * 5.0,
            menu_width: 215.0,
            button_height: 35.0,
            message_link_base: "https://t.me/".to_owned(),
        }
    }
}

/// The default location of the menu settings file, within the app's data directory.
pub fn default_menu_settings_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join(MENU_SETTINGS_FILE_NAME))
}

/// Saves the given menu settings to the file at `path`.
pub fn save_menu_settings(path: &Path, settings: &MenuSettings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, settings)?;
    writer.flush()?;
    debug!("Successfully saved menu settings to {path:?}.");
    Ok(())
}

/// Loads the menu settings from the file at `path`.
///
/// If the file doesn't exist, this returns the default settings.
/// If the file can't be deserialized, it is backed up to `<path>.bak`
/// and the default settings are returned.
pub async fn load_menu_settings(path: &Path) -> anyhow::Result<MenuSettings> {
    let file_bytes = match tokio::fs::read(path).await {
        Ok(fb) => fb,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No saved menu settings found at {path:?}, using defaults.");
            return Ok(MenuSettings::default());
        }
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_slice(&file_bytes) {
        Ok(settings) => {
            debug!("Successfully loaded menu settings from {path:?}.");
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to deserialize menu settings: {e}.");

            let mut backup_path = path.as_os_str().to_owned();
            backup_path.push(".bak");
            let backup_path = PathBuf::from(backup_path);
            if let Err(backup_err) = tokio::fs::rename(path, &backup_path).await {
                error!("Failed to back up the old menu settings file: {backup_err}");
            } else {
                warn!("Old menu settings backed up to: {backup_path:?}");
            }
            Ok(MenuSettings::default())
        }
    }
}
