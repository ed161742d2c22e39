//! The chat view's message interaction layer: the message context menu,
//! its reaction strip and viewers button, and the connection status banner.

pub mod connection_status;
pub mod message_actions;
pub mod message_context_menu;
pub mod message_viewers;
pub mod reaction_item;
pub mod reactions_menu;
