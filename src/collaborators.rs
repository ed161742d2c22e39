//! Interfaces to the parts of the chat client that this crate does not own:
//! message and permission data, the reaction catalog, reaction sending,
//! the reactor/viewer list, and the animation resource source.
//!
//! Lookups that may suspend return a [`Lookup`], which is either ready right away
//! or resolved later by a background task.

use std::{
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::shared::lookup::Lookup;

/// Identifies a user, chat, or channel.
pub type PeerId = i64;
/// Identifies a message within a peer's history. Sponsored placeholders have negative IDs.
pub type MessageId = i64;

/// A reference to a vector animation resource (a document ID).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimationRef(pub String);

impl From<&str> for AnimationRef {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// The decoded metadata of an animation resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationInfo {
    pub frame_count: u32,
}

/// Fetches and decodes animation resources.
pub trait AnimationSource {
    fn fetch(&self, resource: &AnimationRef, size: u32) -> Lookup<anyhow::Result<AnimationInfo>>;
}

/// A reaction that can be sent to a message, as described by the reaction catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionDescriptor {
    /// The reaction identifier, typically an emoji.
    pub reaction: String,
    pub static_icon: AnimationRef,
    pub appear_animation: AnimationRef,
    pub select_animation: AnimationRef,
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct MessageFlags: u8 {
        /// The message is still being sent from this device.
        const IsOutgoing = 1 << 0;
        /// The message was sent by the current user.
        const Out = 1 << 1;
        const Pinned = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// An ordinary user-authored message.
    Regular,
    /// A service message, e.g., "Alice joined the group".
    Service,
    /// A sponsored (promotional) placeholder.
    Sponsored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentType {
    Gif,
    Video,
    Sticker,
    Audio,
    Voice,
    File,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollState {
    /// Whether the current user has voted.
    pub has_chosen: bool,
    pub closed: bool,
    pub quiz: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageMedia {
    Document { doc_type: Option<DocumentType> },
    Poll(PollState),
    Photo,
}

/// A snapshot of the message data that the context menu needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub mid: MessageId,
    pub peer_id: PeerId,
    pub kind: MessageKind,
    pub flags: MessageFlags,
    pub text: Option<String>,
    pub media: Option<MessageMedia>,
    /// Peers that recently reacted to this message, most recent first.
    pub recent_reactions: Vec<PeerId>,
    /// The sender of the message, if known.
    pub from_id: Option<PeerId>,
    /// For a discussion thread's root: the ID of the channel post it was forwarded from.
    pub fwd_channel_post: Option<MessageId>,
}

impl Message {
    /// A plain regular message with the given text.
    pub fn new(peer_id: PeerId, mid: MessageId, text: impl Into<String>) -> Self {
        Self {
            mid,
            peer_id,
            kind: if mid < 0 { MessageKind::Sponsored } else { MessageKind::Regular },
            flags: MessageFlags::empty(),
            text: Some(text.into()),
            media: None,
            recent_reactions: Vec::new(),
            from_id: None,
            fwd_channel_post: None,
        }
    }

    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn is_outgoing(&self) -> bool {
        self.flags.contains(MessageFlags::IsOutgoing)
    }

    pub fn is_out(&self) -> bool {
        self.flags.contains(MessageFlags::Out)
    }

    pub fn is_pinned(&self) -> bool {
        self.flags.contains(MessageFlags::Pinned)
    }

    pub fn poll(&self) -> Option<&PollState> {
        match &self.media {
            Some(MessageMedia::Poll(poll)) => Some(poll),
            _ => None,
        }
    }
}

/// The kind of chat view a message is displayed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatType {
    Chat,
    Scheduled,
    /// The comments thread of a channel post.
    Discussion { thread_id: MessageId },
    Pinned,
}

/// What kind of edit is being checked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditKind {
    Text,
    Poll,
}

/// The bulk-selection state of a chat view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub is_selecting: bool,
    pub selected: BTreeMap<PeerId, BTreeSet<MessageId>>,
    pub send_now_enabled: bool,
    /// `None` if the view has no bulk "forward" button at all.
    pub forward_enabled: Option<bool>,
    pub delete_enabled: bool,
}

impl SelectionSnapshot {
    pub fn is_selected(&self, peer_id: PeerId, mid: MessageId) -> bool {
        self.selected.get(&peer_id).is_some_and(|mids| mids.contains(&mid))
    }
}

/// The chat view that hosts the messages.
pub trait ChatView {
    fn peer_id(&self) -> PeerId;
    fn chat_type(&self) -> ChatType;
    fn message(&self, mid: MessageId) -> Option<Message>;
    /// All message IDs in the same album as `mid`, or just `[mid]`.
    fn mids_by_mid(&self, mid: MessageId) -> Vec<MessageId>;
    fn selection(&self) -> SelectionSnapshot;
    fn can_select(&self, mid: MessageId) -> bool;
    fn can_send(&self) -> bool;
    fn has_message_input(&self) -> bool;
    /// The server-side ID of a message, as used in public links.
    fn server_message_id(&self, mid: MessageId) -> MessageId {
        mid
    }
}

/// Permission and peer metadata lookups.
pub trait PeerPermissions {
    fn can_forward(&self, message: &Message) -> bool;
    fn can_edit(&self, message: &Message, kind: EditKind) -> bool;
    fn can_delete(&self, message: &Message) -> bool;
    fn can_pin(&self, peer_id: PeerId) -> bool;
    fn is_channel(&self, peer_id: PeerId) -> bool;
    fn is_user(&self, peer_id: PeerId) -> bool;
    fn can_view_read_participants(&self, message: &Message) -> bool;
    fn participants_count(&self, peer_id: PeerId) -> Option<u32>;
    fn username(&self, peer_id: PeerId) -> Option<String>;
    /// The first name of a user or the title of a chat.
    fn display_name(&self, peer_id: PeerId) -> String;
}

pub trait ReactionCatalog {
    /// The reactions that may be sent to the given message, in display order.
    fn available_reactions(&self, message: &Message) -> Lookup<anyhow::Result<Vec<ReactionDescriptor>>>;
}

pub trait ReactionSender {
    /// Sends a reaction. Fire-and-forget.
    fn send_reaction(&self, message: &Message, reaction: &str);
}

/// A peer that reacted to or viewed a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactorEntry {
    pub peer_id: PeerId,
    /// The reaction sent by this peer, or `None` if they only read the message.
    pub reaction: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReactorsList {
    pub combined: Vec<ReactorEntry>,
}

pub trait ReactorsProvider {
    fn reactions_and_read_participants(&self, message: &Message) -> Lookup<anyhow::Result<ReactorsList>>;
}

/// All collaborators needed by the message context menu.
#[derive(Clone)]
pub struct Collaborators {
    pub chat: Rc<dyn ChatView>,
    pub permissions: Rc<dyn PeerPermissions>,
    pub reaction_catalog: Rc<dyn ReactionCatalog>,
    pub reaction_sender: Rc<dyn ReactionSender>,
    pub reactors: Rc<dyn ReactorsProvider>,
    pub animations: Rc<dyn AnimationSource>,
}
