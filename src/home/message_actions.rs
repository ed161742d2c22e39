//! The actions offered by the message context menu.
//!
//! [`ACTION_CATALOG`] is a fixed, ordered list of action descriptors.
//! Each one carries a pure eligibility predicate over the [`ContextMenuState`]
//! that was captured when the menu was opened.
//! [`build_action_list()`] filters the catalog for a given state,
//! and [`resolve_action()`] turns an activated action into a [`MessageAction`]
//! for the embedding app to carry out.

use bitflags::bitflags;
use tracing::warn;
use url::Url;

use crate::{
    collaborators::{
        ChatType, ChatView, DocumentType, EditKind, Message, MessageId, MessageKind, MessageMedia,
        PeerId, PeerPermissions, SelectionSnapshot,
    },
    utils::{MessageLink, private_message_link, public_message_link},
};

bitflags! {
    /// Permission and chat-view facts about the target message,
    /// captured once when the context menu is opened.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct MessageAbilities: u16 {
        /// Whether the user can send messages to this chat.
        const CanSend = 1 << 0;
        /// Whether the chat view has a message input bar.
        const HasMessageInput = 1 << 1;
        const CanEditText = 1 << 2;
        const CanEditPoll = 1 << 3;
        const CanDelete = 1 << 4;
        /// Whether the user can pin/unpin messages in this chat.
        const CanPin = 1 << 5;
        const CanForward = 1 << 6;
        const IsChannel = 1 << 7;
        /// Whether the chat is a one-on-one chat with a user.
        const IsUserPeer = 1 << 8;
        const CanViewReadParticipants = 1 << 9;
        /// The bulk "send now" button is enabled.
        const SelectionSendNowEnabled = 1 << 10;
        /// The bulk "forward" button exists and is enabled.
        const SelectionForwardEnabled = 1 << 11;
        /// The bulk "delete" button is enabled.
        const SelectionDeleteEnabled = 1 << 12;
        /// At least one selected message has text.
        const SelectionHasText = 1 << 13;
    }
}

impl MessageAbilities {
    pub fn from_collaborators(
        message: &Message,
        chat: &dyn ChatView,
        permissions: &dyn PeerPermissions,
        selection: &SelectionSnapshot,
    ) -> Self {
        let peer_id = chat.peer_id();
        let mut abilities = Self::empty();
        abilities.set(Self::CanSend, chat.can_send());
        abilities.set(Self::HasMessageInput, chat.has_message_input());
        abilities.set(Self::CanEditText, permissions.can_edit(message, EditKind::Text));
        abilities.set(Self::CanEditPoll, permissions.can_edit(message, EditKind::Poll));
        abilities.set(Self::CanDelete, permissions.can_delete(message));
        abilities.set(Self::CanPin, permissions.can_pin(peer_id));
        abilities.set(Self::CanForward, permissions.can_forward(message));
        abilities.set(Self::IsChannel, permissions.is_channel(peer_id));
        abilities.set(Self::IsUserPeer, permissions.is_user(peer_id));
        abilities.set(Self::CanViewReadParticipants, permissions.can_view_read_participants(message));
        abilities.set(Self::SelectionSendNowEnabled, selection.send_now_enabled);
        abilities.set(Self::SelectionForwardEnabled, selection.forward_enabled == Some(true));
        abilities.set(Self::SelectionDeleteEnabled, selection.delete_enabled);
        // The chat view only resolves messages of its own peer.
        let selection_has_text = selection.selected.get(&peer_id)
            .is_some_and(|mids| mids.iter().any(|&mid| chat.message(mid).is_some_and(|m| m.has_text())));
        abilities.set(Self::SelectionHasText, selection_has_text);
        abilities
    }
}

/// What kind of element was under the pointer when the menu was opened.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ClickTarget {
    #[default]
    Plain,
    /// An external link.
    Link { href: String, text: String },
    /// A `@username` mention.
    Mention(String),
    Hashtag(String),
}

/// Everything the action predicates may look at, captured once per open.
#[derive(Clone, Debug)]
pub struct ContextMenuState {
    pub peer_id: PeerId,
    /// The effective target message ID.
    pub mid: MessageId,
    pub message: Message,
    pub chat_type: ChatType,
    pub is_sponsored: bool,
    pub is_selecting: bool,
    /// Whether the target message is part of the bulk selection.
    pub is_selected: bool,
    pub is_selectable: bool,
    /// Whether some text is currently selected (highlighted) in the chat.
    pub is_text_selected: bool,
    /// Whether the pointer landed on the message body rather than on peripheral chrome.
    pub is_over_bubble: bool,
    /// Whether the pointer landed on one item of an album.
    pub is_target_grouped_item: bool,
    pub target: ClickTarget,
    /// Whether the pointer landed on a document or audio attachment.
    pub is_document_target: bool,
    /// Forwarding and copying are restricted for this message.
    pub no_forwards: bool,
    pub is_touch: bool,
    pub abilities: MessageAbilities,
}

impl ContextMenuState {
    fn is_scheduled(&self) -> bool {
        self.chat_type == ChatType::Scheduled
    }

    fn has(&self, ability: MessageAbilities) -> bool {
        self.abilities.contains(ability)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    ScheduleSend,
    SendNowSelection,
    EditScheduleTime,
    Reply,
    Edit,
    Copy,
    CopySelectedText,
    CopySelection,
    CopyLink,
    CopyUsername,
    CopyHashtag,
    CopyMessageLink,
    Pin,
    Unpin,
    Download,
    RetractVote,
    StopPoll,
    Forward,
    ForwardSelection,
    Report,
    Select,
    ClearSelection,
    /// "Who reacted / who viewed". Its label is filled in asynchronously.
    Viewers,
    Delete,
    DeleteSelection,
    SponsoredInfo,
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct ActionFlags: u8 {
        /// The action stays available while messages are bulk-selected.
        const WithSelection = 1 << 0;
        /// The action is offered for sponsored messages, and only for them.
        const Sponsored = 1 << 1;
    }
}

/// A template for one context menu button.
#[derive(Clone, Copy, Debug)]
pub struct ActionDescriptor {
    pub kind: ActionKind,
    pub icon: &'static str,
    /// Empty for the viewers action.
    pub label: &'static str,
    pub flags: ActionFlags,
    pub is_eligible: fn(&ContextMenuState) -> bool,
}

const fn action(
    kind: ActionKind,
    icon: &'static str,
    label: &'static str,
    flags: ActionFlags,
    is_eligible: fn(&ContextMenuState) -> bool,
) -> ActionDescriptor {
    ActionDescriptor { kind, icon, label, flags, is_eligible }
}

const NONE: ActionFlags = ActionFlags::empty();
const WITH_SELECTION: ActionFlags = ActionFlags::WithSelection;

/// All context menu actions, in display order.
pub static ACTION_CATALOG: [ActionDescriptor; 26] = [
    action(ActionKind::ScheduleSend, "send2", "Send Now", NONE, can_schedule_send),
    action(ActionKind::SendNowSelection, "send2", "Send Selected Now", WITH_SELECTION, can_send_selection_now),
    action(ActionKind::EditScheduleTime, "schedule", "Reschedule", NONE, is_scheduled),
    action(ActionKind::Reply, "reply", "Reply", NONE, can_reply),
    action(ActionKind::Edit, "edit", "Edit", NONE, can_edit),
    action(ActionKind::Copy, "copy", "Copy Text", NONE, can_copy),
    action(ActionKind::CopySelectedText, "copy", "Copy Selected Text", NONE, can_copy_selected_text),
    action(ActionKind::CopySelection, "copy", "Copy Selected as Text", WITH_SELECTION, can_copy_selection),
    action(ActionKind::CopyLink, "copy", "Copy Link", WITH_SELECTION, is_link_target),
    action(ActionKind::CopyUsername, "copy", "Copy Username", WITH_SELECTION, is_mention_target),
    action(ActionKind::CopyHashtag, "copy", "Copy Hashtag", WITH_SELECTION, is_hashtag_target),
    action(ActionKind::CopyMessageLink, "link", "Copy Message Link", NONE, can_copy_message_link),
    action(ActionKind::Pin, "pin", "Pin", NONE, can_pin),
    action(ActionKind::Unpin, "unpin", "Unpin", NONE, can_unpin),
    action(ActionKind::Download, "download", "Download", NONE, can_download),
    action(ActionKind::RetractVote, "checkretract", "Retract Vote", NONE, can_retract_vote),
    action(ActionKind::StopPoll, "stop", "Stop Poll", NONE, can_stop_poll),
    action(ActionKind::Forward, "forward", "Forward", NONE, can_forward),
    action(ActionKind::ForwardSelection, "forward", "Forward Selected", WITH_SELECTION, can_forward_selection),
    action(ActionKind::Report, "flag", "Report", WITH_SELECTION, can_report),
    action(ActionKind::Select, "select", "Select", WITH_SELECTION, can_select),
    action(ActionKind::ClearSelection, "select", "Clear Selection", WITH_SELECTION, is_selected),
    action(ActionKind::Viewers, "", "", NONE, can_view_viewers),
    action(ActionKind::Delete, "delete danger", "Delete", NONE, can_delete),
    action(ActionKind::DeleteSelection, "delete danger", "Delete Selected", WITH_SELECTION, can_delete_selection),
    action(ActionKind::SponsoredInfo, "info", "What are sponsored messages?", ActionFlags::Sponsored, never),
];

fn can_schedule_send(s: &ContextMenuState) -> bool {
    s.is_scheduled() && !s.message.is_outgoing()
}

fn can_send_selection_now(s: &ContextMenuState) -> bool {
    s.is_scheduled() && s.is_selected && s.has(MessageAbilities::SelectionSendNowEnabled)
}

fn is_scheduled(s: &ContextMenuState) -> bool {
    s.is_scheduled()
}

fn can_reply(s: &ContextMenuState) -> bool {
    s.has(MessageAbilities::CanSend)
        && !s.message.is_outgoing()
        && s.has(MessageAbilities::HasMessageInput)
        && !s.is_scheduled()
}

fn can_edit(s: &ContextMenuState) -> bool {
    s.has(MessageAbilities::CanEditText | MessageAbilities::HasMessageInput)
}

fn can_copy(s: &ContextMenuState) -> bool {
    // Copying a message that consists of nothing but the clicked link is covered by "Copy Link".
    let is_just_the_link = match &s.target {
        ClickTarget::Link { text, .. } => s.message.text.as_deref() == Some(text.as_str()),
        _ => false,
    };
    !s.no_forwards && s.message.has_text() && !s.is_text_selected && !is_just_the_link
}

fn can_copy_selected_text(s: &ContextMenuState) -> bool {
    !s.no_forwards && s.message.has_text() && s.is_text_selected
}

fn can_copy_selection(s: &ContextMenuState) -> bool {
    s.is_selected && !s.no_forwards && s.has(MessageAbilities::SelectionHasText)
}

fn is_link_target(s: &ContextMenuState) -> bool {
    matches!(s.target, ClickTarget::Link { .. })
}

fn is_mention_target(s: &ContextMenuState) -> bool {
    matches!(s.target, ClickTarget::Mention(_))
}

fn is_hashtag_target(s: &ContextMenuState) -> bool {
    matches!(s.target, ClickTarget::Hashtag(_))
}

fn can_copy_message_link(s: &ContextMenuState) -> bool {
    s.has(MessageAbilities::IsChannel) && !s.message.is_outgoing()
}

fn can_pin(s: &ContextMenuState) -> bool {
    !s.message.is_outgoing()
        && s.message.kind != MessageKind::Service
        && !s.message.is_pinned()
        && s.has(MessageAbilities::CanPin)
        && !s.is_scheduled()
}

fn can_unpin(s: &ContextMenuState) -> bool {
    s.message.is_pinned() && s.has(MessageAbilities::CanPin)
}

fn can_download(s: &ContextMenuState) -> bool {
    if s.message.is_outgoing() {
        return false;
    }
    let Some(MessageMedia::Document { doc_type }) = &s.message.media else { return false };
    let is_good_type = !matches!(
        doc_type,
        Some(DocumentType::Gif | DocumentType::Video | DocumentType::Sticker)
    );
    is_good_type && (s.is_touch || s.is_document_target)
}

fn can_retract_vote(s: &ContextMenuState) -> bool {
    s.message.poll().is_some_and(|poll| poll.has_chosen && !poll.closed && !poll.quiz)
}

fn can_stop_poll(s: &ContextMenuState) -> bool {
    s.has(MessageAbilities::CanEditPoll)
        && s.message.poll().is_some_and(|poll| !poll.closed)
        && !s.message.is_outgoing()
}

fn can_forward(s: &ContextMenuState) -> bool {
    // Outgoing messages that were not authored by us (e.g., a changelog) can still be forwarded.
    !s.no_forwards
        && !s.is_scheduled()
        && (!s.message.is_outgoing() || !s.message.is_out())
        && s.message.kind != MessageKind::Service
}

fn can_forward_selection(s: &ContextMenuState) -> bool {
    s.is_selected && s.has(MessageAbilities::SelectionForwardEnabled)
}

fn can_report(s: &ContextMenuState) -> bool {
    !s.message.is_out()
        && s.message.kind == MessageKind::Regular
        && !s.message.is_outgoing()
        && s.has(MessageAbilities::IsChannel)
}

fn can_select(s: &ContextMenuState) -> bool {
    s.message.kind != MessageKind::Service && !s.is_selected && s.is_selectable
}

fn is_selected(s: &ContextMenuState) -> bool {
    s.is_selected
}

fn can_view_viewers(s: &ContextMenuState) -> bool {
    !s.has(MessageAbilities::IsUserPeer)
        && (!s.message.recent_reactions.is_empty() || s.has(MessageAbilities::CanViewReadParticipants))
}

fn can_delete(s: &ContextMenuState) -> bool {
    s.has(MessageAbilities::CanDelete)
}

fn can_delete_selection(s: &ContextMenuState) -> bool {
    s.is_selected && s.has(MessageAbilities::SelectionDeleteEnabled)
}

fn never(_: &ContextMenuState) -> bool {
    false
}

/// Returns the actions to show for the given state, in catalog order.
pub fn build_action_list(state: &ContextMenuState) -> Vec<&'static ActionDescriptor> {
    filter_actions(&ACTION_CATALOG, state)
}

/// Filters an action catalog for the given state, preserving its order.
///
/// A sponsored target keeps exactly the sponsored actions.
/// Otherwise, an action is kept if it is eligible and, during bulk selection,
/// if it also supports bulk selection.
pub fn filter_actions<'a>(catalog: &'a [ActionDescriptor], state: &ContextMenuState) -> Vec<&'a ActionDescriptor> {
    if state.is_sponsored {
        return catalog.iter()
            .filter(|a| a.flags.contains(ActionFlags::Sponsored))
            .collect();
    }
    catalog.iter()
        .filter(|a| !state.is_selecting || a.flags.contains(ActionFlags::WithSelection))
        .filter(|a| (a.is_eligible)(state))
        .collect()
}

/// An action that the user performed via the message context menu,
/// to be carried out by the embedding app.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageAction {
    /// Send the given scheduled messages right away.
    SendNow { peer_id: PeerId, mids: Vec<MessageId> },
    /// Activate the bulk "send now" button of the selection bar.
    SendNowSelection,
    /// Pick a new schedule time for a scheduled message.
    EditScheduleTime { peer_id: PeerId, mid: MessageId },
    Reply { peer_id: PeerId, mid: MessageId },
    Edit { peer_id: PeerId, mid: MessageId },
    /// Copy the given plain text to the clipboard.
    CopyText(String),
    /// Copy the text that is currently highlighted in the chat.
    CopySelectedText,
    /// Copy a link to a message to the clipboard.
    CopyMessageLink(MessageLink),
    Pin { peer_id: PeerId, mid: MessageId },
    Unpin { peer_id: PeerId, mid: MessageId },
    /// Save the message's document to disk.
    Download { peer_id: PeerId, mid: MessageId },
    RetractVote { peer_id: PeerId, mid: MessageId },
    StopPoll { peer_id: PeerId, mid: MessageId },
    Forward { peer_id: PeerId, mids: Vec<MessageId> },
    /// Activate the bulk "forward" button of the selection bar.
    ForwardSelection,
    Report { peer_id: PeerId, mids: Vec<MessageId> },
    /// Toggle whether the given message (or album item) is selected.
    ToggleSelection { peer_id: PeerId, mid: MessageId },
    ClearSelection,
    /// Open the chat with the given peer, e.g., the only viewer of a message.
    OpenPeer(PeerId),
    Delete { peer_id: PeerId, mids: Vec<MessageId>, chat_type: ChatType },
    /// Activate the bulk "delete" button of the selection bar.
    DeleteSelection,
    /// Explain what sponsored messages are.
    ShowSponsoredInfo,
}

/// The collaborators needed to resolve an activated action.
pub struct ActionContext<'a> {
    pub chat: &'a dyn ChatView,
    pub permissions: &'a dyn PeerPermissions,
    pub message_link_base: &'a str,
    /// The only viewer/reactor of the message, once known.
    pub viewer_peer_id: Option<PeerId>,
}

/// Turns an activated action into the [`MessageAction`] to post, if any.
pub fn resolve_action(kind: ActionKind, state: &ContextMenuState, cx: &ActionContext) -> Option<MessageAction> {
    let peer_id = state.peer_id;
    let mid = state.mid;
    // Album-wide actions target only the clicked album item, if any.
    let target_mids = || if state.is_target_grouped_item {
        vec![mid]
    } else {
        cx.chat.mids_by_mid(mid)
    };
    let action = match kind {
        ActionKind::ScheduleSend | ActionKind::SendNowSelection => if state.is_selecting {
            MessageAction::SendNowSelection
        } else {
            MessageAction::SendNow { peer_id, mids: cx.chat.mids_by_mid(mid) }
        },
        ActionKind::EditScheduleTime => MessageAction::EditScheduleTime { peer_id, mid },
        ActionKind::Reply => MessageAction::Reply { peer_id, mid },
        ActionKind::Edit => MessageAction::Edit { peer_id, mid },
        ActionKind::Copy | ActionKind::CopySelectedText | ActionKind::CopySelection => {
            if state.is_text_selected {
                MessageAction::CopySelectedText
            } else {
                MessageAction::CopyText(copy_text(state, cx.chat))
            }
        }
        ActionKind::CopyLink => match &state.target {
            ClickTarget::Link { href, .. } => MessageAction::CopyText(href.clone()),
            _ => return None,
        },
        ActionKind::CopyUsername | ActionKind::CopyHashtag => match &state.target {
            ClickTarget::Mention(text) | ClickTarget::Hashtag(text) => MessageAction::CopyText(text.clone()),
            _ => return None,
        },
        ActionKind::CopyMessageLink => MessageAction::CopyMessageLink(message_link(state, cx)?),
        ActionKind::Pin => MessageAction::Pin { peer_id, mid },
        ActionKind::Unpin => MessageAction::Unpin { peer_id, mid },
        ActionKind::Download => MessageAction::Download { peer_id, mid },
        ActionKind::RetractVote => MessageAction::RetractVote { peer_id, mid },
        ActionKind::StopPoll => MessageAction::StopPoll { peer_id, mid },
        ActionKind::Forward | ActionKind::ForwardSelection => if state.is_selecting {
            MessageAction::ForwardSelection
        } else {
            MessageAction::Forward { peer_id, mids: target_mids() }
        },
        ActionKind::Report => MessageAction::Report { peer_id, mids: vec![mid] },
        ActionKind::Select => MessageAction::ToggleSelection { peer_id, mid },
        ActionKind::ClearSelection => MessageAction::ClearSelection,
        ActionKind::Viewers => MessageAction::OpenPeer(cx.viewer_peer_id?),
        ActionKind::Delete | ActionKind::DeleteSelection => if state.is_selecting {
            MessageAction::DeleteSelection
        } else {
            MessageAction::Delete { peer_id, mids: target_mids(), chat_type: state.chat_type }
        },
        ActionKind::SponsoredInfo => MessageAction::ShowSponsoredInfo,
    };
    Some(action)
}

/// The plain text to copy: the target message's text, or during bulk selection,
/// the texts of all selected messages in ascending ID order.
fn copy_text(state: &ContextMenuState, chat: &dyn ChatView) -> String {
    let mids: Vec<MessageId> = if state.is_selecting {
        chat.selection().selected.get(&state.peer_id)
            .map(|mids| mids.iter().copied().collect())
            .unwrap_or_default()
    } else {
        vec![state.mid]
    };
    let mut text = String::new();
    for mid in mids {
        if let Some(message_text) = chat.message(mid).and_then(|m| m.text).filter(|t| !t.is_empty()) {
            text.push_str(&message_text);
            text.push('\n');
        }
    }
    text.trim().to_owned()
}

fn message_link(state: &ContextMenuState, cx: &ActionContext) -> Option<MessageLink> {
    let base = match Url::parse(cx.message_link_base) {
        Ok(base) => base,
        Err(e) => {
            warn!("Invalid message link base {:?}: {e}", cx.message_link_base);
            return None;
        }
    };
    let thread_message = match state.chat_type {
        ChatType::Discussion { thread_id } => cx.chat.message(thread_id),
        _ => None,
    };
    let username_peer = thread_message.as_ref()
        .and_then(|thread| thread.from_id)
        .unwrap_or(state.peer_id);
    let msg_id = cx.chat.server_message_id(state.mid);

    let link = match cx.permissions.username(username_peer) {
        Some(username) => match &thread_message {
            Some(thread) => {
                let post_id = cx.chat.server_message_id(thread.fwd_channel_post.unwrap_or(thread.mid));
                public_message_link(&base, &username, post_id, Some(msg_id))
            }
            None => public_message_link(&base, &username, msg_id, None),
        },
        None => {
            let thread = thread_message.as_ref().map(|t| cx.chat.server_message_id(t.mid));
            private_message_link(&base, state.peer_id.abs(), msg_id, thread)
        }
    };
    link.inspect_err(|e| warn!("Failed to build a link to message {}: {e}", state.mid)).ok()
}
