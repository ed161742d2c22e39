//! A context menu that appears when the user right-clicks
//! or long-presses (or on touch devices, taps) on a message in a chat.
//!
//! The menu goes through `Idle -> Resolving -> Open -> Closing -> Idle`.
//! While resolving, it works out which message the gesture targets,
//! then it captures a [`ContextMenuState`], filters the action catalog against it,
//! attaches a reaction strip for regular messages, and positions itself next to the pointer.
//! Closing tears everything down right away, but keeps the menu around
//! for a short delay so that a closing transition can play.

use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use tracing::{debug, trace, warn};

use crate::{
    animation::{AnimationPool, AnimationScheduler},
    collaborators::{Collaborators, MessageId, MessageKind, PeerId},
    error::OpenMenuError,
    persistence::MenuSettings,
    shared::{
        cancellation::CancellationScope,
        geometry::{DVec2, Orientation, Padding, dvec2},
        listeners::{ListenerSet, Listeners},
    },
};
use super::{
    message_actions::{
        ActionContext, ActionDescriptor, ActionKind, ClickTarget, ContextMenuState, MessageAbilities,
        MessageAction, build_action_list, resolve_action,
    },
    message_viewers::ViewersButton,
    reactions_menu::ReactionsMenu,
};

/// The vertical padding of the menu body, above and below its buttons.
const MENU_VERTICAL_PADDING: f64 = 16.0;
/// The size of the reaction strip's bubble, across its scroll axis.
const REACTIONS_BUBBLE_SIZE: f64 = 42.0;
const REACTIONS_BUBBLE_MARGIN: f64 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuState {
    Idle,
    Resolving,
    Open,
    /// The menu has been torn down and will be removed at the given instant.
    Closing { remove_at: Instant },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureKind {
    /// A right-click (secondary click).
    ContextMenu,
    LongPress,
    /// A plain tap, which opens the menu on touch devices.
    Tap,
}

/// An element along the path from the gesture's target up to the chat's root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HitElement {
    Link { href: String, text: String },
    Mention(String),
    Hashtag(String),
    Document,
    Audio,
    /// One item of an album (grouped media).
    GroupedItem { mid: MessageId },
    /// The wrapper around a bubble's content, i.e., the message body.
    ContentWrapper,
    /// A message bubble. `mid` is 0 if the bubble has no message.
    Bubble { mid: MessageId, is_date_separator: bool, is_incoming: bool },
    BubbleContent,
    MessageText,
    Time,
    Inner,
    Other,
}

impl HitElement {
    /// Whether tapping this element on a touch device opens the menu.
    fn opens_menu_on_tap(&self) -> bool {
        matches!(
            self,
            Self::Bubble { .. } | Self::ContentWrapper | Self::BubbleContent
                | Self::MessageText | Self::Time | Self::Inner
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Gesture {
    pub kind: GestureKind,
    /// The pointer position in window coordinates.
    pub position: DVec2,
    /// The hit-test path, innermost element first.
    pub path: Vec<HitElement>,
    /// Whether some text is currently selected in the chat.
    pub is_text_selected: bool,
}

/// Which side of the chat a message bubble is aligned to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BubbleSide {
    /// Incoming messages. Their menu opens rightward.
    Left,
    /// Outgoing messages. Their menu opens leftward.
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MenuPlacement {
    /// The top-left corner of the menu body, in window coordinates.
    pub position: DVec2,
    pub size: DVec2,
    /// Room kept free around the menu body for the reaction strip.
    pub padding: Padding,
}

/// The extra room that a reaction strip of the given orientation needs around the menu body.
pub fn reactions_padding(orientation: Orientation) -> Padding {
    let total_size = REACTIONS_BUBBLE_SIZE + REACTIONS_BUBBLE_MARGIN;
    match orientation {
        Orientation::Vertical => Padding { top: 24.0, left: total_size, ..Default::default() },
        Orientation::Horizontal => Padding { top: total_size, right: 36.0, left: 24.0, ..Default::default() },
    }
}

/// Positions a menu of the given size next to the pointer.
///
/// The menu opens away from the bubble's side, flips to the other side of the pointer
/// if it would overflow the window, and is finally clamped into the window.
pub fn position_menu(
    pointer: DVec2,
    size: DVec2,
    window_size: DVec2,
    side: BubbleSide,
    padding: Padding,
) -> DVec2 {
    let max_x = window_size.x - size.x - padding.right;
    let max_y = window_size.y - size.y - padding.bottom;
    let mut x = match side {
        BubbleSide::Left => pointer.x,
        BubbleSide::Right => pointer.x - size.x,
    };
    match side {
        BubbleSide::Left if x > max_x => x = pointer.x - size.x,
        BubbleSide::Right if x < padding.left => x = pointer.x,
        _ => {}
    }
    let mut y = pointer.y;
    if y > max_y {
        y = pointer.y - size.y;
    }
    dvec2(
        x.min(max_x).max(padding.left),
        y.min(max_y).max(padding.top),
    )
}

/// Everything that exists only while a menu is open (or closing).
#[derive(Debug)]
pub struct OpenMenu {
    pub context: ContextMenuState,
    pub actions: Vec<&'static ActionDescriptor>,
    pub reactions: Option<ReactionsMenu>,
    pub viewers: Option<ViewersButton>,
    pub placement: MenuPlacement,
    pub side: BubbleSide,
}

pub struct MessageContextMenu {
    settings: MenuSettings,
    collaborators: Collaborators,
    pool: AnimationPool,
    action_sender: Sender<MessageAction>,
    /// Shared with the reaction strip: tearing either down cancels all of the menu's pending work.
    scope: CancellationScope,
    listeners: ListenerSet,
    state: MenuState,
    menu: Option<OpenMenu>,
}

impl MessageContextMenu {
    pub fn new(
        settings: MenuSettings,
        collaborators: Collaborators,
        scheduler: AnimationScheduler,
        action_sender: Sender<MessageAction>,
    ) -> Self {
        let pool = AnimationPool::new(collaborators.animations.clone(), scheduler);
        Self {
            settings,
            collaborators,
            pool,
            action_sender,
            scope: CancellationScope::new(),
            listeners: ListenerSet::default(),
            state: MenuState::Idle,
            menu: None,
        }
    }

    pub fn state(&self) -> MenuState { self.state }
    pub fn is_open(&self) -> bool { self.state == MenuState::Open }
    pub fn menu(&self) -> Option<&OpenMenu> { self.menu.as_ref() }
    pub fn listeners(&self) -> &ListenerSet { &self.listeners }

    /// The reaction strip of the open menu, for routing scroll and hover events to it.
    pub fn reactions_menu_mut(&mut self) -> Option<&mut ReactionsMenu> {
        if !self.is_open() {
            return None;
        }
        self.menu.as_mut()?.reactions.as_mut()
    }

    /// Handles a gesture on the chat. Opens the menu if the gesture targets a message.
    ///
    /// Every rejection is silent; the returned error only says why nothing happened.
    pub fn open(&mut self, gesture: &Gesture, window_size: DVec2, now: Instant) -> Result<(), OpenMenuError> {
        let result = self.try_open(gesture, window_size, now);
        match &result {
            Ok(()) => debug!("Opened the message context menu"),
            Err(e) => debug!("Not opening the message context menu: {e}"),
        }
        result
    }

    fn try_open(&mut self, gesture: &Gesture, window_size: DVec2, now: Instant) -> Result<(), OpenMenuError> {
        let chat = self.collaborators.chat.clone();
        let permissions = self.collaborators.permissions.clone();
        let selection = chat.selection();

        let is_touch = self.settings.platform.is_touch;
        match gesture.kind {
            GestureKind::Tap if !is_touch || selection.is_selecting => return Err(OpenMenuError::GestureIgnored),
            GestureKind::Tap if !gesture.path.first().is_some_and(HitElement::opens_menu_on_tap) => {
                return Err(OpenMenuError::GestureIgnored);
            }
            GestureKind::ContextMenu | GestureKind::LongPress if is_touch => return Err(OpenMenuError::GestureIgnored),
            _ => {}
        }

        let is_over_bubble = gesture.path.contains(&HitElement::ContentWrapper);
        let (bubble_mid, is_incoming) = match gesture.path.iter().find_map(|el| match el {
            HitElement::Bubble { mid, is_date_separator, is_incoming } => Some((*mid, *is_date_separator, *is_incoming)),
            _ => None,
        }) {
            None => return Err(OpenMenuError::NoBubble),
            Some((_, true, _)) => return Err(OpenMenuError::DateSeparator),
            Some((mid, false, is_incoming)) => (mid, is_incoming),
        };

        match self.state {
            MenuState::Open | MenuState::Resolving => return Err(OpenMenuError::AlreadyOpen),
            MenuState::Closing { .. } => self.finish_close(),
            MenuState::Idle => {}
        }
        if bubble_mid == 0 {
            return Err(OpenMenuError::ZeroMessageId);
        }
        self.state = MenuState::Resolving;

        let peer_id = chat.peer_id();
        let is_sponsored = bubble_mid < 0;
        let mut mid = bubble_mid;
        // An album opened from outside its bubble content during bulk selection
        // shows the menu for its selected item, so that the selection actions apply.
        if selection.is_selecting && !is_over_bubble {
            if is_sponsored {
                self.state = MenuState::Idle;
                return Err(OpenMenuError::SponsoredDuringSelection);
            }
            let mids = chat.mids_by_mid(mid);
            if mids.len() > 1 {
                let selected_mid = if selection.is_selected(peer_id, mid) {
                    Some(mid)
                } else {
                    mids.iter().copied().find(|&m| selection.is_selected(peer_id, m))
                };
                if let Some(selected_mid) = selected_mid {
                    mid = selected_mid;
                }
            }
        }

        let grouped_item_mid = gesture.path.iter().find_map(|el| match el {
            HitElement::GroupedItem { mid } => Some(*mid),
            _ => None,
        });
        if let Some(grouped_mid) = grouped_item_mid {
            mid = grouped_mid;
        }

        let Some(message) = chat.message(mid) else {
            self.state = MenuState::Idle;
            return Err(OpenMenuError::MessageNotFound(mid));
        };

        let target = match gesture.path.first() {
            Some(HitElement::Link { href, text }) => ClickTarget::Link { href: href.clone(), text: text.clone() },
            Some(HitElement::Mention(text)) => ClickTarget::Mention(text.clone()),
            Some(HitElement::Hashtag(text)) => ClickTarget::Hashtag(text.clone()),
            _ => ClickTarget::Plain,
        };
        let context = ContextMenuState {
            peer_id,
            mid,
            chat_type: chat.chat_type(),
            is_sponsored,
            is_selecting: selection.is_selecting,
            is_selected: selection.is_selected(peer_id, mid),
            is_selectable: chat.can_select(bubble_mid),
            is_text_selected: gesture.is_text_selected,
            is_over_bubble,
            is_target_grouped_item: grouped_item_mid.is_some(),
            target,
            is_document_target: gesture.path.iter().any(|el| matches!(el, HitElement::Document | HitElement::Audio)),
            no_forwards: !is_sponsored && !permissions.can_forward(&message),
            is_touch,
            abilities: MessageAbilities::from_collaborators(&message, chat.as_ref(), permissions.as_ref(), &selection),
            message,
        };
        trace!("Resolved context menu target: peer {peer_id}, message {mid}");

        let actions = build_action_list(&context);

        let reactions = (context.message.kind == MessageKind::Regular).then(|| {
            let orientation = self.settings.platform.reaction_strip_orientation();
            let mut strip = ReactionsMenu::new(
                orientation,
                &self.settings,
                &self.collaborators,
                self.pool.clone(),
                self.scope.clone(),
            );
            strip.init(context.message.clone());
            strip
        });

        let viewers = actions.iter().any(|a| a.kind == ActionKind::Viewers).then(|| {
            ViewersButton::new(
                &context.message,
                self.collaborators.reactors.as_ref(),
                permissions.clone(),
                self.scope.token(),
            )
        });

        let padding = reactions.as_ref()
            .map(|r| reactions_padding(r.orientation()))
            .unwrap_or_default();
        let size = dvec2(
            self.settings.menu_width,
            actions.len() as f64 * self.settings.button_height + MENU_VERTICAL_PADDING,
        );
        let side = if is_incoming { BubbleSide::Left } else { BubbleSide::Right };
        let position = position_menu(gesture.position, size, window_size, side, padding);

        self.listeners.attach(Listeners::Click | Listeners::Dismiss);
        self.menu = Some(OpenMenu {
            context,
            actions,
            reactions,
            viewers,
            placement: MenuPlacement { position, size, padding },
            side,
        });
        self.state = MenuState::Open;
        trace!("Context menu placed at {position:?} (opened at {now:?})");
        Ok(())
    }

    /// Polls all pending asynchronous lookups of the open menu.
    pub fn process_pending_updates(&mut self) {
        if !self.is_open() {
            return;
        }
        let Some(menu) = self.menu.as_mut() else { return };
        if let Some(reactions) = menu.reactions.as_mut() {
            reactions.process_pending_updates();
        }
        if let Some(viewers) = menu.viewers.as_mut() {
            viewers.process_pending_updates();
        }
    }

    /// Runs once per frame: advances animations and completes a pending close.
    pub fn on_frame(&mut self, now: Instant) {
        if let MenuState::Closing { remove_at } = self.state
            && now >= remove_at
        {
            self.finish_close();
        }
        let events = self.pool.scheduler().tick();
        if let Some(reactions) = self.menu.as_mut().and_then(|m| m.reactions.as_mut()) {
            reactions.on_frame(&events);
        }
    }

    /// Activates the given action of the open menu, posts the resulting [`MessageAction`], and closes the menu.
    ///
    /// Returns the posted action. Actions that are not shown in the menu are ignored.
    pub fn activate(&mut self, kind: ActionKind, now: Instant) -> Option<MessageAction> {
        if !self.is_open() || !self.listeners.is_attached(Listeners::Click) {
            return None;
        }
        let menu = self.menu.as_ref()?;
        if !menu.actions.iter().any(|a| a.kind == kind) {
            warn!("Ignoring activation of hidden action {kind:?}");
            return None;
        }
        let cx = ActionContext {
            chat: self.collaborators.chat.as_ref(),
            permissions: self.collaborators.permissions.as_ref(),
            message_link_base: &self.settings.message_link_base,
            viewer_peer_id: menu.viewers.as_ref().and_then(ViewersButton::viewer_peer_id),
        };
        let action = resolve_action(kind, &menu.context, &cx);
        if let Some(action) = &action {
            debug!("Context menu action {kind:?} -> {action:?}");
            if let Err(e) = self.action_sender.send(action.clone()) {
                warn!("Failed to post message action {:?}: receiver is gone", e.into_inner());
            }
        }
        self.dismiss(now);
        action
    }

    /// Handles a click on the reaction strip at the given strip-local position.
    /// Sending a reaction closes the menu.
    pub fn on_reaction_click(&mut self, pos: DVec2, now: Instant) -> Option<String> {
        let reaction = self.reactions_menu_mut()?.on_click(pos)?;
        self.dismiss(now);
        Some(reaction)
    }

    /// Closes the open menu, e.g., on an outside click, the escape key, or after an action.
    pub fn dismiss(&mut self, now: Instant) {
        if !self.is_open() {
            return;
        }
        let removed = self.listeners.remove_all();
        if let Some(reactions) = self.menu.as_mut().and_then(|m| m.reactions.as_mut()) {
            reactions.cleanup();
        }
        self.scope.invalidate();
        let remove_at = now + Duration::from_millis(self.settings.close_delay_ms);
        self.state = MenuState::Closing { remove_at };
        debug!("Closing the message context menu (listeners removed: {removed:?})");
    }

    fn finish_close(&mut self) {
        self.menu = None;
        self.state = MenuState::Idle;
        trace!("Message context menu removed");
    }

    /// The peer and message the open menu targets.
    pub fn target(&self) -> Option<(PeerId, MessageId)> {
        self.menu.as_ref()
            .filter(|_| self.is_open())
            .map(|m| (m.context.peer_id, m.context.mid))
    }
}

impl std::fmt::Debug for MessageContextMenu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageContextMenu")
            .field("state", &self.state)
            .field("menu", &self.menu)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        collections::{BTreeMap, BTreeSet, HashMap},
        rc::Rc,
    };

    use crossbeam_channel::{Receiver, unbounded};

    use super::*;
    use crate::{
        collaborators::{
            AnimationInfo, AnimationRef, AnimationSource, ChatType, ChatView, EditKind, Message,
            MessageFlags, PeerPermissions, ReactionCatalog, ReactionDescriptor, ReactionSender,
            ReactorsList, ReactorsProvider, SelectionSnapshot,
        },
        home::reactions_menu::tests::descriptor,
        persistence::Platform,
        shared::lookup::{Lookup, LookupSender},
    };

    const PEER: PeerId = -100;
    const WINDOW: DVec2 = dvec2(1000.0, 800.0);

    #[derive(Default)]
    struct TestChat {
        messages: HashMap<MessageId, Message>,
        albums: Vec<Vec<MessageId>>,
        selection: SelectionSnapshot,
        reactions: Vec<ReactionDescriptor>,
        read_participants: bool,
        held_reactors: RefCell<Option<LookupSender<anyhow::Result<ReactorsList>>>>,
        sent_reactions: RefCell<Vec<String>>,
    }

    impl TestChat {
        fn with_messages(messages: Vec<Message>) -> Self {
            Self {
                messages: messages.into_iter().map(|m| (m.mid, m)).collect(),
                reactions: vec![descriptor("👍"), descriptor("❤️"), descriptor("🔥")],
                ..Default::default()
            }
        }
    }

    impl ChatView for TestChat {
        fn peer_id(&self) -> PeerId { PEER }
        fn chat_type(&self) -> ChatType { ChatType::Chat }
        fn message(&self, mid: MessageId) -> Option<Message> { self.messages.get(&mid).cloned() }
        fn mids_by_mid(&self, mid: MessageId) -> Vec<MessageId> {
            self.albums.iter().find(|a| a.contains(&mid)).cloned().unwrap_or_else(|| vec![mid])
        }
        fn selection(&self) -> SelectionSnapshot { self.selection.clone() }
        fn can_select(&self, mid: MessageId) -> bool { mid > 0 }
        fn can_send(&self) -> bool { true }
        fn has_message_input(&self) -> bool { true }
    }

    impl PeerPermissions for TestChat {
        fn can_forward(&self, _message: &Message) -> bool { true }
        fn can_edit(&self, message: &Message, kind: EditKind) -> bool { kind == EditKind::Text && message.is_out() }
        fn can_delete(&self, _message: &Message) -> bool { true }
        fn can_pin(&self, _peer_id: PeerId) -> bool { false }
        fn is_channel(&self, _peer_id: PeerId) -> bool { false }
        fn is_user(&self, _peer_id: PeerId) -> bool { false }
        fn can_view_read_participants(&self, message: &Message) -> bool { self.read_participants && message.is_out() }
        fn participants_count(&self, _peer_id: PeerId) -> Option<u32> { Some(10) }
        fn username(&self, _peer_id: PeerId) -> Option<String> { None }
        fn display_name(&self, peer_id: PeerId) -> String { format!("Peer {peer_id}") }
    }

    impl ReactionCatalog for TestChat {
        fn available_reactions(&self, _message: &Message) -> Lookup<anyhow::Result<Vec<ReactionDescriptor>>> {
            Lookup::ready(Ok(self.reactions.clone()))
        }
    }

    impl ReactionSender for TestChat {
        fn send_reaction(&self, _message: &Message, reaction: &str) {
            self.sent_reactions.borrow_mut().push(reaction.to_owned());
        }
    }

    impl ReactorsProvider for TestChat {
        fn reactions_and_read_participants(&self, _message: &Message) -> Lookup<anyhow::Result<ReactorsList>> {
            let (sender, lookup) = Lookup::pending();
            *self.held_reactors.borrow_mut() = Some(sender);
            lookup
        }
    }

    impl AnimationSource for TestChat {
        fn fetch(&self, _resource: &AnimationRef, _size: u32) -> Lookup<anyhow::Result<AnimationInfo>> {
            Lookup::ready(Ok(AnimationInfo { frame_count: 2 }))
        }
    }

    struct Fixture {
        menu: MessageContextMenu,
        chat: Rc<TestChat>,
        actions: Receiver<MessageAction>,
        scheduler: AnimationScheduler,
        now: Instant,
    }

    fn fixture_with(chat: TestChat, settings: MenuSettings) -> Fixture {
        let chat = Rc::new(chat);
        let collaborators = Collaborators {
            chat: chat.clone(),
            permissions: chat.clone(),
            reaction_catalog: chat.clone(),
            reaction_sender: chat.clone(),
            reactors: chat.clone(),
            animations: chat.clone(),
        };
        let scheduler = AnimationScheduler::new();
        let (sender, actions) = unbounded();
        let menu = MessageContextMenu::new(settings, collaborators, scheduler.clone(), sender);
        Fixture { menu, chat, actions, scheduler, now: Instant::now() }
    }

    fn fixture(chat: TestChat) -> Fixture {
        fixture_with(chat, MenuSettings::default())
    }

    fn bubble(mid: MessageId) -> HitElement {
        HitElement::Bubble { mid, is_date_separator: false, is_incoming: true }
    }

    fn right_click(path: Vec<HitElement>) -> Gesture {
        Gesture { kind: GestureKind::ContextMenu, position: dvec2(100.0, 100.0), path, is_text_selected: false }
    }

    fn on_content(mid: MessageId) -> Gesture {
        right_click(vec![HitElement::MessageText, HitElement::ContentWrapper, bubble(mid)])
    }

    fn action_kinds(f: &Fixture) -> Vec<ActionKind> {
        f.menu.menu().unwrap().actions.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn opening_on_a_regular_message() {
        let mut f = fixture(TestChat::with_messages(vec![Message::new(PEER, 5, "hello")]));
        f.menu.open(&on_content(5), WINDOW, f.now).unwrap();

        assert_eq!(f.menu.state(), MenuState::Open);
        assert_eq!(f.menu.target(), Some((PEER, 5)));
        assert_eq!(
            action_kinds(&f),
            [ActionKind::Reply, ActionKind::Copy, ActionKind::Forward, ActionKind::Select, ActionKind::Delete],
        );
        let open = f.menu.menu().unwrap();
        let strip = open.reactions.as_ref().unwrap();
        assert_eq!(strip.orientation(), Orientation::Vertical);
        assert!(strip.is_visible());
        assert_eq!(strip.items().len(), 3);
        assert_eq!(open.placement.size, dvec2(215.0, 5.0 * 35.0 + 16.0));
        assert_eq!(open.placement.padding, Padding { top: 24.0, left: 50.0, ..Default::default() });
        assert_eq!(open.placement.position, dvec2(100.0, 100.0));
        assert!(f.menu.listeners().is_attached(Listeners::Dismiss | Listeners::Click));
    }

    #[test]
    fn rejected_gestures() {
        let mut chat = TestChat::with_messages(vec![Message::new(PEER, 5, "hello")]);
        chat.selection.is_selecting = true;
        let mut f = fixture(chat);

        assert_eq!(f.menu.open(&right_click(vec![HitElement::Other]), WINDOW, f.now), Err(OpenMenuError::NoBubble));
        let separator = HitElement::Bubble { mid: 0, is_date_separator: true, is_incoming: true };
        assert_eq!(f.menu.open(&right_click(vec![separator]), WINDOW, f.now), Err(OpenMenuError::DateSeparator));
        assert_eq!(f.menu.open(&right_click(vec![bubble(0)]), WINDOW, f.now), Err(OpenMenuError::ZeroMessageId));
        assert_eq!(f.menu.open(&right_click(vec![bubble(9)]), WINDOW, f.now), Err(OpenMenuError::MessageNotFound(9)));
        assert_eq!(
            f.menu.open(&right_click(vec![bubble(-2)]), WINDOW, f.now),
            Err(OpenMenuError::SponsoredDuringSelection),
        );
        let tap = Gesture { kind: GestureKind::Tap, ..on_content(5) };
        assert_eq!(f.menu.open(&tap, WINDOW, f.now), Err(OpenMenuError::GestureIgnored));
        assert_eq!(f.menu.state(), MenuState::Idle);
    }

    #[test]
    fn reentrant_open_is_rejected() {
        let mut f = fixture(TestChat::with_messages(vec![Message::new(PEER, 5, "a"), Message::new(PEER, 6, "b")]));
        f.menu.open(&on_content(5), WINDOW, f.now).unwrap();
        assert_eq!(f.menu.open(&on_content(6), WINDOW, f.now), Err(OpenMenuError::AlreadyOpen));
        assert_eq!(f.menu.target(), Some((PEER, 5)));
    }

    #[test]
    fn touch_taps_open_only_on_message_chrome() {
        let settings = MenuSettings { platform: Platform { is_touch: true, is_apple: false }, ..Default::default() };
        let mut f = fixture_with(TestChat::with_messages(vec![Message::new(PEER, 5, "hello")]), settings);

        let on_link = Gesture {
            kind: GestureKind::Tap,
            ..right_click(vec![HitElement::Link { href: "https://a.b/".into(), text: "a.b".into() }, bubble(5)])
        };
        assert_eq!(f.menu.open(&on_link, WINDOW, f.now), Err(OpenMenuError::GestureIgnored));
        assert_eq!(f.menu.open(&on_content(5), WINDOW, f.now), Err(OpenMenuError::GestureIgnored));

        let tap = Gesture { kind: GestureKind::Tap, ..on_content(5) };
        f.menu.open(&tap, WINDOW, f.now).unwrap();
        let open = f.menu.menu().unwrap();
        assert_eq!(open.reactions.as_ref().unwrap().orientation(), Orientation::Horizontal);
        assert_eq!(open.placement.padding, Padding { top: 50.0, right: 36.0, left: 24.0, bottom: 0.0 });
    }

    #[test]
    fn sponsored_messages_have_no_reaction_strip() {
        let mut ad = Message::new(PEER, -2, "buy now");
        ad.kind = MessageKind::Sponsored;
        let mut f = fixture(TestChat::with_messages(vec![ad]));
        f.menu.open(&on_content(-2), WINDOW, f.now).unwrap();

        assert_eq!(action_kinds(&f), [ActionKind::SponsoredInfo]);
        assert!(f.menu.menu().unwrap().reactions.is_none());
        assert_eq!(f.menu.menu().unwrap().placement.padding, Padding::default());
    }

    #[test]
    fn service_messages_have_no_reaction_strip() {
        let mut service = Message::new(PEER, 3, "Alice joined the group");
        service.kind = MessageKind::Service;
        let mut f = fixture(TestChat::with_messages(vec![service]));
        f.menu.open(&on_content(3), WINDOW, f.now).unwrap();
        assert!(f.menu.menu().unwrap().reactions.is_none());
        assert!(!action_kinds(&f).contains(&ActionKind::Select));
    }

    fn album_chat(selected: &[MessageId]) -> TestChat {
        let mut chat = TestChat::with_messages(vec![
            Message::new(PEER, 5, "a"),
            Message::new(PEER, 6, "b"),
            Message::new(PEER, 7, "c"),
        ]);
        chat.albums.push(vec![5, 6, 7]);
        chat.selection = SelectionSnapshot {
            is_selecting: true,
            selected: BTreeMap::from([(PEER, selected.iter().copied().collect::<BTreeSet<_>>())]),
            delete_enabled: true,
            ..Default::default()
        };
        chat
    }

    #[test]
    fn album_in_bulk_selection_targets_the_selected_item() {
        let mut f = fixture(album_chat(&[6]));
        f.menu.open(&right_click(vec![HitElement::Time, bubble(7)]), WINDOW, f.now).unwrap();
        assert_eq!(f.menu.target(), Some((PEER, 6)));
        assert!(f.menu.menu().unwrap().context.is_selected);
        assert!(action_kinds(&f).contains(&ActionKind::DeleteSelection));
    }

    #[test]
    fn album_without_a_selected_item_keeps_the_clicked_message() {
        let mut f = fixture(album_chat(&[]));
        f.menu.open(&right_click(vec![HitElement::Time, bubble(7)]), WINDOW, f.now).unwrap();
        assert_eq!(f.menu.target(), Some((PEER, 7)));
    }

    #[test]
    fn grouped_item_becomes_the_target() {
        let mut chat = album_chat(&[]);
        chat.selection = SelectionSnapshot::default();
        let mut f = fixture(chat);
        let path = vec![HitElement::GroupedItem { mid: 6 }, HitElement::ContentWrapper, bubble(5)];
        f.menu.open(&right_click(path), WINDOW, f.now).unwrap();
        assert_eq!(f.menu.target(), Some((PEER, 6)));

        let action = f.menu.activate(ActionKind::Forward, f.now);
        assert_eq!(action, Some(MessageAction::Forward { peer_id: PEER, mids: vec![6] }));
        assert_eq!(f.actions.try_recv().ok(), action);
    }

    #[test]
    fn activation_posts_the_action_and_closes() {
        let mut f = fixture(TestChat::with_messages(vec![Message::new(PEER, 5, "hello")]));
        f.menu.open(&on_content(5), WINDOW, f.now).unwrap();

        assert_eq!(f.menu.activate(ActionKind::Pin, f.now), None, "hidden actions are ignored");
        assert!(f.menu.is_open());

        let action = f.menu.activate(ActionKind::Copy, f.now);
        assert_eq!(action, Some(MessageAction::CopyText("hello".into())));
        assert_eq!(f.actions.try_recv().ok(), action);
        assert!(matches!(f.menu.state(), MenuState::Closing { .. }));
        assert_eq!(f.menu.activate(ActionKind::Copy, f.now), None);
    }

    #[test]
    fn closing_tears_down_and_removes_after_the_delay() {
        let mut f = fixture(TestChat::with_messages(vec![Message::new(PEER, 5, "hello")]));
        f.menu.open(&on_content(5), WINDOW, f.now).unwrap();
        let group = f.menu.menu().unwrap().reactions.as_ref().unwrap().animation_group().clone();
        assert!(f.scheduler.is_group_registered(&group));

        f.menu.dismiss(f.now);
        assert!(!f.menu.listeners().is_attached(Listeners::Dismiss));
        assert!(!f.scheduler.is_group_registered(&group));
        assert_eq!(f.scheduler.player_count(), 0);
        assert!(f.menu.menu().is_some(), "the menu stays attached while closing");

        f.menu.on_frame(f.now + Duration::from_millis(299));
        assert!(matches!(f.menu.state(), MenuState::Closing { .. }));
        f.menu.on_frame(f.now + Duration::from_millis(300));
        assert_eq!(f.menu.state(), MenuState::Idle);
        assert!(f.menu.menu().is_none());
    }

    #[test]
    fn reopening_while_closing_completes_the_close() {
        let mut f = fixture(TestChat::with_messages(vec![Message::new(PEER, 5, "a"), Message::new(PEER, 6, "b")]));
        f.menu.open(&on_content(5), WINDOW, f.now).unwrap();
        f.menu.dismiss(f.now);
        f.menu.open(&on_content(6), WINDOW, f.now).unwrap();
        assert_eq!(f.menu.target(), Some((PEER, 6)));
        let strip = f.menu.menu().unwrap().reactions.as_ref().unwrap();
        assert!(strip.is_visible());
        assert_eq!(strip.items().len(), 3);
    }

    #[test]
    fn clicking_a_reaction_sends_it_and_closes() {
        let mut f = fixture(TestChat::with_messages(vec![Message::new(PEER, 5, "hello")]));
        f.menu.open(&on_content(5), WINDOW, f.now).unwrap();
        assert_eq!(f.menu.on_reaction_click(dvec2(10.0, 80.0), f.now).as_deref(), Some("🔥"));
        assert_eq!(f.chat.sent_reactions.borrow().as_slice(), ["🔥"]);
        assert!(!f.menu.is_open());
        assert_eq!(f.menu.on_reaction_click(dvec2(10.0, 80.0), f.now), None);
    }

    #[test]
    fn viewers_of_an_unread_own_message() {
        let mut own = Message::new(PEER, 5, "anyone?");
        own.flags = MessageFlags::Out;
        let mut chat = TestChat::with_messages(vec![own]);
        chat.read_participants = true;
        let mut f = fixture(chat);
        f.menu.open(&on_content(5), WINDOW, f.now).unwrap();

        assert!(action_kinds(&f).contains(&ActionKind::Viewers));
        let viewers = f.menu.menu().unwrap().viewers.as_ref().unwrap();
        assert_eq!(viewers.fake_text().unwrap().text, "Loading...");
        assert!(!viewers.is_main_label_visible());

        let sender = f.chat.held_reactors.borrow_mut().take().unwrap();
        sender.send(Ok(ReactorsList::default())).unwrap();
        f.menu.process_pending_updates();

        let viewers = f.menu.menu().unwrap().viewers.as_ref().unwrap();
        assert!(viewers.fake_text().is_none());
        assert!(viewers.is_main_label_visible());
        assert!(viewers.avatars().is_empty());
        assert_eq!(f.menu.activate(ActionKind::Viewers, f.now), None);
        assert!(!f.menu.is_open());
    }

    #[test]
    fn viewers_result_after_close_is_discarded() {
        let mut own = Message::new(PEER, 5, "anyone?");
        own.flags = MessageFlags::Out;
        let mut chat = TestChat::with_messages(vec![own]);
        chat.read_participants = true;
        let mut f = fixture(chat);
        f.menu.open(&on_content(5), WINDOW, f.now).unwrap();
        f.menu.dismiss(f.now);

        let sender = f.chat.held_reactors.borrow_mut().take().unwrap();
        let _ = sender.send(Ok(ReactorsList::default()));
        f.menu.process_pending_updates();
        let viewers = f.menu.menu().unwrap().viewers.as_ref().unwrap();
        assert_eq!(viewers.fake_text().unwrap().text, "Loading...");
        assert!(!viewers.is_main_label_visible());
    }

    #[test]
    fn menu_placement() {
        let size = dvec2(215.0, 191.0);
        let none = Padding::default();
        // Incoming bubbles open rightward, outgoing bubbles open leftward.
        assert_eq!(position_menu(dvec2(100.0, 100.0), size, WINDOW, BubbleSide::Left, none), dvec2(100.0, 100.0));
        assert_eq!(position_menu(dvec2(500.0, 100.0), size, WINDOW, BubbleSide::Right, none), dvec2(285.0, 100.0));
        // Overflowing menus flip to the other side of the pointer.
        assert_eq!(position_menu(dvec2(900.0, 700.0), size, WINDOW, BubbleSide::Left, none), dvec2(685.0, 509.0));
        assert_eq!(position_menu(dvec2(100.0, 100.0), size, WINDOW, BubbleSide::Right, none), dvec2(100.0, 100.0));
        // Padding keeps room for the reaction strip.
        let padding = reactions_padding(Orientation::Horizontal);
        assert_eq!(position_menu(dvec2(10.0, 10.0), size, WINDOW, BubbleSide::Left, padding), dvec2(24.0, 50.0));
    }
}
