//! The "who reacted / who viewed" button of the message context menu.
//!
//! The button's final label depends on an asynchronous lookup of the message's
//! reactors and read participants. Until that resolves, the main label is hidden
//! and a placeholder text is shown in its place.

use std::rc::Rc;

use tracing::{debug, warn};

use crate::{
    collaborators::{Message, PeerId, PeerPermissions, ReactorsList, ReactorsProvider},
    shared::{
        cancellation::CancellationToken,
        lookup::{Lookup, LookupPoll},
    },
};

/// How much room to leave for each avatar of the stacked-avatar cluster.
pub const PADDING_PER_AVATAR_REM: f64 = 0.875;
/// The right padding of the main label while read participants are loading.
const LOADING_PADDING_REM: f64 = 1.0;
/// At most this many avatars are stacked.
pub const MAX_AVATARS: usize = 3;

/// A text shown on top of the (hidden) main label.
#[derive(Clone, Debug, PartialEq)]
pub struct FakeText {
    pub text: String,
    pub padding_right_rem: Option<f64>,
}

impl FakeText {
    fn new(text: String) -> Self {
        Self { text, padding_right_rem: None }
    }
}

/// "3 Reacted" if everyone reacted, otherwise "2/3 Reacted".
pub fn reacted_label(reacted: usize, total: usize) -> String {
    if reacted == total {
        format!("{reacted} Reacted")
    } else {
        format!("{reacted}/{total} Reacted")
    }
}

pub struct ViewersButton {
    is_viewing_reactions: bool,
    recent_reactions: Vec<PeerId>,
    main_label: String,
    is_main_label_visible: bool,
    main_label_padding_rem: f64,
    fake_text: Option<FakeText>,
    avatars: Vec<PeerId>,
    viewer_peer_id: Option<PeerId>,
    lookup: Option<Lookup<anyhow::Result<ReactorsList>>>,
    token: CancellationToken,
    permissions: Rc<dyn PeerPermissions>,
}

impl ViewersButton {
    /// Creates the button in its loading state and starts looking up the message's viewers.
    pub fn new(
        message: &Message,
        reactors: &dyn ReactorsProvider,
        permissions: Rc<dyn PeerPermissions>,
        token: CancellationToken,
    ) -> Self {
        let recent_reactions = message.recent_reactions.clone();
        let is_viewing_reactions = !recent_reactions.is_empty();
        let participants_count = permissions.participants_count(message.peer_id).unwrap_or(0) as usize;

        let (main_label, fake_text, main_label_padding_rem) = if is_viewing_reactions {
            (
                reacted_label(participants_count, participants_count),
                reacted_label(recent_reactions.len(), participants_count),
                PADDING_PER_AVATAR_REM * recent_reactions.len() as f64,
            )
        } else {
            ("Nobody viewed".to_owned(), "Loading...".to_owned(), LOADING_PADDING_REM)
        };

        let mut button = Self {
            is_viewing_reactions,
            recent_reactions,
            main_label,
            is_main_label_visible: false,
            main_label_padding_rem,
            fake_text: Some(FakeText::new(fake_text)),
            avatars: Vec::new(),
            viewer_peer_id: None,
            lookup: Some(reactors.reactions_and_read_participants(message)),
            token,
            permissions,
        };
        button.process_pending_updates();
        button
    }

    /// Polls the viewers lookup. Returns `true` if the button changed.
    pub fn process_pending_updates(&mut self) -> bool {
        let Some(lookup) = self.lookup.as_mut() else { return false };
        if !self.token.is_valid() {
            debug!("Discarding the viewers lookup of a closed menu");
            self.lookup = None;
            return false;
        }
        let result = match lookup.poll() {
            LookupPoll::Pending => return false,
            LookupPoll::Ready(result) => result,
            LookupPoll::Closed => Err(anyhow::anyhow!("the reactors provider dropped the lookup")),
        };
        self.lookup = None;
        match result {
            Ok(list) => self.apply_result(list),
            Err(e) => {
                warn!("Failed to look up message viewers: {e}");
                self.fake_text = None;
                self.is_main_label_visible = true;
            }
        }
        true
    }

    fn apply_result(&mut self, list: ReactorsList) {
        self.fake_text = None;
        let entries = list.combined;
        let reacted = if self.is_viewing_reactions {
            entries.iter().filter(|e| e.reaction.is_some()).count()
        } else {
            entries.len()
        };

        let text = if let [single] = entries.as_slice() {
            self.viewer_peer_id = Some(single.peer_id);
            Some(self.permissions.display_name(single.peer_id))
        } else if self.is_viewing_reactions {
            Some(reacted_label(reacted, entries.len()))
        } else if entries.is_empty() {
            self.is_main_label_visible = true;
            None
        } else {
            Some(format!("Seen by {}", entries.len()))
        };
        self.fake_text = text.map(|text| FakeText {
            text,
            padding_right_rem: Some(PADDING_PER_AVATAR_REM * reacted as f64),
        });

        if !entries.is_empty() {
            let peers = if self.is_viewing_reactions {
                self.recent_reactions.clone()
            } else {
                entries.iter().map(|e| e.peer_id).collect()
            };
            self.avatars = peers.into_iter().take(MAX_AVATARS).collect();
        }
        debug!("Viewers resolved: {} entries, {reacted} counted", entries.len());
    }

    pub fn icon(&self) -> &'static str {
        if self.is_viewing_reactions { "reactions" } else { "checks" }
    }

    pub fn is_viewing_reactions(&self) -> bool { self.is_viewing_reactions }
    pub fn main_label(&self) -> &str { &self.main_label }
    pub fn is_main_label_visible(&self) -> bool { self.is_main_label_visible }
    pub fn main_label_padding_rem(&self) -> f64 { self.main_label_padding_rem }
    pub fn fake_text(&self) -> Option<&FakeText> { self.fake_text.as_ref() }
    pub fn avatars(&self) -> &[PeerId] { &self.avatars }
    /// The only viewer or reactor, if exactly one was found.
    pub fn viewer_peer_id(&self) -> Option<PeerId> { self.viewer_peer_id }
    pub fn is_loading(&self) -> bool { self.lookup.is_some() }
}

impl std::fmt::Debug for ViewersButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewersButton")
            .field("main_label", &self.main_label)
            .field("is_main_label_visible", &self.is_main_label_visible)
            .field("fake_text", &self.fake_text)
            .field("avatars", &self.avatars)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::{
        collaborators::{EditKind, ReactorEntry},
        shared::{cancellation::CancellationScope, lookup::LookupSender},
    };

    struct Group {
        participants: u32,
    }

    impl PeerPermissions for Group {
        fn can_forward(&self, _message: &Message) -> bool { true }
        fn can_edit(&self, _message: &Message, _kind: EditKind) -> bool { false }
        fn can_delete(&self, _message: &Message) -> bool { false }
        fn can_pin(&self, _peer_id: PeerId) -> bool { false }
        fn is_channel(&self, _peer_id: PeerId) -> bool { false }
        fn is_user(&self, _peer_id: PeerId) -> bool { false }
        fn can_view_read_participants(&self, _message: &Message) -> bool { true }
        fn participants_count(&self, _peer_id: PeerId) -> Option<u32> { Some(self.participants) }
        fn username(&self, _peer_id: PeerId) -> Option<String> { None }
        fn display_name(&self, peer_id: PeerId) -> String { format!("User {peer_id}") }
    }

    #[derive(Default)]
    struct HeldReactors {
        sender: RefCell<Option<LookupSender<anyhow::Result<ReactorsList>>>>,
    }

    impl ReactorsProvider for HeldReactors {
        fn reactions_and_read_participants(&self, _message: &Message) -> Lookup<anyhow::Result<ReactorsList>> {
            let (sender, lookup) = Lookup::pending();
            *self.sender.borrow_mut() = Some(sender);
            lookup
        }
    }

    impl HeldReactors {
        fn resolve(&self, entries: Vec<ReactorEntry>) {
            let sender = self.sender.borrow_mut().take().unwrap();
            sender.send(Ok(ReactorsList { combined: entries })).unwrap();
        }
    }

    fn viewer(peer_id: PeerId) -> ReactorEntry {
        ReactorEntry { peer_id, reaction: None }
    }

    fn reactor(peer_id: PeerId) -> ReactorEntry {
        ReactorEntry { peer_id, reaction: Some("👍".into()) }
    }

    fn button(message: &Message, reactors: &HeldReactors, scope: &CancellationScope) -> ViewersButton {
        ViewersButton::new(message, reactors, Rc::new(Group { participants: 4 }), scope.token())
    }

    #[test]
    fn unread_outgoing_message_restores_the_main_label() {
        let scope = CancellationScope::new();
        let reactors = HeldReactors::default();
        let mut b = button(&Message::new(-100, 5, "hi"), &reactors, &scope);

        assert_eq!(b.icon(), "checks");
        assert!(b.is_loading());
        assert!(!b.is_main_label_visible());
        assert_eq!(b.fake_text().map(|t| t.text.as_str()), Some("Loading..."));
        assert_eq!(b.main_label_padding_rem(), 1.0);

        reactors.resolve(Vec::new());
        assert!(b.process_pending_updates());
        assert!(b.is_main_label_visible());
        assert_eq!(b.main_label(), "Nobody viewed");
        assert!(b.fake_text().is_none());
        assert!(b.avatars().is_empty());
        assert_eq!(b.viewer_peer_id(), None);
    }

    #[test]
    fn single_viewer_shows_their_name() {
        let scope = CancellationScope::new();
        let reactors = HeldReactors::default();
        let mut b = button(&Message::new(-100, 5, "hi"), &reactors, &scope);
        reactors.resolve(vec![viewer(7)]);
        b.process_pending_updates();

        let text = b.fake_text().unwrap();
        assert_eq!(text.text, "User 7");
        assert_eq!(text.padding_right_rem, Some(0.875));
        assert_eq!(b.viewer_peer_id(), Some(7));
        assert_eq!(b.avatars(), [7]);
        assert!(!b.is_main_label_visible());
    }

    #[test]
    fn many_viewers_are_counted() {
        let scope = CancellationScope::new();
        let reactors = HeldReactors::default();
        let mut b = button(&Message::new(-100, 5, "hi"), &reactors, &scope);
        reactors.resolve(vec![viewer(1), viewer(2), viewer(3), viewer(4)]);
        b.process_pending_updates();

        assert_eq!(b.fake_text().unwrap().text, "Seen by 4");
        assert_eq!(b.avatars(), [1, 2, 3]);
        assert_eq!(b.viewer_peer_id(), None);
    }

    #[test]
    fn reactions_show_reacted_counts() {
        let scope = CancellationScope::new();
        let reactors = HeldReactors::default();
        let mut message = Message::new(-100, 5, "hi");
        message.recent_reactions = vec![3, 1];
        let mut b = button(&message, &reactors, &scope);

        assert_eq!(b.icon(), "reactions");
        assert_eq!(b.main_label(), "4 Reacted");
        assert_eq!(b.fake_text().unwrap().text, "2/4 Reacted");
        assert_eq!(b.main_label_padding_rem(), 1.75);

        reactors.resolve(vec![reactor(3), reactor(1), viewer(2)]);
        b.process_pending_updates();
        let text = b.fake_text().unwrap();
        assert_eq!(text.text, "2/3 Reacted");
        assert_eq!(text.padding_right_rem, Some(1.75));
        assert_eq!(b.avatars(), [3, 1]);
    }

    #[test]
    fn result_after_close_is_discarded() {
        let scope = CancellationScope::new();
        let reactors = HeldReactors::default();
        let mut b = button(&Message::new(-100, 5, "hi"), &reactors, &scope);
        scope.invalidate();
        let _ = reactors.sender.borrow_mut().take().unwrap().send(Ok(ReactorsList { combined: vec![viewer(7)] }));

        assert!(!b.process_pending_updates());
        assert_eq!(b.fake_text().map(|t| t.text.as_str()), Some("Loading..."));
        assert_eq!(b.viewer_peer_id(), None);
        assert!(b.avatars().is_empty());
    }
}
