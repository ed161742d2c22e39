//! A scrollable strip of animated reactions, shown as part of a message's context menu.
//!
//! The strip is a headless model: it owns one [`ReactionItemState`] per reaction,
//! lays them out contiguously along its scroll axis, and keeps each item's
//! animation phase and edge-shrink scale in sync with scrolling and hovering.
//!
//! All asynchronous work (the catalog lookup and animation loads) is bound to
//! the strip's cancellation scope. After [`ReactionsMenu::cleanup()`],
//! late results are discarded without touching the strip.

use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::{
    animation::{AnimationGroupId, AnimationPool, FrameEvent, LoadOptions},
    collaborators::{Collaborators, Message, ReactionCatalog, ReactionDescriptor, ReactionSender},
    persistence::MenuSettings,
    shared::{
        cancellation::{CancellationScope, CancellationToken},
        geometry::{DVec2, Orientation, Rect},
        listeners::{ListenerSet, Listeners},
        lookup::{Lookup, LookupPoll},
        visibility::compute_visibility,
    },
    utils::current_timestamp_millis,
};
use super::reaction_item::{
    CullOutcome, REACTION_CONTAINER_SIZE, REACTION_SIZE, ReactionItemId, ReactionItemState,
};

/// The prefix of every strip's animation group ID.
pub const REACTIONS_ANIMATION_GROUP_PREFIX: &str = "CHAT-MENU-REACTIONS";

/// Reactions are loaded larger on hover-capable devices so that they stay sharp when scaled up.
const HOVER_SCALE: f64 = 1.25;

type CatalogLookup = Lookup<anyhow::Result<Vec<ReactionDescriptor>>>;

pub struct ReactionsMenu {
    orientation: Orientation,
    animations_enabled: bool,
    is_touch: bool,
    viewport_extent: f64,
    catalog: Rc<dyn ReactionCatalog>,
    sender: Rc<dyn ReactionSender>,
    pool: AnimationPool,
    animation_group: AnimationGroupId,
    scope: CancellationScope,
    token: Option<CancellationToken>,
    message: Option<Message>,
    catalog_lookup: Option<CatalogLookup>,
    /// Indexed by [`ReactionItemId`], in render order.
    items: Vec<ReactionItemState>,
    scroll_offset: f64,
    listeners: ListenerSet,
    is_visible: bool,
    /// The strip will be revealed on the next frame.
    reveal_pending: bool,
}

impl ReactionsMenu {
    /// Creates an empty strip.
    ///
    /// The strip's animation group is exempted from idle suspension right away,
    /// and stays exempt until [`Self::cleanup()`].
    pub fn new(
        orientation: Orientation,
        settings: &MenuSettings,
        collaborators: &Collaborators,
        pool: AnimationPool,
        scope: CancellationScope,
    ) -> Self {
        let animation_group = AnimationGroupId::with_timestamp(
            REACTIONS_ANIMATION_GROUP_PREFIX,
            current_timestamp_millis(),
        );
        pool.scheduler().register_group(&animation_group);

        let mut listeners = ListenerSet::default();
        listeners.attach(Listeners::Scroll | Listeners::Click);
        if !settings.platform.is_touch {
            listeners.attach(Listeners::PointerMove);
        }

        Self {
            orientation,
            animations_enabled: settings.animations_enabled,
            is_touch: settings.platform.is_touch,
            viewport_extent: settings.reactions_viewport_extent,
            catalog: collaborators.reaction_catalog.clone(),
            sender: collaborators.reaction_sender.clone(),
            pool,
            animation_group,
            scope,
            token: None,
            message: None,
            catalog_lookup: None,
            items: Vec::new(),
            scroll_offset: 0.0,
            listeners,
            is_visible: false,
            reveal_pending: false,
        }
    }

    /// Sets the strip's target message and starts looking up its available reactions.
    ///
    /// If the catalog answers synchronously, the reactions are rendered
    /// and the strip is revealed before this returns.
    pub fn init(&mut self, message: Message) {
        let token = self.scope.token();
        let lookup = self.catalog.available_reactions(&message);
        trace!("Looking up reactions for message {} (ready: {})", message.mid, lookup.was_ready());
        self.message = Some(message);
        self.token = Some(token);
        self.catalog_lookup = Some(lookup);
        self.process_pending_updates();
    }

    fn is_token_valid(&self) -> bool {
        self.token.as_ref().is_some_and(CancellationToken::is_valid)
    }

    /// Polls the catalog lookup and all in-flight animation loads.
    pub fn process_pending_updates(&mut self) {
        if let Some(lookup) = self.catalog_lookup.as_mut() {
            if !self.token.as_ref().is_some_and(CancellationToken::is_valid) {
                debug!("Discarding the reaction lookup of a closed menu");
                self.catalog_lookup = None;
                return;
            }
            match lookup.poll() {
                LookupPoll::Pending => {}
                LookupPoll::Ready(Ok(reactions)) => {
                    let was_ready = lookup.was_ready();
                    self.catalog_lookup = None;
                    self.render_reactions(reactions, was_ready);
                }
                LookupPoll::Ready(Err(e)) => {
                    warn!("Failed to look up available reactions: {e}");
                    self.catalog_lookup = None;
                }
                LookupPoll::Closed => {
                    warn!("The reaction catalog dropped its lookup");
                    self.catalog_lookup = None;
                }
            }
        }

        let viewport = self.viewport();
        for (index, item) in self.items.iter_mut().enumerate() {
            if item.poll_loads() {
                let rect = item_rect(index, self.orientation, self.scroll_offset);
                item.cull(compute_visibility(&rect, &viewport).as_ref(), self.orientation);
            }
        }
    }

    fn render_reactions(&mut self, reactions: Vec<ReactionDescriptor>, was_ready: bool) {
        if reactions.is_empty() {
            debug!("No reactions available for this message");
            return;
        }
        let Some(token) = self.token.clone() else { return };
        let hover_scale = if self.is_touch { 1.0 } else { HOVER_SCALE };
        let options = LoadOptions {
            size: (REACTION_SIZE * hover_scale).round() as u32,
            group: self.animation_group.clone(),
            token,
            autoplay: true,
        };
        self.items = reactions.iter()
            .map(|r| ReactionItemState::new(r, &self.pool, &options, self.animations_enabled))
            .collect();
        debug!("Rendered {} reactions", self.items.len());

        if was_ready {
            self.is_visible = true;
        } else {
            self.reveal_pending = true;
        }
    }

    /// Runs once per frame: applies a deferred reveal and routes rendered animation frames to their items.
    pub fn on_frame(&mut self, events: &[FrameEvent]) {
        if self.reveal_pending {
            self.reveal_pending = false;
            if self.is_token_valid() && !self.items.is_empty() {
                self.is_visible = true;
            }
        }
        for event in events {
            for item in &mut self.items {
                if item.handle_frame_event(event) {
                    break;
                }
            }
        }
    }

    /// Scrolls the strip to the given offset along its axis and updates every item's visibility.
    pub fn on_scroll(&mut self, offset: f64) {
        if !self.listeners.is_attached(Listeners::Scroll) {
            return;
        }
        self.scroll_offset = offset.clamp(0.0, self.max_scroll_offset());
        self.update_visibility();
    }

    /// Recomputes each item's visibility. Returns what happened to each item.
    pub fn update_visibility(&mut self) -> Vec<CullOutcome> {
        let viewport = self.viewport();
        self.items.iter_mut()
            .enumerate()
            .map(|(index, item)| {
                let rect = item_rect(index, self.orientation, self.scroll_offset);
                item.cull(compute_visibility(&rect, &viewport).as_ref(), self.orientation)
            })
            .collect()
    }

    /// Handles the pointer hovering at the given strip-local position.
    pub fn on_pointer_move(&mut self, pos: DVec2) -> bool {
        if !self.listeners.is_attached(Listeners::PointerMove) {
            return false;
        }
        match self.item_at(pos) {
            Some(id) => self.items[id.0].on_hover(),
            None => false,
        }
    }

    /// Handles a click at the given strip-local position.
    ///
    /// Returns the reaction that was sent, if any.
    pub fn on_click(&mut self, pos: DVec2) -> Option<String> {
        if !self.listeners.is_attached(Listeners::Click) {
            return None;
        }
        let id = self.item_at(pos)?;
        let message = self.message.as_ref()?;
        let reaction = self.items[id.0].reaction().to_owned();
        debug!("Sending reaction {reaction} to message {}", message.mid);
        self.sender.send_reaction(message, &reaction);
        Some(reaction)
    }

    /// Returns the item under the given strip-local position.
    pub fn item_at(&self, pos: DVec2) -> Option<ReactionItemId> {
        let (along, across) = match self.orientation {
            Orientation::Horizontal => (pos.x, pos.y),
            Orientation::Vertical => (pos.y, pos.x),
        };
        if along < 0.0 || along >= self.viewport_extent || !(0.0..REACTION_CONTAINER_SIZE).contains(&across) {
            return None;
        }
        let index = ((along + self.scroll_offset) / REACTION_CONTAINER_SIZE).floor() as usize;
        (index < self.items.len()).then_some(ReactionItemId(index))
    }

    /// Tears the strip down. Any late lookup or load result is discarded from now on.
    pub fn cleanup(&mut self) {
        self.scope.invalidate();
        let removed = self.listeners.remove_all();
        self.scroll_offset = 0.0;
        for item in &self.items {
            item.stop_players();
        }
        self.items.clear();
        self.catalog_lookup = None;
        self.reveal_pending = false;
        self.message = None;
        let scheduler = self.pool.scheduler();
        scheduler.unregister_group(&self.animation_group);
        let released = scheduler.release_group(&self.animation_group);
        debug!("Cleaned up reaction strip {} (listeners: {removed:?}, players released: {released})", self.animation_group);
    }

    fn viewport(&self) -> Rect {
        match self.orientation {
            Orientation::Horizontal => Rect::new(0.0, 0.0, self.viewport_extent, REACTION_CONTAINER_SIZE),
            Orientation::Vertical => Rect::new(0.0, 0.0, REACTION_CONTAINER_SIZE, self.viewport_extent),
        }
    }

    fn max_scroll_offset(&self) -> f64 {
        (self.items.len() as f64 * REACTION_CONTAINER_SIZE - self.viewport_extent).max(0.0)
    }

    pub fn orientation(&self) -> Orientation { self.orientation }
    pub fn animation_group(&self) -> &AnimationGroupId { &self.animation_group }
    pub fn is_visible(&self) -> bool { self.is_visible }
    pub fn is_reveal_pending(&self) -> bool { self.reveal_pending }
    pub fn scroll_offset(&self) -> f64 { self.scroll_offset }
    pub fn listeners(&self) -> &ListenerSet { &self.listeners }
    pub fn target_message(&self) -> Option<&Message> { self.message.as_ref() }
    pub fn items(&self) -> &[ReactionItemState] { &self.items }

    pub fn item(&self, id: ReactionItemId) -> Option<&ReactionItemState> {
        self.items.get(id.0)
    }

    /// The item's rectangle in strip-local coordinates, accounting for the scroll offset.
    pub fn item_rect(&self, id: ReactionItemId) -> Rect {
        item_rect(id.0, self.orientation, self.scroll_offset)
    }
}

fn item_rect(index: usize, orientation: Orientation, scroll_offset: f64) -> Rect {
    let along = index as f64 * REACTION_CONTAINER_SIZE - scroll_offset;
    match orientation {
        Orientation::Horizontal => Rect::new(along, 0.0, REACTION_CONTAINER_SIZE, REACTION_CONTAINER_SIZE),
        Orientation::Vertical => Rect::new(0.0, along, REACTION_CONTAINER_SIZE, REACTION_CONTAINER_SIZE),
    }
}

impl std::fmt::Debug for ReactionsMenu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionsMenu")
            .field("orientation", &self.orientation)
            .field("animation_group", &self.animation_group)
            .field("items", &self.items.len())
            .field("is_visible", &self.is_visible)
            .finish()
    }
}
