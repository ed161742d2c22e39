//! The state of a single reaction within a reaction strip.
//!
//! An animated reaction first plays its "appear" animation.
//! Once that has played through and the "select" animation is ready,
//! the select animation is shown in its place, and may be replayed by hovering over it.
//! Which of the two is visible is derived from the item's [`ReactionPhase`],
//! so they can never both be visible at once.

use tracing::trace;

use crate::{
    animation::{AnimationHandle, AnimationPool, FrameEvent, LoadOptions, LoadResult, PendingAnimation},
    collaborators::{AnimationRef, ReactionDescriptor},
    shared::{
        geometry::Orientation,
        visibility::{VisibleRect, edge_scale},
    },
};

pub const REACTION_SIZE: f64 = 28.0;
pub const PADDING: f64 = 4.0;
/// The full length allotted to one reaction along the strip's scroll axis.
pub const REACTION_CONTAINER_SIZE: f64 = REACTION_SIZE + PADDING * 2.0;

/// The index of a reaction item within its strip, assigned in render order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReactionItemId(pub(crate) usize);

impl ReactionItemId {
    pub fn index(&self) -> usize { self.0 }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReactionPhase {
    /// The appear animation is shown (playing, or resting at its first frame).
    #[default]
    Appearing,
    /// The select animation is shown and paused.
    SelectedIdle,
    /// The select animation is shown and playing.
    SelectedActive,
}

/// What happened to an item during a visibility update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CullOutcome {
    Unchanged,
    /// The item left the viewport and was returned to its resting state.
    Reset,
    /// The item is clipped by the viewport edge and was shrunk by this factor.
    Scaled(f64),
    /// The item is fully visible and unscaled.
    Cleared,
}

#[derive(Debug)]
enum SelectLoad {
    Pending(PendingAnimation),
    Loaded(AnimationHandle),
    Failed,
}

#[derive(Debug)]
pub struct ReactionItemState {
    reaction: String,
    /// Drawn in place of the appear animation when animations are disabled.
    static_icon: AnimationRef,
    pending_appear: Option<PendingAnimation>,
    appear_player: Option<AnimationHandle>,
    select_load: Option<SelectLoad>,
    /// Captured once, on the first appear-to-select transition.
    select_player: Option<AnimationHandle>,
    is_first_select_reveal: bool,
    /// The appear animation finished before the select animation was ready.
    awaiting_select: bool,
    phase: ReactionPhase,
    scale: Option<f64>,
}

impl ReactionItemState {
    /// Creates an item and starts loading its animations.
    ///
    /// If `animated` is false, only the static icon is shown and no players are ever created.
    pub fn new(
        descriptor: &ReactionDescriptor,
        pool: &AnimationPool,
        options: &LoadOptions,
        animated: bool,
    ) -> Self {
        let (pending_appear, select_load) = if animated {
            let appear = pool.load(
                &descriptor.appear_animation,
                LoadOptions { autoplay: true, ..options.clone() },
            );
            let select = pool.load(
                &descriptor.select_animation,
                LoadOptions { autoplay: false, ..options.clone() },
            );
            (Some(appear), Some(SelectLoad::Pending(select)))
        } else {
            (None, None)
        };
        Self {
            reaction: descriptor.reaction.clone(),
            static_icon: descriptor.static_icon.clone(),
            pending_appear,
            appear_player: None,
            select_load,
            select_player: None,
            is_first_select_reveal: true,
            awaiting_select: false,
            phase: ReactionPhase::Appearing,
            scale: None,
        }
    }

    pub fn reaction(&self) -> &str { &self.reaction }
    pub fn static_icon(&self) -> &AnimationRef { &self.static_icon }
    pub fn phase(&self) -> ReactionPhase { self.phase }
    pub fn appear_player(&self) -> Option<&AnimationHandle> { self.appear_player.as_ref() }
    pub fn select_player(&self) -> Option<&AnimationHandle> { self.select_player.as_ref() }
    /// The uniform shrink factor applied to the item, or `None` for no transform.
    pub fn scale(&self) -> Option<f64> { self.scale }

    /// Whether this item has a separate select container (i.e., animations are enabled).
    pub fn has_select_container(&self) -> bool {
        self.select_load.is_some()
    }

    pub fn is_appear_visible(&self) -> bool {
        self.phase == ReactionPhase::Appearing
    }

    pub fn is_select_visible(&self) -> bool {
        self.has_select_container() && self.phase != ReactionPhase::Appearing
    }

    /// Polls in-flight animation loads. Returns `true` if the appear player was just mounted.
    pub fn poll_loads(&mut self) -> bool {
        let mut appear_mounted = false;
        if let Some(pending) = self.pending_appear.as_mut()
            && let Some(result) = pending.poll()
        {
            self.pending_appear = None;
            if let LoadResult::Loaded(handle) = result {
                self.appear_player = Some(handle);
                appear_mounted = true;
            }
        }
        if let Some(SelectLoad::Pending(pending)) = self.select_load.as_mut()
            && let Some(result) = pending.poll()
        {
            self.select_load = Some(match result {
                LoadResult::Loaded(handle) => SelectLoad::Loaded(handle),
                LoadResult::Inert => SelectLoad::Failed,
            });
            if self.awaiting_select {
                self.awaiting_select = false;
                self.reveal_select();
            }
        }
        appear_mounted
    }

    /// Reacts to a frame rendered by one of this item's players.
    /// Returns `true` if the event belonged to this item.
    pub fn handle_frame_event(&mut self, event: &FrameEvent) -> bool {
        if self.appear_player.as_ref().is_some_and(|p| p.id() == event.player) {
            if event.is_last_frame() {
                match self.select_load {
                    Some(SelectLoad::Loaded(_)) => self.reveal_select(),
                    Some(SelectLoad::Pending(_)) => self.awaiting_select = true,
                    Some(SelectLoad::Failed) | None => {}
                }
            }
            return true;
        }
        if self.select_player.as_ref().is_some_and(|p| p.id() == event.player) {
            if event.is_last_frame() && self.phase == ReactionPhase::SelectedActive {
                self.phase = ReactionPhase::SelectedIdle;
            }
            return true;
        }
        false
    }

    fn reveal_select(&mut self) {
        let Some(SelectLoad::Loaded(select)) = &self.select_load else { return };
        if self.is_first_select_reveal {
            self.select_player = Some(select.clone());
            self.is_first_select_reveal = false;
        }
        trace!("Reaction {} now shows its select animation", self.reaction);
        self.phase = ReactionPhase::SelectedIdle;
    }

    /// Replays the select animation, unless the item is still appearing
    /// or the select animation is already playing.
    /// Returns `true` if playback was restarted.
    pub fn on_hover(&mut self) -> bool {
        if self.phase == ReactionPhase::Appearing {
            return false;
        }
        if !self.appear_player.as_ref().is_some_and(AnimationHandle::is_paused) {
            return false;
        }
        let Some(select) = self.select_player.as_ref() else { return false };
        if !select.is_paused() {
            return false;
        }
        select.set_autoplay(true);
        select.restart();
        self.phase = ReactionPhase::SelectedActive;
        true
    }

    /// Updates the item for its current visibility within the strip's viewport.
    pub fn cull(&mut self, visible: Option<&VisibleRect>, orientation: Orientation) -> CullOutcome {
        let Some(visible) = visible else {
            let Some(appear) = self.appear_player.as_ref() else { return CullOutcome::Unchanged };
            if self.phase == ReactionPhase::Appearing {
                return CullOutcome::Unchanged;
            }
            if let Some(select) = self.select_player.as_ref() {
                select.stop();
            }
            appear.stop();
            appear.set_autoplay(true);
            self.phase = ReactionPhase::Appearing;
            self.awaiting_select = false;
            self.scale = None;
            trace!("Reaction {} left the viewport and was reset", self.reaction);
            return CullOutcome::Reset;
        };

        // An item that was reset while off-screen plays its appear animation again on re-entry.
        if self.phase == ReactionPhase::Appearing
            && let Some(appear) = self.appear_player.as_ref()
            && appear.is_paused()
            && appear.autoplay()
            && appear.current_frame() == 0
        {
            appear.play();
        }

        if visible.is_clipped_along(orientation) {
            let scale = edge_scale(visible.rect.extent(orientation), REACTION_CONTAINER_SIZE);
            self.scale = Some(scale);
            CullOutcome::Scaled(scale)
        } else {
            self.scale = None;
            CullOutcome::Cleared
        }
    }

    /// Stops both players. Used when the whole strip is torn down.
    pub(crate) fn stop_players(&self) {
        if let Some(appear) = self.appear_player.as_ref() {
            appear.stop();
        }
        if let Some(SelectLoad::Loaded(select)) = self.select_load.as_ref() {
            select.stop();
        }
    }
}
