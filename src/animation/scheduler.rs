//! Drives all animation players on the UI thread.
//!
//! Players are grouped by an [`AnimationGroupId`].
//! When the app is idle (e.g., backgrounded), players are suspended
//! unless their group has been registered as exempt from idle suspension.
//!
//! The scheduler is injected into whoever creates players;
//! cloning an [`AnimationScheduler`] yields another handle to the same state.

use std::{
    cell::RefCell,
    collections::BTreeSet,
    fmt,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::player::{AnimationPlayer, PlayerId};

/// Distinguishes groups created within the same millisecond.
static NEXT_GROUP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A scheduling tag shared by a set of players.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationGroupId(String);

impl AnimationGroupId {
    /// Builds a group ID that is unique per instance, from a prefix, a creation timestamp,
    /// and a process-wide sequence number.
    pub fn with_timestamp(prefix: &str, timestamp_millis: i64) -> Self {
        let sequence = NEXT_GROUP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{prefix}-{timestamp_millis}-{sequence}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AnimationGroupId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for AnimationGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Emitted for every frame rendered by a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameEvent {
    pub player: PlayerId,
    pub frame: u32,
    pub max_frame: u32,
}

impl FrameEvent {
    pub fn is_last_frame(&self) -> bool {
        self.frame == self.max_frame
    }
}

#[derive(Default)]
struct SchedulerState {
    next_player_id: u64,
    players: IndexMap<PlayerId, AnimationPlayer>,
    idle_overrides: BTreeSet<AnimationGroupId>,
    is_idle: bool,
}

#[derive(Clone, Default)]
pub struct AnimationScheduler {
    state: Rc<RefCell<SchedulerState>>,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exempts the given group from idle suspension until it is unregistered.
    pub fn register_group(&self, group: &AnimationGroupId) {
        debug!("Exempting animation group {group} from idle suspension");
        self.state.borrow_mut().idle_overrides.insert(group.clone());
    }

    /// Lifts the idle exemption of the given group.
    ///
    /// If the app is currently idle, the group's players are paused right away.
    pub fn unregister_group(&self, group: &AnimationGroupId) {
        let mut state = self.state.borrow_mut();
        state.idle_overrides.remove(group);
        if state.is_idle {
            state.players.values_mut()
                .filter(|p| p.group() == group)
                .for_each(AnimationPlayer::pause);
        }
        debug!("Lifted idle exemption of animation group {group}");
    }

    pub fn is_group_registered(&self, group: &AnimationGroupId) -> bool {
        self.state.borrow().idle_overrides.contains(group)
    }

    /// Evicts all players of the given group. Returns the number of evicted players.
    pub fn release_group(&self, group: &AnimationGroupId) -> usize {
        let mut state = self.state.borrow_mut();
        let before = state.players.len();
        state.players.retain(|_, p| p.group() != group);
        let released = before - state.players.len();
        if released > 0 {
            debug!("Released {released} players of animation group {group}");
        }
        released
    }

    /// Sets whether the app is idle (backgrounded). While idle, only exempt groups animate.
    pub fn set_idle(&self, is_idle: bool) {
        self.state.borrow_mut().is_idle = is_idle;
    }

    pub fn is_group_suspended(&self, group: &AnimationGroupId) -> bool {
        let state = self.state.borrow();
        state.is_idle && !state.idle_overrides.contains(group)
    }

    pub fn player_count(&self) -> usize {
        self.state.borrow().players.len()
    }

    pub(crate) fn insert_player(&self, group: AnimationGroupId, frame_count: u32, autoplay: bool) -> AnimationHandle {
        let mut state = self.state.borrow_mut();
        let id = PlayerId(state.next_player_id);
        state.next_player_id += 1;
        state.players.insert(id, AnimationPlayer::new(id, group, frame_count, autoplay));
        AnimationHandle { id, scheduler: self.clone() }
    }

    /// Renders one frame of every playing, non-suspended player.
    pub fn tick(&self) -> Vec<FrameEvent> {
        let mut state = self.state.borrow_mut();
        let SchedulerState { players, idle_overrides, is_idle, .. } = &mut *state;
        let mut events = Vec::new();
        for player in players.values_mut() {
            if *is_idle && !idle_overrides.contains(player.group()) {
                continue;
            }
            if let Some(frame) = player.advance() {
                events.push(FrameEvent { player: player.id(), frame, max_frame: player.max_frame() });
            }
        }
        if !events.is_empty() {
            trace!("Animation tick rendered {} frames", events.len());
        }
        events
    }

    fn with_player<R>(&self, id: PlayerId, f: impl FnOnce(&mut AnimationPlayer) -> R) -> Option<R> {
        self.state.borrow_mut().players.get_mut(&id).map(f)
    }
}

impl fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("AnimationScheduler")
            .field("players", &state.players.len())
            .field("idle_overrides", &state.idle_overrides)
            .field("is_idle", &state.is_idle)
            .finish()
    }
}

/// A handle to a loaded player.
///
/// Once the player has been evicted from its scheduler,
/// all operations on the handle are no-ops and the player reports itself as paused.
#[derive(Clone)]
pub struct AnimationHandle {
    id: PlayerId,
    scheduler: AnimationScheduler,
}

impl AnimationHandle {
    pub fn id(&self) -> PlayerId { self.id }

    pub fn play(&self) {
        self.scheduler.with_player(self.id, AnimationPlayer::play);
    }

    pub fn stop(&self) {
        self.scheduler.with_player(self.id, AnimationPlayer::stop);
    }

    pub fn restart(&self) {
        self.scheduler.with_player(self.id, AnimationPlayer::restart);
    }

    pub fn set_autoplay(&self, autoplay: bool) {
        self.scheduler.with_player(self.id, |p| p.set_autoplay(autoplay));
    }

    pub fn is_paused(&self) -> bool {
        self.scheduler.with_player(self.id, |p| p.is_paused()).unwrap_or(true)
    }

    pub fn autoplay(&self) -> bool {
        self.scheduler.with_player(self.id, |p| p.autoplay()).unwrap_or(false)
    }

    pub fn max_frame(&self) -> u32 {
        self.scheduler.with_player(self.id, |p| p.max_frame()).unwrap_or(0)
    }

    pub fn current_frame(&self) -> u32 {
        self.scheduler.with_player(self.id, |p| p.current_frame()).unwrap_or(0)
    }

    /// Whether the player is still owned by its scheduler.
    pub fn is_alive(&self) -> bool {
        self.scheduler.with_player(self.id, |_| ()).is_some()
    }
}

impl fmt::Debug for AnimationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnimationHandle").field(&self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_only_advances_playing_players() {
        let scheduler = AnimationScheduler::new();
        let group = AnimationGroupId::from("g");
        let playing = scheduler.insert_player(group.clone(), 3, true);
        let _paused = scheduler.insert_player(group, 3, false);

        let events = scheduler.tick();
        assert_eq!(events, vec![FrameEvent { player: playing.id(), frame: 0, max_frame: 2 }]);
    }

    #[test]
    fn idle_suspends_only_unregistered_groups() {
        let scheduler = AnimationScheduler::new();
        let menu = AnimationGroupId::with_timestamp("CHAT-MENU-REACTIONS", 1);
        let background = AnimationGroupId::from("chat");
        let menu_player = scheduler.insert_player(menu.clone(), 10, true);
        scheduler.insert_player(background.clone(), 10, true);

        scheduler.register_group(&menu);
        scheduler.set_idle(true);
        assert!(!scheduler.is_group_suspended(&menu));
        assert!(scheduler.is_group_suspended(&background));

        let events = scheduler.tick();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].player, menu_player.id());

        scheduler.unregister_group(&menu);
        assert!(menu_player.is_paused());
        assert!(scheduler.tick().is_empty());
    }

    #[test]
    fn released_handles_are_inert() {
        let scheduler = AnimationScheduler::new();
        let group = AnimationGroupId::from("g");
        let handle = scheduler.insert_player(group.clone(), 5, true);
        assert!(!handle.is_paused());

        assert_eq!(scheduler.release_group(&group), 1);
        assert!(!handle.is_alive());
        assert!(handle.is_paused());
        handle.play();
        assert!(scheduler.tick().is_empty());
    }

    #[test]
    fn group_ids_include_the_timestamp() {
        let group = AnimationGroupId::with_timestamp("CHAT-MENU-REACTIONS", 1650000000000);
        assert!(group.as_str().starts_with("CHAT-MENU-REACTIONS-1650000000000-"));
    }

    #[test]
    fn group_ids_created_in_the_same_millisecond_differ() {
        let first = AnimationGroupId::with_timestamp("CHAT-MENU-REACTIONS", 1650000000000);
        let second = AnimationGroupId::with_timestamp("CHAT-MENU-REACTIONS", 1650000000000);
        assert_ne!(first, second);
    }
}
