//! A single non-looping vector animation player.

use super::scheduler::AnimationGroupId;

/// Uniquely identifies a player within its [`super::AnimationScheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub(crate) u64);

#[derive(Clone, Debug)]
pub struct AnimationPlayer {
    id: PlayerId,
    group: AnimationGroupId,
    max_frame: u32,
    current_frame: u32,
    paused: bool,
    autoplay: bool,
}

impl AnimationPlayer {
    pub(crate) fn new(id: PlayerId, group: AnimationGroupId, frame_count: u32, autoplay: bool) -> Self {
        Self {
            id,
            group,
            max_frame: frame_count.saturating_sub(1),
            current_frame: 0,
            paused: !autoplay,
            autoplay,
        }
    }

    pub fn id(&self) -> PlayerId { self.id }
    pub fn group(&self) -> &AnimationGroupId { &self.group }
    pub fn max_frame(&self) -> u32 { self.max_frame }
    pub fn current_frame(&self) -> u32 { self.current_frame }
    pub fn is_paused(&self) -> bool { self.paused }
    pub fn autoplay(&self) -> bool { self.autoplay }

    pub fn set_autoplay(&mut self, autoplay: bool) {
        self.autoplay = autoplay;
    }

    pub fn play(&mut self) {
        self.paused = false;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Rewinds to the first frame and pauses.
    pub fn stop(&mut self) {
        self.current_frame = 0;
        self.paused = true;
    }

    /// Rewinds to the first frame, and plays again if autoplay is enabled.
    pub fn restart(&mut self) {
        self.current_frame = 0;
        self.paused = !self.autoplay;
    }

    /// Renders the current frame and moves on to the next one.
    ///
    /// Returns the number of the rendered frame, or `None` if paused.
    /// After rendering the last frame the player pauses itself.
    pub(crate) fn advance(&mut self) -> Option<u32> {
        if self.paused {
            return None;
        }
        let rendered = self.current_frame;
        if rendered >= self.max_frame {
            self.paused = true;
        } else {
            self.current_frame += 1;
        }
        Some(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(frames: u32, autoplay: bool) -> AnimationPlayer {
        AnimationPlayer::new(PlayerId(1), AnimationGroupId::from("test"), frames, autoplay)
    }

    #[test]
    fn plays_through_once_then_pauses() {
        let mut p = player(3, true);
        assert_eq!(p.advance(), Some(0));
        assert_eq!(p.advance(), Some(1));
        assert_eq!(p.advance(), Some(2));
        assert!(p.is_paused());
        assert_eq!(p.advance(), None);
    }

    #[test]
    fn non_autoplay_player_starts_paused() {
        let mut p = player(3, false);
        assert!(p.is_paused());
        assert_eq!(p.advance(), None);
        p.play();
        assert_eq!(p.advance(), Some(0));
    }

    #[test]
    fn restart_respects_autoplay() {
        let mut p = player(2, false);
        p.play();
        p.advance();
        p.restart();
        assert!(p.is_paused());
        assert_eq!(p.current_frame(), 0);

        p.set_autoplay(true);
        p.restart();
        assert!(!p.is_paused());
    }

    #[test]
    fn stop_rewinds_and_pauses() {
        let mut p = player(4, true);
        p.advance();
        p.advance();
        p.stop();
        assert!(p.is_paused());
        assert_eq!(p.current_frame(), 0);
    }
}
