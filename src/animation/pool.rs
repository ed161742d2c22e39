//! Loads vector animation resources into players.
//!
//! Loading is asynchronous: [`AnimationPool::load()`] returns a [`PendingAnimation`]
//! that the UI thread polls. Every load is bound to a cancellation token;
//! once the token is invalidated, the load resolves to [`LoadResult::Inert`]
//! and no player is ever created for it.

use std::rc::Rc;

use tracing::{trace, warn};

use crate::{
    collaborators::{AnimationInfo, AnimationRef, AnimationSource},
    shared::{
        cancellation::CancellationToken,
        lookup::{Lookup, LookupPoll},
    },
};
use super::scheduler::{AnimationGroupId, AnimationHandle, AnimationScheduler};

/// Options for loading a single animation.
#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// The target size in pixels (width and height).
    pub size: u32,
    pub group: AnimationGroupId,
    pub token: CancellationToken,
    /// Whether the player should start playing as soon as it is loaded.
    pub autoplay: bool,
}

/// The outcome of a finished load.
#[derive(Debug)]
pub enum LoadResult {
    Loaded(AnimationHandle),
    /// The load failed or was cancelled. Callers must simply skip their side effects.
    Inert,
}

#[derive(Clone)]
pub struct AnimationPool {
    source: Rc<dyn AnimationSource>,
    scheduler: AnimationScheduler,
}

impl AnimationPool {
    pub fn new(source: Rc<dyn AnimationSource>, scheduler: AnimationScheduler) -> Self {
        Self { source, scheduler }
    }

    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    pub fn load(&self, resource: &AnimationRef, options: LoadOptions) -> PendingAnimation {
        trace!("Loading animation {resource:?} at {}px into group {}", options.size, options.group);
        PendingAnimation {
            resource: resource.clone(),
            lookup: self.source.fetch(resource, options.size),
            options,
            scheduler: self.scheduler.clone(),
        }
    }
}

/// An in-flight animation load.
pub struct PendingAnimation {
    resource: AnimationRef,
    lookup: Lookup<anyhow::Result<AnimationInfo>>,
    options: LoadOptions,
    scheduler: AnimationScheduler,
}

impl PendingAnimation {
    /// Polls the load without blocking. Returns `None` while still loading.
    ///
    /// Once this has returned `Some`, the load is finished and must not be polled again.
    pub fn poll(&mut self) -> Option<LoadResult> {
        if !self.options.token.is_valid() {
            return Some(LoadResult::Inert);
        }
        match self.lookup.poll() {
            LookupPoll::Pending => None,
            LookupPoll::Ready(Ok(info)) => Some(LoadResult::Loaded(self.scheduler.insert_player(
                self.options.group.clone(),
                info.frame_count,
                self.options.autoplay,
            ))),
            LookupPoll::Ready(Err(e)) => {
                warn!("Failed to load animation {:?}: {e}", self.resource);
                Some(LoadResult::Inert)
            }
            LookupPoll::Closed => {
                warn!("Animation source dropped the load of {:?}", self.resource);
                Some(LoadResult::Inert)
            }
        }
    }
}

impl std::fmt::Debug for PendingAnimation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAnimation")
            .field("resource", &self.resource)
            .field("autoplay", &self.options.autoplay)
            .finish()
    }
}
