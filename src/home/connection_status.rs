//! The connection status banner shown above the chats list.
//!
//! Network workers report the status of each datacenter connection
//! via [`enqueue_connection_update()`], and the UI thread drains those updates
//! in [`ConnectionStatus::process_pending_updates()`].
//! The banner is shown while the client is (re)connecting or catching up on missed updates,
//! but only once that state has persisted for [`CHANGE_STATE_DELAY`].

use std::{
    collections::HashMap,
    mem,
    time::{Duration, Instant},
};

use crossbeam_channel::Sender;
use crossbeam_queue::SegQueue;
use eyeball::{SharedObservable, Subscriber};
use tracing::{debug, trace, warn};

use crate::collaborators::PeerId;

/// How long a new state must persist before the banner is shown or hidden.
pub const CHANGE_STATE_DELAY: Duration = Duration::from_secs(1);
/// If no status was reported by then, the status is evaluated anyway.
const FIRST_STATUS_DELAY: Duration = Duration::from_secs(2);

static PENDING_CONNECTION_UPDATES: SegQueue<ConnectionUpdate> = SegQueue::new();

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Connecting,
    Closed,
    TimedOut,
}

/// The status of the connection to one datacenter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkerStatus {
    pub dc_id: u32,
    pub state: ConnectionState,
    /// When the next reconnection attempt will be made, if one is scheduled.
    pub retry_at: Option<Instant>,
}

/// An update to the connection status, sent from a network worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionUpdate {
    Networker(NetworkerStatus),
    /// Started fetching missed updates. Only channel-less (global) updates affect the banner.
    StateSynchronizing { channel_id: Option<PeerId> },
    StateSynchronized { channel_id: Option<PeerId> },
}

/// Enqueues a new connection status update to be handled on the UI thread.
pub fn enqueue_connection_update(update: ConnectionUpdate) {
    PENDING_CONNECTION_UPDATES.push(update);
}

/// A request from the banner to the networking layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionAction {
    /// The connection came back: fetch everything that was missed.
    ForceGetDifference,
    /// Reconnect right away after a timeout.
    ForceReconnect,
    /// Skip the remaining wait before the next scheduled reconnection attempt.
    ForceReconnectTimeout,
}

/// The text shown in the banner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusText {
    TimedOut,
    ReconnectIn { retry_at: Instant },
    Reconnecting,
    Waiting,
    Updating,
}

impl StatusText {
    /// The action behind the banner's inline link, if it has one.
    pub fn link(&self) -> Option<ConnectionAction> {
        match self {
            Self::TimedOut => Some(ConnectionAction::ForceReconnect),
            Self::ReconnectIn { .. } => Some(ConnectionAction::ForceReconnectTimeout),
            _ => None,
        }
    }

    /// Renders the banner text at the given instant.
    pub fn render(&self, now: Instant) -> String {
        match self {
            Self::TimedOut => "Connection timed out. Reconnect".to_owned(),
            Self::ReconnectIn { retry_at } => {
                format!("Reconnecting in {}s... Reconnect now", seconds_until(*retry_at, now))
            }
            Self::Reconnecting => "Reconnecting...".to_owned(),
            Self::Waiting => "Waiting for network...".to_owned(),
            Self::Updating => "Updating...".to_owned(),
        }
    }
}

/// The number of whole seconds (rounded) from `now` until `at`, or 0 if it has passed.
pub fn seconds_until(at: Instant, now: Instant) -> u64 {
    let remaining = at.saturating_duration_since(now);
    (remaining.as_millis() as u64 + 500) / 1000
}

pub struct ConnectionStatus {
    base_dc_id: u32,
    networkers: HashMap<u32, NetworkerStatus>,
    had_connect: bool,
    connecting: bool,
    timed_out: bool,
    updating: bool,
    retry_at: Option<Instant>,
    status_text: Option<StatusText>,
    /// Incremented each time the status text is replaced.
    text_revision: u64,
    first_status_at: Option<Instant>,
    /// The visibility to apply at the given instant.
    pending_visibility: Option<(Instant, bool)>,
    is_shown: SharedObservable<bool>,
    action_sender: Sender<ConnectionAction>,
}

impl ConnectionStatus {
    pub fn new(base_dc_id: u32, action_sender: Sender<ConnectionAction>, now: Instant) -> Self {
        Self {
            base_dc_id,
            networkers: HashMap::new(),
            had_connect: false,
            connecting: false,
            timed_out: false,
            updating: false,
            retry_at: None,
            status_text: None,
            text_revision: 0,
            first_status_at: Some(now + FIRST_STATUS_DELAY),
            pending_visibility: None,
            is_shown: SharedObservable::new(false),
            action_sender,
        }
    }

    /// Handles all updates enqueued by network workers.
    pub fn process_pending_updates(&mut self, now: Instant) {
        while let Some(update) = PENDING_CONNECTION_UPDATES.pop() {
            self.handle_update(update, now);
        }
    }

    pub fn handle_update(&mut self, update: ConnectionUpdate, now: Instant) {
        trace!("Connection update: {update:?}");
        match update {
            ConnectionUpdate::Networker(status) => {
                self.networkers.insert(status.dc_id, status);
                self.set_connection_status(now);
            }
            ConnectionUpdate::StateSynchronizing { channel_id: None } => {
                self.updating = true;
                self.set_state(now);
            }
            ConnectionUpdate::StateSynchronized { channel_id: None } => {
                self.updating = false;
                self.set_state(now);
            }
            ConnectionUpdate::StateSynchronizing { .. } | ConnectionUpdate::StateSynchronized { .. } => {}
        }
    }

    /// Applies timers that have expired by `now`.
    pub fn on_timer(&mut self, now: Instant) {
        if self.first_status_at.is_some_and(|at| now >= at) {
            self.set_connection_status(now);
        }
        if let Some((at, is_shown)) = self.pending_visibility
            && now >= at
        {
            self.pending_visibility = None;
            if self.is_shown.set_if_not_eq(is_shown).is_some() {
                debug!("Connection status banner is now {}", if is_shown { "shown" } else { "hidden" });
            }
        }
    }

    /// Handles a click on the banner's inline link.
    pub fn activate_link(&self) -> Option<ConnectionAction> {
        let action = self.status_text?.link()?;
        self.post(action);
        Some(action)
    }

    fn post(&self, action: ConnectionAction) {
        if self.action_sender.send(action).is_err() {
            warn!("Failed to post connection action {action:?}: receiver is gone");
        }
    }

    fn set_connection_status(&mut self, now: Instant) {
        self.first_status_at = None;
        let status = self.networkers.get(&self.base_dc_id).copied();
        let online = status.is_some_and(|s| s.state == ConnectionState::Connected);
        if self.connecting && online {
            self.post(ConnectionAction::ForceGetDifference);
        }
        if online {
            self.had_connect = true;
        }
        self.timed_out = status.is_some_and(|s| s.state == ConnectionState::TimedOut);
        self.connecting = !online;
        self.retry_at = status.and_then(|s| s.retry_at);
        self.set_state(now);
    }

    fn set_state(&mut self, now: Instant) {
        let text = if self.connecting {
            Some(match (self.timed_out, self.had_connect, self.retry_at) {
                (true, _, _) => StatusText::TimedOut,
                (false, true, Some(retry_at)) => StatusText::ReconnectIn { retry_at },
                (false, true, None) => StatusText::Reconnecting,
                (false, false, _) => StatusText::Waiting,
            })
        } else if self.updating {
            Some(StatusText::Updating)
        } else {
            None
        };
        if let Some(text) = text {
            self.set_status_text(text);
        }

        // A newer state change restarts the delay.
        let is_shown = self.connecting || self.updating;
        self.pending_visibility = Some((now + CHANGE_STATE_DELAY, is_shown));
    }

    /// Replaces the status text only if it is a different kind of text,
    /// so a running countdown is not reset by repeated status reports.
    fn set_status_text(&mut self, text: StatusText) {
        if self.status_text.is_some_and(|current| mem::discriminant(&current) == mem::discriminant(&text)) {
            return;
        }
        self.status_text = Some(text);
        self.text_revision += 1;
    }

    pub fn status_text(&self) -> Option<StatusText> { self.status_text }
    pub fn text_revision(&self) -> u64 { self.text_revision }
    pub fn is_connecting(&self) -> bool { self.connecting }
    pub fn is_updating(&self) -> bool { self.updating }
    pub fn had_connect(&self) -> bool { self.had_connect }
    pub fn is_shown(&self) -> bool { self.is_shown.get() }

    /// Subscribes to changes of the banner's visibility.
    pub fn subscribe_shown(&self) -> Subscriber<bool> {
        self.is_shown.subscribe()
    }
}
