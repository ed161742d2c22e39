//! A value that is either available right away or delivered later by a background task.
//!
//! External collaborators return a [`Lookup`] so that callers can treat
//! synchronous and asynchronous results with the same code path,
//! while still knowing which path was taken.
//! The UI thread polls pending lookups without blocking.

use tokio::sync::oneshot::{self, error::TryRecvError};

/// The sending half of a pending [`Lookup`], handed to the task that computes the value.
pub type LookupSender<T> = oneshot::Sender<T>;

pub struct Lookup<T> {
    state: LookupState<T>,
    was_ready: bool,
}

enum LookupState<T> {
    Ready(Option<T>),
    Pending(oneshot::Receiver<T>),
    Done,
}

/// The result of polling a [`Lookup`].
#[derive(Debug, PartialEq)]
pub enum LookupPoll<T> {
    /// The value has arrived (or was available from the start).
    Ready(T),
    /// The value has not arrived yet.
    Pending,
    /// The sender was dropped without sending, or the value was already taken.
    Closed,
}

impl<T> Lookup<T> {
    /// A lookup that resolved synchronously.
    pub fn ready(value: T) -> Self {
        Self { state: LookupState::Ready(Some(value)), was_ready: true }
    }

    /// A lookup whose value will be sent later through the returned sender.
    pub fn pending() -> (LookupSender<T>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { state: LookupState::Pending(receiver), was_ready: false })
    }

    /// Whether this lookup was resolved at creation time, i.e., without any suspension.
    pub fn was_ready(&self) -> bool {
        self.was_ready
    }

    /// Takes the value if it is available. Never blocks.
    pub fn poll(&mut self) -> LookupPoll<T> {
        let result = match &mut self.state {
            LookupState::Ready(value) => match value.take() {
                Some(v) => LookupPoll::Ready(v),
                None => LookupPoll::Closed,
            },
            LookupState::Pending(receiver) => match receiver.try_recv() {
                Ok(v) => LookupPoll::Ready(v),
                Err(TryRecvError::Empty) => return LookupPoll::Pending,
                Err(TryRecvError::Closed) => LookupPoll::Closed,
            },
            LookupState::Done => LookupPoll::Closed,
        };
        self.state = LookupState::Done;
        result
    }
}

impl<T> std::fmt::Debug for Lookup<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            LookupState::Ready(_) => "Ready",
            LookupState::Pending(_) => "Pending",
            LookupState::Done => "Done",
        };
        f.debug_struct("Lookup").field("state", &state).field("was_ready", &self.was_ready).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_lookup_yields_once() {
        let mut lookup = Lookup::ready(5);
        assert!(lookup.was_ready());
        assert_eq!(lookup.poll(), LookupPoll::Ready(5));
        assert_eq!(lookup.poll(), LookupPoll::Closed);
    }

    #[test]
    fn pending_lookup_resolves_after_send() {
        let (sender, mut lookup) = Lookup::pending();
        assert!(!lookup.was_ready());
        assert_eq!(lookup.poll(), LookupPoll::Pending);
        sender.send("hi").unwrap();
        assert_eq!(lookup.poll(), LookupPoll::Ready("hi"));
        assert_eq!(lookup.poll(), LookupPoll::Closed);
    }

    #[test]
    fn dropped_sender_closes_lookup() {
        let (sender, mut lookup) = Lookup::<u8>::pending();
        drop(sender);
        assert_eq!(lookup.poll(), LookupPoll::Closed);
    }
}
