//! Tracks which input listeners a UI component currently has attached.
//!
//! Events of a kind whose listener is not attached must be ignored by the component,
//! which is how teardown guarantees that no late input re-enters a closed menu.

use bitflags::bitflags;

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct Listeners: u8 {
        /// Scroll events of a scrollable container.
        const Scroll = 1 << 0;
        /// Pointer movement (hover). Never attached on touch devices.
        const PointerMove = 1 << 1;
        /// Clicks/taps.
        const Click = 1 << 2;
        /// Outside clicks, the escape key, and back navigation that close a menu.
        const Dismiss = 1 << 3;
    }
}

#[derive(Debug, Default)]
pub struct ListenerSet {
    attached: Listeners,
}

impl ListenerSet {
    pub fn attach(&mut self, listeners: Listeners) {
        self.attached.insert(listeners);
    }

    pub fn is_attached(&self, listener: Listeners) -> bool {
        self.attached.contains(listener)
    }

    /// Detaches every listener, returning the set that was attached.
    pub fn remove_all(&mut self) -> Listeners {
        std::mem::take(&mut self.attached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_all_detaches_everything() {
        let mut set = ListenerSet::default();
        set.attach(Listeners::Scroll | Listeners::Click);
        assert!(set.is_attached(Listeners::Scroll));
        assert!(!set.is_attached(Listeners::PointerMove));

        let removed = set.remove_all();
        assert_eq!(removed, Listeners::Scroll | Listeners::Click);
        assert!(!set.is_attached(Listeners::Scroll));
        assert!(!set.is_attached(Listeners::Click));
    }
}
