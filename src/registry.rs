//! Insertion-ordered selector registry.
//!
//! Backs a [`Reactor`](crate::Reactor): each registration pairs a
//! [`Selector`] with a sink, and a lookup returns every sink whose selector
//! matches the key, in registration order. Matching is a linear scan; a bus
//! carries a handful of registrations, not thousands.

use std::sync::RwLock;

use crate::selector::{Key, Selector};

pub(crate) struct Registry<S> {
    entries: RwLock<Vec<(Selector, S)>>,
}

impl<S: Clone> Registry<S> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Appends a registration; duplicates per selector are allowed.
    pub(crate) fn register(&self, selector: Selector, sink: S) {
        self.entries.write().unwrap().push((selector, sink));
    }

    /// Sinks whose selector matches `key`, in registration order.
    pub(crate) fn select(&self, key: &Key) -> Vec<S> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|(sel, _)| sel.matches(key))
            .map(|(_, sink)| sink.clone())
            .collect()
    }

    /// Sinks registered under a selector equal to `selector`, in
    /// registration order.
    pub(crate) fn select_direct(&self, selector: &Selector) -> Vec<S> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|(sel, _)| sel == selector)
            .map(|(_, sink)| sink.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_registration_order() {
        let reg = Registry::new();
        let (sel, key) = Selector::anonymous();
        reg.register(sel.clone(), 1);
        reg.register(Selector::any_fault(), 2);
        reg.register(sel.clone(), 3);
        assert_eq!(reg.select(&key), vec![1, 3]);
        assert_eq!(reg.select_direct(&sel), vec![1, 3]);
    }

    #[test]
    fn non_matching_keys_select_nothing() {
        let reg = Registry::new();
        let (sel, _) = Selector::anonymous();
        reg.register(sel, 1);
        assert!(reg.select(&Key::name("elsewhere")).is_empty());
    }
}
