// §4.C/§8.1 reparent quiescence: for `CONFIG.timeouts.reparent_quiescence_ms`
// after a leaf's widget moves to a new parent, no CSS-class mutation may be
// applied to that leaf's subtree -- GTK's style cache corrupts under
// reparent-plus-restyle on the same tick. Kept free of GTK types so it can be
// unit tested the way `FocusManager`'s throttle is, without a display.

use std::time::{Duration, Instant};

use ahash::AHashMap;

use crate::com::NodeId;
use crate::config::CONFIG;

#[derive(Default)]
pub struct QuiescenceGate {
    until: AHashMap<NodeId, Instant>,
}

impl QuiescenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a quiescence window for `node`, sourced from
    /// `CONFIG.timeouts.reparent_quiescence_ms`. Called once per leaf
    /// whenever a reparent moves that leaf's widget.
    pub fn open(&mut self, node: NodeId) {
        self.open_for(node, Duration::from_millis(CONFIG.timeouts.reparent_quiescence_ms));
    }

    fn open_for(&mut self, node: NodeId, duration: Duration) {
        self.until.insert(node, Instant::now() + duration);
    }

    pub fn is_quiescent(&self, node: NodeId) -> bool {
        self.until.get(&node).is_some_and(|&until| Instant::now() < until)
    }

    /// Time left in the window, if `node` is currently quiescent. Callers
    /// gating a CSS mutation use this to defer the mutation rather than
    /// drop it.
    pub fn remaining(&self, node: NodeId) -> Option<Duration> {
        self.until.get(&node).and_then(|&until| until.checked_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use std::thread::sleep;

    use super::*;

    #[test]
    fn freshly_opened_node_is_quiescent() {
        let node = NodeId::next();
        let mut gate = QuiescenceGate::new();
        gate.open_for(node, Duration::from_millis(50));
        assert!(gate.is_quiescent(node));
        assert!(gate.remaining(node).is_some());
    }

    #[test]
    fn node_never_opened_is_not_quiescent() {
        let node = NodeId::next();
        let gate = QuiescenceGate::new();
        assert!(!gate.is_quiescent(node));
        assert!(gate.remaining(node).is_none());
    }

    #[test]
    fn window_expires_after_its_duration() {
        let node = NodeId::next();
        let mut gate = QuiescenceGate::new();
        gate.open_for(node, Duration::from_millis(5));
        sleep(Duration::from_millis(20));
        assert!(!gate.is_quiescent(node));
        assert!(gate.remaining(node).is_none());
    }

    #[test]
    fn opening_one_node_does_not_quiesce_another() {
        let a = NodeId::next();
        let b = NodeId::next();
        let mut gate = QuiescenceGate::new();
        gate.open_for(a, Duration::from_millis(50));
        assert!(gate.is_quiescent(a));
        assert!(!gate.is_quiescent(b));
    }

    #[test]
    fn default_window_comes_from_config() {
        let node = NodeId::next();
        let mut gate = QuiescenceGate::new();
        gate.open(node);
        let remaining = gate.remaining(node).expect("just opened");
        assert!(remaining <= Duration::from_millis(CONFIG.timeouts.reparent_quiescence_ms));
    }
}
