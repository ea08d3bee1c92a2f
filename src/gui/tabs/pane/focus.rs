// §4.D Focus Manager: tracks the single focused leaf per workspace and
// applies the precedence rules on structural mutation. Does not touch GTK
// directly -- the caller is responsible for calling `grab_focus` on the
// widget that mirrors whatever leaf `current()` reports after a change.

use std::time::{Duration, Instant};

use crate::com::PaneId;

use super::tree::CloseOutcome;

const FOCUS_THROTTLE: Duration = Duration::from_millis(100);

pub struct FocusManager {
    current: PaneId,
    last_change: Option<Instant>,
}

// A request to move focus, tagged with whether it came from a throttled
// source (pointer motion) or an unconditional one (keyboard, close).
pub enum FocusRequest {
    Unconditional(PaneId),
    Throttled(PaneId),
}

impl FocusManager {
    pub fn new(initial: PaneId) -> Self {
        Self { current: initial, last_change: None }
    }

    pub fn current(&self) -> PaneId {
        self.current
    }

    /// Applies a focus request, honoring the 100ms throttle for
    /// pointer-driven requests. Returns `true` if focus actually changed.
    pub fn request(&mut self, req: FocusRequest) -> bool {
        let (target, throttled) = match req {
            FocusRequest::Unconditional(p) => (p, false),
            FocusRequest::Throttled(p) => (p, true),
        };

        if target == self.current {
            return false;
        }

        if throttled {
            if let Some(last) = self.last_change {
                if last.elapsed() < FOCUS_THROTTLE {
                    return false;
                }
            }
        }

        self.current = target;
        self.last_change = Some(Instant::now());
        true
    }

    /// §4.D rule 2: when the focused leaf is closed, focus moves to
    /// whatever the tree close operation reports took its place.
    pub fn on_close(&mut self, closed: PaneId, outcome: CloseOutcome) {
        if closed != self.current {
            return;
        }
        let next = match outcome {
            CloseOutcome::PromotedSibling(p) => p,
            CloseOutcome::StackShrunk { active } => active,
            CloseOutcome::StackDegenerated(p) => p,
        };
        self.current = next;
        self.last_change = Some(Instant::now());
    }

    /// §4.D rule 3: a new pane created by split/stack takes focus
    /// immediately, bypassing the throttle (keyboard-driven action).
    pub fn on_new_pane(&mut self, new_pane: PaneId) {
        self.current = new_pane;
        self.last_change = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconditional_request_always_applies() {
        let p1 = PaneId::next();
        let p2 = PaneId::next();
        let mut focus = FocusManager::new(p1);
        assert!(focus.request(FocusRequest::Unconditional(p2)));
        assert_eq!(focus.current(), p2);
    }

    #[test]
    fn throttled_request_is_dropped_within_window() {
        let p1 = PaneId::next();
        let p2 = PaneId::next();
        let p3 = PaneId::next();
        let mut focus = FocusManager::new(p1);
        assert!(focus.request(FocusRequest::Throttled(p2)));
        assert!(!focus.request(FocusRequest::Throttled(p3)));
        assert_eq!(focus.current(), p2);
    }

    #[test]
    fn close_of_focused_pane_moves_focus_to_promoted_sibling() {
        let p1 = PaneId::next();
        let p2 = PaneId::next();
        let mut focus = FocusManager::new(p2);
        focus.on_close(p2, CloseOutcome::PromotedSibling(p1));
        assert_eq!(focus.current(), p1);
    }

    #[test]
    fn close_of_non_focused_pane_leaves_focus_unchanged() {
        let p1 = PaneId::next();
        let p2 = PaneId::next();
        let p3 = PaneId::next();
        let mut focus = FocusManager::new(p1);
        focus.on_close(p2, CloseOutcome::PromotedSibling(p3));
        assert_eq!(focus.current(), p1);
    }

    #[test]
    fn new_pane_takes_focus_bypassing_throttle() {
        let p1 = PaneId::next();
        let p2 = PaneId::next();
        let p3 = PaneId::next();
        let mut focus = FocusManager::new(p1);
        assert!(focus.request(FocusRequest::Throttled(p2)));
        focus.on_new_pane(p3);
        assert_eq!(focus.current(), p3);
    }
}
