// §4.E Popup Router: classifies WebView-create signals into a placement
// decision, deduplicating rapid-fire duplicate popups and recognizing the
// OAuth two-phase-popup pattern.

use std::time::{Duration, Instant};

use ahash::AHashMap;
use sha2::{Digest, Sha256};

use crate::com::{BlankTargetBehavior, NavigationType, PaneId, PopupBehavior, WebViewId, WindowFeatures};
use crate::config::{OAuthPattern, CONFIG};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupClassification {
    Drop,
    OAuthPopup,
    Placement(Placement),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Split,
    Stacked,
    Tabbed,
    Windowed,
}

impl From<PopupBehavior> for Placement {
    fn from(b: PopupBehavior) -> Self {
        match b {
            PopupBehavior::Split => Self::Split,
            PopupBehavior::Stacked => Self::Stacked,
            PopupBehavior::Tabbed => Self::Tabbed,
            PopupBehavior::Windowed => Self::Windowed,
        }
    }
}

impl From<BlankTargetBehavior> for Placement {
    fn from(b: BlankTargetBehavior) -> Self {
        match b {
            BlankTargetBehavior::Split => Self::Split,
            BlankTargetBehavior::Stacked => Self::Stacked,
            BlankTargetBehavior::Tabbed => Self::Tabbed,
        }
    }
}

pub struct PendingPopup {
    pub parent: PaneId,
    pub created: Instant,
    pub placement: Placement,
}

pub struct PopupRouter {
    recent_fingerprints: AHashMap<String, Instant>,
    pub pending_popups: AHashMap<WebViewId, PendingPopup>,
}

impl Default for PopupRouter {
    fn default() -> Self {
        Self { recent_fingerprints: AHashMap::new(), pending_popups: AHashMap::new() }
    }
}

impl PopupRouter {
    pub fn new() -> Self {
        Self::default()
    }

    fn fingerprint(parent: PaneId, url: &str, features: &WindowFeatures) -> String {
        let mut hasher = Sha256::new();
        hasher.update(parent.to_string().as_bytes());
        hasher.update(url.as_bytes());
        hasher.update(features.width.unwrap_or(0).to_le_bytes());
        hasher.update(features.height.unwrap_or(0).to_le_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn is_duplicate(&mut self, fingerprint: &str, now: Instant) -> bool {
        let dedup_window = Duration::from_millis(CONFIG.timeouts.popup_dedup_ms);
        if let Some(prev) = self.recent_fingerprints.get(fingerprint) {
            if now.duration_since(*prev) < dedup_window {
                return true;
            }
        }
        self.recent_fingerprints.insert(fingerprint.to_string(), now);
        false
    }

    fn matches_oauth(url: &str, features: &WindowFeatures, patterns: &[OAuthPattern]) -> bool {
        let (Some(w), Some(h)) = (features.width, features.height) else {
            return false;
        };
        patterns.iter().any(|p| {
            w <= p.max_width && h <= p.max_height && p.path_contains.iter().any(|needle| url.contains(needle.as_str()))
        })
    }

    // Decision table from spec §4.E, first match wins.
    pub fn classify(
        &mut self,
        parent: PaneId,
        url: &str,
        features: &WindowFeatures,
        nav_type: NavigationType,
    ) -> PopupClassification {
        let now = Instant::now();
        let fingerprint = Self::fingerprint(parent, url, features);

        if self.is_duplicate(&fingerprint, now) {
            return PopupClassification::Drop;
        }

        if Self::matches_oauth(url, features, &CONFIG.popups.oauth_patterns) {
            return PopupClassification::OAuthPopup;
        }

        if nav_type == NavigationType::NewWindow {
            return PopupClassification::Placement(CONFIG.popups.blank_target_behavior.into());
        }

        PopupClassification::Placement(CONFIG.popups.behavior.into())
    }

    pub fn register_pending(&mut self, id: WebViewId, parent: PaneId, placement: Placement) {
        self.pending_popups.insert(id, PendingPopup { parent, created: Instant::now(), placement });
    }

    pub fn take_ready(&mut self, id: WebViewId) -> Option<PendingPopup> {
        self.pending_popups.remove(&id)
    }

    // Drops any pending popup that has outlived the timeout without firing
    // `ready_to_show`. Should be polled from a periodic GUI-thread tick.
    pub fn expire_stale(&mut self) {
        let timeout = Duration::from_millis(CONFIG.timeouts.popup_pending_ms);
        let now = Instant::now();
        self.pending_popups.retain(|_, p| now.duration_since(p.created) < timeout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(w: i32, h: i32) -> WindowFeatures {
        WindowFeatures { width: Some(w), height: Some(h) }
    }

    #[test]
    fn duplicate_intents_within_window_are_dropped() {
        let mut router = PopupRouter::new();
        let parent = PaneId::next();
        let first = router.classify(parent, "https://x", &features(400, 300), NavigationType::Other);
        assert!(!matches!(first, PopupClassification::Drop));
        let second = router.classify(parent, "https://x", &features(400, 300), NavigationType::Other);
        assert_eq!(second, PopupClassification::Drop);
    }

    #[test]
    fn oauth_pattern_takes_priority_over_new_window() {
        let mut router = PopupRouter::new();
        let parent = PaneId::next();
        let classification = router.classify(
            parent,
            "https://accounts.example.com/oauth/authorize",
            &features(500, 600),
            NavigationType::NewWindow,
        );
        assert_eq!(classification, PopupClassification::OAuthPopup);
    }

    #[test]
    fn default_placement_falls_back_to_configured_behavior() {
        let mut router = PopupRouter::new();
        let parent = PaneId::next();
        let classification =
            router.classify(parent, "https://plain.example/page", &features(1200, 800), NavigationType::Other);
        assert_eq!(classification, PopupClassification::Placement(CONFIG.popups.behavior.into()));
    }

    #[test]
    fn pending_popup_round_trips() {
        let mut router = PopupRouter::new();
        let parent = PaneId::next();
        let view = WebViewId::next();
        router.register_pending(view, parent, Placement::Split);
        let pending = router.take_ready(view).expect("pending popup should be present");
        assert_eq!(pending.parent, parent);
        assert!(router.take_ready(view).is_none());
    }
}
