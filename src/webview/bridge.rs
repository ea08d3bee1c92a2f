// §4.I Message Bridge: a single-producer queue per WebView, drained on the
// gui thread. Inbound messages never block on WebView operations; the
// `script-message-received` signal just pushes raw text and a GUI tick calls
// `dispatch_inbound`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::com::{BridgeMessage, NavigationType, WindowFeatures};

#[derive(Default)]
pub struct InboundQueue(RefCell<VecDeque<String>>);

impl InboundQueue {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn push(&self, raw: String) {
        self.0.borrow_mut().push_back(raw);
    }

    pub fn drain(&self, mut f: impl FnMut(&str)) {
        let mut queue = self.0.borrow_mut();
        while let Some(raw) = queue.pop_front() {
            f(&raw);
        }
    }
}

// Effects a parsed inbound message has on the owning pane/leaf. Implemented
// by whatever holds the Pane Tree; kept as a trait here so the bridge's
// parsing logic doesn't need to know about tree types.
pub trait BridgeContext {
    fn navigate(&self, url: &str);
    fn window_open(&self, url: &str, features: WindowFeatures, nav_type: NavigationType);
    fn set_title(&self, title: &str);
    fn cache_favicon(&self, favicon_url: &str);
    fn set_zoom(&self, level: f64);
    fn find(&self, query: &str);
    fn copy_url(&self);
    fn config_query(&self, id: &str);
    fn dom_ready(&self);
}

pub fn dispatch_inbound(ctx: &dyn BridgeContext, raw: &str) {
    let msg: BridgeMessage = match serde_json::from_str(raw) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to parse inbound bridge message {raw:?}: {e}");
            return;
        }
    };

    match msg {
        BridgeMessage::Navigate { url } => ctx.navigate(&url),
        BridgeMessage::WindowOpen { url, features, nav_type } => {
            let nav_type =
                if nav_type == "new_window" { NavigationType::NewWindow } else { NavigationType::Other };
            ctx.window_open(&url, features.into(), nav_type);
        }
        BridgeMessage::Title { title } => ctx.set_title(&title),
        BridgeMessage::Favicon { url } => ctx.cache_favicon(&url),
        BridgeMessage::ZoomSet { level } => ctx.set_zoom(level),
        BridgeMessage::FindQuery { q } => ctx.find(&q),
        BridgeMessage::CopyUrl {} => ctx.copy_url(),
        BridgeMessage::ConfigQuery { id } => ctx.config_query(&id),
        BridgeMessage::DomReady {} => ctx.dom_ready(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct RecordingContext {
        navigated: RefCell<Option<String>>,
        dom_ready_count: Cell<u32>,
    }

    impl BridgeContext for RecordingContext {
        fn navigate(&self, url: &str) {
            *self.navigated.borrow_mut() = Some(url.to_string());
        }
        fn window_open(&self, _url: &str, _features: WindowFeatures, _nav_type: NavigationType) {}
        fn set_title(&self, _title: &str) {}
        fn cache_favicon(&self, _favicon_url: &str) {}
        fn set_zoom(&self, _level: f64) {}
        fn find(&self, _query: &str) {}
        fn copy_url(&self) {}
        fn config_query(&self, _id: &str) {}
        fn dom_ready(&self) {
            self.dom_ready_count.set(self.dom_ready_count.get() + 1);
        }
    }

    #[test]
    fn queue_drains_in_fifo_order() {
        let queue = InboundQueue::new();
        queue.push(r#"{"type":"dom-ready"}"#.to_string());
        queue.push(r#"{"type":"navigate","url":"https://example.com"}"#.to_string());

        let ctx = RecordingContext { navigated: RefCell::new(None), dom_ready_count: Cell::new(0) };
        queue.drain(|raw| dispatch_inbound(&ctx, raw));

        assert_eq!(ctx.dom_ready_count.get(), 1);
        assert_eq!(ctx.navigated.borrow().as_deref(), Some("https://example.com"));
    }

    #[test]
    fn malformed_message_is_dropped_not_panicked() {
        let queue = InboundQueue::new();
        queue.push("not json".to_string());
        let ctx = RecordingContext { navigated: RefCell::new(None), dom_ready_count: Cell::new(0) };
        queue.drain(|raw| dispatch_inbound(&ctx, raw));
        assert!(ctx.navigated.borrow().is_none());
    }
}
