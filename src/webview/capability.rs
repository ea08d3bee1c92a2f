// §6.1: the WebView capability. The core only ever calls through this
// surface; nothing upstream of it touches `webkit6` types directly except
// the Popup Router and Message Bridge, which are themselves defined purely
// in terms of the signals listed here.

use gtk::prelude::*;
use serde_json::Value;
use webkit6::prelude::*;

use crate::com::WebViewId;
use crate::config::CONFIG;

pub trait WebViewCapability {
    fn id(&self) -> WebViewId;
    fn widget(&self) -> &gtk::Widget;
    fn load_url(&self, url: &str);
    fn stop_loading(&self);
    fn reload(&self, bypass_cache: bool);
    fn go_back(&self);
    fn go_forward(&self);
    fn set_zoom(&self, factor: f64);
    fn current_url(&self) -> Option<String>;
    fn show_dev_tools(&self);
    fn inject_script(&self, src: &str);
    fn find(&self, query: &str);
    fn evaluate(&self, script: &str);
    fn print(&self);
    // Must fulfil the contract that no further signals are delivered for
    // this view once it returns (§4.H step 3).
    fn prepare_teardown(&self);
}

// Concrete `webkit6::WebView`-backed implementation. One per pane.
pub struct WebKitCapability {
    id: WebViewId,
    view: webkit6::WebView,
}

impl WebKitCapability {
    pub fn new(id: WebViewId, context: &webkit6::WebContext) -> Self {
        let manager = webkit6::UserContentManager::new();
        let view = webkit6::WebView::builder()
            .web_context(context)
            .user_content_manager(&manager)
            .build();
        view.set_zoom_level(1.0);
        Self { id, view }
    }

    // Wraps a `webkit6::WebView` WebKitGTK already created for us, via the
    // `create` signal's return value -- used for popups, where the related
    // view is built by the signal handler itself rather than by `new`.
    pub fn wrap(id: WebViewId, view: webkit6::WebView) -> Self {
        Self { id, view }
    }

    pub fn view(&self) -> &webkit6::WebView {
        &self.view
    }

    pub fn user_content_manager(&self) -> Option<webkit6::UserContentManager> {
        self.view.user_content_manager()
    }
}

impl WebViewCapability for WebKitCapability {
    fn id(&self) -> WebViewId {
        self.id
    }

    fn widget(&self) -> &gtk::Widget {
        self.view.upcast_ref()
    }

    fn load_url(&self, url: &str) {
        self.view.load_uri(url);
    }

    fn stop_loading(&self) {
        self.view.stop_loading();
    }

    fn reload(&self, bypass_cache: bool) {
        if bypass_cache {
            self.view.reload_bypass_cache();
        } else {
            self.view.reload();
        }
    }

    fn go_back(&self) {
        self.view.go_back();
    }

    fn go_forward(&self) {
        self.view.go_forward();
    }

    fn set_zoom(&self, factor: f64) {
        self.view.set_zoom_level(factor);
    }

    fn current_url(&self) -> Option<String> {
        self.view.uri().map(|u| u.to_string())
    }

    fn show_dev_tools(&self) {
        if let Some(inspector) = self.view.inspector() {
            inspector.show();
        }
    }

    fn inject_script(&self, src: &str) {
        self.view.evaluate_javascript(src, None, None, gtk::gio::Cancellable::NONE, |_| {});
    }

    fn find(&self, query: &str) {
        if let Some(controller) = self.view.find_controller() {
            controller.search(
                query,
                webkit6::FindOptions::CASE_INSENSITIVE | webkit6::FindOptions::WRAP_AROUND,
                u32::MAX,
            );
        }
    }

    fn evaluate(&self, script: &str) {
        self.view.evaluate_javascript(script, None, None, gtk::gio::Cancellable::NONE, |_| {});
    }

    fn print(&self) {
        webkit6::PrintOperation::new(&self.view).run_dialog(gtk::Window::NONE);
    }

    fn prepare_teardown(&self) {
        self.view.stop_loading();
        self.view.try_close();
    }
}

// Sends a typed outbound message to the page via the same channel the
// Message Bridge receives inbound ones on.
pub fn send_outbound(view: &webkit6::WebView, msg: &crate::com::OutboundMessage) {
    let envelope = msg.to_envelope();
    let script = format!("window.dispatchEvent(new CustomEvent('dumber-message', {{detail: {envelope}}}));");
    view.evaluate_javascript(&script, None, None, gtk::gio::Cancellable::NONE, |_| {});
}

// Applies the seeded zoom for a host before first paint, per spec §8.2
// scenario 6: this must not be recorded as a new user zoom setting.
pub fn seed_zoom(view: &webkit6::WebView, factor: f64) {
    view.set_zoom_level(factor);
}

pub fn zoom_step() -> f64 {
    CONFIG.zoom_step
}

pub fn parse_script_message(value: &Value) -> Option<crate::com::BridgeMessage> {
    serde_json::from_value(value.clone()).ok()
}
