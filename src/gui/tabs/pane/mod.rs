// §4.A-§4.E, §4.H: a Workspace ties the Pane Tree, Widget Mirror, Focus
// Manager, Lifecycle Coordinator and Popup Router together into the single
// object a Tab owns.

pub mod element;
pub mod focus;
pub mod lifecycle;
pub mod mirror;
pub mod quiescence;
pub mod tree;

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use gtk::glib;
use gtk::prelude::*;
use tokio::sync::mpsc::UnboundedSender;

use crate::com::{
    Direction, GuiActionContext, MAWithResponse, ManagerAction, ManagerResponse, NavigationType,
    NodeId, PaneId, WebViewId, WindowFeatures,
};
use crate::webview::{
    dispatch_inbound, seed_zoom, send_outbound, zoom_step, BridgeContext, InboundQueue, PendingPopup,
    Placement, PopupClassification, PopupRouter, WebKitCapability, WebViewCapability,
};

use self::element::PaneShell;
use self::focus::{FocusManager, FocusRequest};
use self::lifecycle::LifecycleCoordinator;
use self::mirror::{Edit, WidgetMirror};
use self::tree::{CloseOutcome, PaneTree, SplitOutcome, StackOutcome, TreeError};

// Best-effort host extraction for per-host zoom/history keys; an
// unparseable URL (e.g. `dumb://home`) has no persisted zoom.
fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string))
}

pub struct Pane {
    pub id: PaneId,
    pub web_view: WebKitCapability,
    pub shell: PaneShell,
    pub inbound: std::rc::Rc<InboundQueue>,
    pub title: RefCell<String>,
    pub url: RefCell<Option<String>>,
}

pub struct Workspace {
    tree: PaneTree,
    mirror: WidgetMirror,
    focus: FocusManager,
    lifecycle: LifecycleCoordinator,
    popups: PopupRouter,
    panes: AHashMap<PaneId, Pane>,
    view_to_pane: AHashMap<WebViewId, PaneId>,
    web_context: webkit6::WebContext,
    manager_tx: UnboundedSender<MAWithResponse>,
}

impl Workspace {
    pub fn new(
        web_context: webkit6::WebContext,
        manager_tx: UnboundedSender<MAWithResponse>,
        initial_url: &str,
    ) -> Self {
        let first_pane_id = PaneId::next();
        let tree = PaneTree::new(first_pane_id);
        let mut workspace = Self {
            tree,
            mirror: WidgetMirror::new(),
            focus: FocusManager::new(first_pane_id),
            lifecycle: LifecycleCoordinator::new(),
            popups: PopupRouter::new(),
            panes: AHashMap::new(),
            view_to_pane: AHashMap::new(),
            web_context,
            manager_tx,
        };
        let node = workspace.tree.find_leaf(first_pane_id).expect("just inserted");
        let capability = WebKitCapability::new(WebViewId::next(), &workspace.web_context);
        let shell = workspace.build_pane(first_pane_id, capability, initial_url);
        workspace.mirror.apply(Edit::InsertLeaf { node, parent: None, shell });
        workspace
    }

    pub fn root_widget(&self) -> &gtk::Box {
        self.mirror.root_widget()
    }

    pub fn focused(&self) -> PaneId {
        self.focus.current()
    }

    // Builds everything a pane needs regardless of how it enters the tree --
    // capability, shell, signal wiring, lifecycle/view tracking -- and
    // returns its shell for the caller to hand to the Widget Mirror. Does
    // not touch the tree or the mirror itself.
    fn build_pane(&mut self, id: PaneId, capability: WebKitCapability, url: &str) -> PaneShell {
        let view_id = capability.id();
        let shell = PaneShell::new(id, capability.widget());
        let inbound = InboundQueue::new();
        wire_webview_signals(capability.view(), id, inbound.clone());

        let pane = Pane {
            id,
            web_view: capability,
            shell: shell.clone(),
            inbound,
            title: RefCell::new(String::from("New Tab")),
            url: RefCell::new(Some(url.to_string())),
        };
        pane.web_view.load_url(url);
        self.lifecycle.track(id);
        self.view_to_pane.insert(view_id, id);
        self.panes.insert(id, pane);
        self.seed_zoom_for(id, url);
        shell
    }

    // §8.2 scenario 6: apply the persisted zoom for this host before first
    // paint, without recording it as a fresh user setting.
    fn seed_zoom_for(&self, id: PaneId, url: &str) {
        let Some(host) = host_of(url) else { return };
        let Some(pane) = self.panes.get(&id) else { return };
        let view = pane.web_view.view().clone();
        let (responder, receiver) = tokio::sync::oneshot::channel();
        let ctx = GuiActionContext { pane: Some(id), tab: None };
        let _ = self.manager_tx.send((ManagerAction::GetZoom { host }, ctx, Some(responder)));
        gtk::glib::MainContext::default().spawn_local(async move {
            if let Ok(ManagerResponse::Zoom(Some(factor))) = receiver.await {
                seed_zoom(&view, factor);
            }
        });
    }

    /// §4.A `split` + §4.D rule 3: new pane takes focus.
    pub fn split(&mut self, target: PaneId, direction: Direction, url: &str) -> Result<PaneId, TreeError> {
        let new_pane = PaneId::next();
        let outcome = self.tree.split(target, direction, new_pane)?;
        self.apply_split_outcome(new_pane, outcome, url);
        self.focus.on_new_pane(new_pane);
        Ok(new_pane)
    }

    /// §4.A `stack` + §4.D rule 4.
    pub fn stack(&mut self, target: PaneId, url: &str) -> Result<PaneId, TreeError> {
        let new_pane = PaneId::next();
        let outcome = self.tree.stack(target, new_pane)?;
        self.apply_stack_outcome(new_pane, outcome, url);
        self.focus.on_new_pane(new_pane);
        Ok(new_pane)
    }

    // Provisions the new leaf's WebView and registers it with the mirror,
    // then wraps it and the pre-existing leaf in the new split produced by
    // `tree.split`. `replaced_container` is only set when the split pulled a
    // leaf out of a stack, which the mirror does not fully re-render (known
    // limitation, see the grounding ledger).
    fn apply_split_outcome(&mut self, new_pane: PaneId, outcome: SplitOutcome, url: &str) {
        let capability = WebKitCapability::new(WebViewId::next(), &self.web_context);
        let shell = self.build_pane(new_pane, capability, url);
        self.mirror.apply(Edit::RegisterLeaf { node: outcome.new_leaf_node, shell });
        self.mirror.apply(Edit::InsertSplit {
            node: outcome.split_node,
            orientation: outcome.orientation,
            ratio: outcome.ratio,
            left: outcome.left,
            right: outcome.right,
        });
    }

    fn apply_stack_outcome(&mut self, new_pane: PaneId, outcome: StackOutcome, url: &str) {
        let capability = WebKitCapability::new(WebViewId::next(), &self.web_context);
        let shell = self.build_pane(new_pane, capability, url);
        match outcome {
            StackOutcome::Fresh { stack_node, existing_leaf, new_leaf } => {
                self.mirror.apply(Edit::RegisterLeaf { node: new_leaf, shell });
                self.mirror.apply(Edit::InsertStack { node: stack_node, existing_leaf, new_leaf });
            }
            StackOutcome::MemberAdded { stack_node, new_leaf } => {
                self.mirror.apply(Edit::InsertLeaf { node: new_leaf, parent: Some(stack_node), shell });
            }
        }
    }

    /// §4.H teardown protocol for a single pane.
    pub fn close(&mut self, target: PaneId) -> Result<CloseOutcome, TreeError> {
        self.lifecycle.begin_teardown(target);
        if let Some(pane) = self.panes.get(&target) {
            self.view_to_pane.retain(|_, p| *p != target);
            self.lifecycle.retire_view(pane.web_view.id());
            pane.web_view.prepare_teardown();
        }

        let node = self.tree.find_leaf(target);
        let (outcome, mirror_info) = self.tree.close(target)?;
        if let Some(node) = node {
            self.mirror.apply(Edit::RemoveSubtree { node });
        }
        match mirror_info {
            tree::MirrorCloseInfo::Promoted { removed_container, promoted_node } => {
                self.mirror.apply(Edit::PromoteChild { removed_container, promoted_node });
            }
            tree::MirrorCloseInfo::StackShrunk { stack_node, active_node } => {
                self.mirror.apply(Edit::SetStackActive { node: stack_node, child: active_node });
            }
            tree::MirrorCloseInfo::StackDegenerated { removed_container, remaining_node } => {
                self.mirror.apply(Edit::DegenerateStack { removed_container, remaining_node });
            }
        }

        self.panes.remove(&target);
        self.lifecycle.finish_teardown(target);
        self.focus.on_close(target, outcome);
        Ok(outcome)
    }

    /// §4.A `neighbor` + §4.D keyboard-initiated navigation, throttled.
    pub fn navigate(&mut self, direction: Direction) -> Option<PaneId> {
        let from = self.focus.current();
        let target = self.tree.neighbor(from, direction)?;
        if self.focus.request(FocusRequest::Unconditional(target)) {
            if let Some(pane) = self.panes.get(&target) {
                pane.shell.widget().grab_focus();
            }
        }
        Some(target)
    }

    pub fn pane(&self, id: PaneId) -> Option<&Pane> {
        self.panes.get(&id)
    }

    pub fn leaves(&self) -> Vec<PaneId> {
        self.tree.leaves()
    }

    /// Drains every pane's inbound message queue; call once per GUI tick.
    pub fn drain_inbound(&self) {
        for pane in self.panes.values() {
            let ctx = PaneBridgeContext { pane, tx: &self.manager_tx };
            pane.inbound.drain(|raw| dispatch_inbound(&ctx, raw));
        }
    }

    /// §4.E: handles a WebView `create` signal. The signal handler itself is
    /// responsible for building the related `webkit6::WebView` (WebKitGTK's
    /// contract for `create` is that the handler returns the new view); this
    /// just decides whether the intent survives classification and, if so,
    /// reserves bookkeeping under `new_id` for the later `ready_to_show`.
    pub fn register_popup_intent(
        &mut self,
        parent: PaneId,
        new_id: WebViewId,
        url: &str,
        features: WindowFeatures,
        nav_type: NavigationType,
    ) -> Option<Placement> {
        let classification = self.popups.classify(parent, url, &features, nav_type);
        let placement = match classification {
            PopupClassification::Drop => return None,
            // §4.E rule 2: oauth popups open in a new pane sized per
            // `workspace.popups.placement`; the sizing itself is a GTK-side
            // concern applied when the pane's widget is realized.
            PopupClassification::OAuthPopup => Placement::Split,
            PopupClassification::Placement(p) => p,
        };
        self.popups.register_pending(new_id, parent, placement);
        Some(placement)
    }

    /// §4.E: handles the deferred `ready_to_show` signal, actually
    /// inserting the pane per the placement decided at create time. `view`
    /// is the same `webkit6::WebView` the `create` handler built and
    /// returned to WebKitGTK.
    pub fn finish_popup(&mut self, id: WebViewId, view: webkit6::WebView, url: &str) {
        let Some(PendingPopup { parent, placement, .. }) = self.popups.take_ready(id) else {
            return;
        };
        let capability = WebKitCapability::wrap(id, view);
        let new_pane = PaneId::next();
        let shell = PaneShell::new(new_pane, capability.widget());
        let inbound = InboundQueue::new();
        wire_webview_signals(capability.view(), new_pane, inbound.clone());
        let pane = Pane {
            id: new_pane,
            web_view: capability,
            shell: shell.clone(),
            inbound,
            title: RefCell::new(String::from("New Tab")),
            url: RefCell::new(Some(url.to_string())),
        };
        let view_id = pane.web_view.id();
        self.lifecycle.track(new_pane);
        self.view_to_pane.insert(view_id, new_pane);
        self.panes.insert(new_pane, pane);

        match placement {
            Placement::Split | Placement::Tabbed | Placement::Windowed => {
                // Tab/window-level placement is handled by the Tab Manager;
                // the workspace only knows about pane-level placement, so
                // both of those fall back to a plain split here.
                if let Ok(outcome) = self.tree.split(parent, Direction::Right, new_pane) {
                    self.mirror.apply(Edit::RegisterLeaf { node: outcome.new_leaf_node, shell });
                    self.mirror.apply(Edit::InsertSplit {
                        node: outcome.split_node,
                        orientation: outcome.orientation,
                        ratio: outcome.ratio,
                        left: outcome.left,
                        right: outcome.right,
                    });
                }
            }
            Placement::Stacked => {
                if let Ok(outcome) = self.tree.stack(parent, new_pane) {
                    match outcome {
                        StackOutcome::Fresh { stack_node, existing_leaf, new_leaf } => {
                            self.mirror.apply(Edit::RegisterLeaf { node: new_leaf, shell });
                            self.mirror.apply(Edit::InsertStack { node: stack_node, existing_leaf, new_leaf });
                        }
                        StackOutcome::MemberAdded { stack_node, new_leaf } => {
                            self.mirror.apply(Edit::InsertLeaf {
                                node: new_leaf,
                                parent: Some(stack_node),
                                shell,
                            });
                        }
                    }
                }
            }
        }
        self.focus.on_new_pane(new_pane);
    }

    /// §4.H stale signal guard: callers check this before acting on any
    /// signal carrying a WebViewId.
    pub fn is_stale(&self, view: WebViewId) -> bool {
        self.lifecycle.is_stale(view)
    }

    /// §4.H crash containment.
    pub fn mark_crashed(&mut self, pane_id: PaneId) {
        self.lifecycle.mark_crashed(pane_id);
        self.apply_crashed_css(pane_id, true);
    }

    pub fn reload_crashed(&mut self, pane_id: PaneId) {
        self.apply_crashed_css(pane_id, false);
        if let Some(pane) = self.panes.get(&pane_id) {
            if let Some(url) = pane.url.borrow().as_deref() {
                pane.web_view.load_url(url);
            }
        }
        self.lifecycle.mark_reloaded(pane_id);
    }

    // §8.1: crash styling is a CSS-class mutation, so it must honor a
    // leaf's post-reparent quiescence window rather than race a pending
    // split/stack restyle. If the leaf is currently quiescent the mutation
    // is deferred to fire once the window closes instead of being dropped.
    fn apply_crashed_css(&self, pane_id: PaneId, crashed: bool) {
        let Some(pane) = self.panes.get(&pane_id) else { return };
        let shell = pane.shell.clone();
        if let Some(node) = self.tree.find_leaf(pane_id) {
            if let Some(remaining) = self.mirror.quiescent_remaining(node) {
                glib::timeout_add_local_once(remaining, move || shell.set_crashed(crashed));
                return;
            }
        }
        shell.set_crashed(crashed);
    }

    pub fn pane_for_view(&self, view: WebViewId) -> Option<PaneId> {
        self.view_to_pane.get(&view).copied()
    }

    pub fn has_pending_popup(&self, id: WebViewId) -> bool {
        self.popups.pending_popups.contains_key(&id)
    }

    // §6 keyboard shortcuts that act on the focused pane's WebView directly,
    // bypassing the message bridge (no page-side JS is involved).

    fn set_zoom(&self, id: PaneId, factor: f64) {
        let Some(pane) = self.panes.get(&id) else { return };
        pane.web_view.set_zoom(factor);
        if let Some(host) = pane.url.borrow().as_deref().and_then(host_of) {
            let ctx = GuiActionContext { pane: Some(id), tab: None };
            let _ = self.manager_tx.send((ManagerAction::PersistZoom { host, factor }, ctx, None));
        }
    }

    pub fn adjust_focused_zoom(&self, delta: f64) {
        let id = self.focused();
        let Some(pane) = self.panes.get(&id) else { return };
        let next = (pane.web_view.view().zoom_level() + delta).clamp(0.25, 5.0);
        self.set_zoom(id, next);
    }

    pub fn reset_focused_zoom(&self) {
        let id = self.focused();
        self.set_zoom(id, 1.0);
    }

    pub fn zoom_step(&self) -> f64 {
        zoom_step()
    }

    pub fn reload_focused(&self, bypass_cache: bool) {
        if let Some(pane) = self.panes.get(&self.focused()) {
            pane.web_view.reload(bypass_cache);
        }
    }

    pub fn history_back_focused(&self) {
        if let Some(pane) = self.panes.get(&self.focused()) {
            pane.web_view.go_back();
        }
    }

    pub fn history_forward_focused(&self) {
        if let Some(pane) = self.panes.get(&self.focused()) {
            pane.web_view.go_forward();
        }
    }

    pub fn show_devtools_focused(&self) {
        if let Some(pane) = self.panes.get(&self.focused()) {
            pane.web_view.show_dev_tools();
        }
    }

    pub fn copy_focused_url(&self) {
        if let Some(pane) = self.panes.get(&self.focused()) {
            if let Some(url) = pane.url.borrow().clone() {
                copy_to_clipboard(&url);
            }
        }
    }

    pub fn open_find_focused(&self) {
        if let Some(pane) = self.panes.get(&self.focused()) {
            send_outbound(pane.web_view.view(), &crate::com::OutboundMessage::OpenFind);
        }
    }

    pub fn open_omnibox_focused(&self) {
        if let Some(pane) = self.panes.get(&self.focused()) {
            send_outbound(pane.web_view.view(), &crate::com::OutboundMessage::OpenOmnibox);
        }
    }

    pub fn print_focused(&self) {
        if let Some(pane) = self.panes.get(&self.focused()) {
            pane.web_view.print();
        }
    }

    // Periodic maintenance: called from the GUI's idle tick alongside
    // `drain_inbound` to drop any popup intent that never reached
    // `ready_to_show` within the configured timeout.
    pub fn expire_stale_popups(&mut self) {
        self.popups.expire_stale();
    }
}

// Implements the §4.I message-bridge effects in terms of one pane, for
// things the Workspace owns outright (navigation, zoom, find); requests
// that need the manager thread (favicon persistence, zoom persistence) are
// forwarded over the channel without waiting for a response.
struct PaneBridgeContext<'a> {
    pane: &'a Pane,
    tx: &'a UnboundedSender<MAWithResponse>,
}

impl PaneBridgeContext<'_> {
    fn send(&self, action: ManagerAction) {
        let ctx = GuiActionContext { pane: Some(self.pane.id), tab: None };
        let _ = self.tx.send((action, ctx, None));
    }
}

impl BridgeContext for PaneBridgeContext<'_> {
    fn navigate(&self, url: &str) {
        *self.pane.url.borrow_mut() = Some(url.to_string());
        let title = self.pane.title.borrow().clone();
        self.send(ManagerAction::RecordVisit { url: url.to_string(), title: Some(title), favicon: None });
    }

    fn window_open(&self, _url: &str, _features: WindowFeatures, _nav_type: NavigationType) {
        // Handled by the Popup Router via the WebView's native `create`
        // signal, not via this JS-originated message, per §4.E.
    }

    fn set_title(&self, title: &str) {
        *self.pane.title.borrow_mut() = title.to_string();
        self.pane.shell.set_title(title);
    }

    fn cache_favicon(&self, favicon_url: &str) {
        let page_url = self.pane.url.borrow().clone().unwrap_or_default();
        self.send(ManagerAction::CacheFavicon { page_url, favicon_url: favicon_url.to_string() });
    }

    fn set_zoom(&self, level: f64) {
        self.pane.web_view.set_zoom(level);
        if let Some(host) = self.pane.url.borrow().as_deref().and_then(host_of_opt) {
            self.send(ManagerAction::PersistZoom { host, factor: level });
        }
    }

    fn find(&self, query: &str) {
        self.pane.web_view.find(query);
    }

    fn copy_url(&self) {
        if let Some(url) = self.pane.url.borrow().clone() {
            copy_to_clipboard(&url);
        }
    }

    fn config_query(&self, _id: &str) {}

    fn dom_ready(&self) {}
}

fn host_of_opt(url: &str) -> Option<String> {
    host_of(url)
}

fn copy_to_clipboard(text: &str) {
    if let Some(display) = gtk::gdk::Display::default() {
        display.clipboard().set_text(text);
    }
}

// Wires the signals every pane's WebView needs regardless of how it was
// created: inbound bridge messages, popup creation/auto-close, and crash
// containment. Looked-up state lives behind the GUI thread-local singleton
// since the Workspace that owns this pane is borrowed mutably from there.
fn wire_webview_signals(view: &webkit6::WebView, pane_id: PaneId, inbound: Rc<InboundQueue>) {
    if let Some(manager) = view.user_content_manager() {
        manager.register_script_message_handler("dumber", None);
        manager.connect_script_message_received(Some("dumber"), move |_m, js_result| {
            if let Some(raw) = js_result.js_value().and_then(|v| v.to_json(0).map(|s| s.to_string())) {
                inbound.push(raw);
            }
        });
    }

    // §4.E: WebKitGTK's `create` signal makes the handler responsible for
    // building and returning the related view, so classification happens
    // before the view even exists; only an accepted intent gets one built.
    view.connect_create(move |opener, nav_action| {
        let url = nav_action.request().and_then(|r| r.uri()).map(|u| u.to_string()).unwrap_or_default();
        let features = WindowFeatures::default();
        let nav_type = NavigationType::Other;
        let new_id = WebViewId::next();

        crate::gui::with_gui(|g| g.register_popup_intent(pane_id, new_id, &url, features, nav_type))
            .flatten()?;

        let context = opener.context()?;
        let manager = webkit6::UserContentManager::new();
        let related = webkit6::WebView::builder()
            .web_context(&context)
            .related_view(opener)
            .user_content_manager(&manager)
            .build();

        related.connect_ready_to_show(move |v| {
            let shown_url = v.uri().map(|u| u.to_string()).unwrap_or_default();
            crate::gui::with_gui(|g| g.finish_popup(new_id, v.clone(), &shown_url));
        });

        Some(related.upcast::<gtk::Widget>())
    });

    view.connect_close(move |_v| {
        crate::gui::with_gui(|g| g.handle_pane_webview_closed(pane_id));
    });

    view.connect_web_process_terminated(move |_v, _reason| {
        crate::gui::with_gui(|g| g.handle_pane_crashed(pane_id));
    });
}

// re-exported so callers elsewhere in gui/ only need `pane::{..}`.
pub use self::tree::PaneNode;
pub use crate::webview::send_outbound as send_pane_outbound;
