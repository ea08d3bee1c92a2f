// The GUI thread's entry point and the `Gui` singleton it hangs everything
// off of. `Gui` owns the single top-level window, the Tab Manager (and
// through it every Workspace/Pane), the database handle, and the channel
// back to the manager thread.

mod input;
mod main_window;
pub mod tabs;

use std::cell::{Cell, OnceCell};
use std::rc::Rc;
use std::time::Duration;

use gtk::gdk;
use gtk::gio::ApplicationFlags;
use gtk::glib;
use gtk::prelude::*;
use tokio::sync::mpsc::UnboundedSender;

use crate::com::{GuiAction, MAWithResponse, NavigationType, PaneId, WebViewId, WindowFeatures};
use crate::config::OPTIONS;
use crate::database::DBCon;
use crate::closing;
use crate::webview::{self, Placement};

use self::input::InputController;
use self::tabs::TabManager;

thread_local!(static GUI: OnceCell<Rc<Gui>> = OnceCell::default());

// Runs `f` with the live `Gui`, if one has been constructed on this thread.
// WebView signal closures only carry the ids they were created with, not a
// reference to the Workspace that owns them, so this is how they reach back
// into the owning state.
pub(crate) fn with_gui<R>(f: impl FnOnce(&Rc<Gui>) -> R) -> Option<R> {
    GUI.with(|cell| cell.get().map(f))
}

pub struct Gui {
    window: gtk::ApplicationWindow,
    tabs: std::cell::RefCell<TabManager>,
    database: DBCon,
    input: InputController,
    manager_sender: Rc<UnboundedSender<MAWithResponse>>,
}

pub fn run(manager_sender: UnboundedSender<MAWithResponse>, gui_receiver: glib::Receiver<GuiAction>) {
    let application =
        gtk::Application::new(Some("net.dumber.Browser"), ApplicationFlags::HANDLES_COMMAND_LINE);

    let manager_sender = Rc::new(manager_sender);
    let gui_receiver = Cell::new(Some(gui_receiver));

    application.connect_activate(move |a| {
        let provider = gtk::CssProvider::new();
        provider.load_from_data(include_str!("style.css"));
        gtk::style_context_add_provider_for_display(
            &gdk::Display::default().expect("no default display"),
            &provider,
            gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
        Gui::new(a, manager_sender.clone(), &gui_receiver);
    });

    // Same hack the teacher uses around gio's exclusive command-line
    // handling: without a primary-instance flag we just re-dispatch to
    // activate on every invocation.
    application.connect_command_line(|a, _| {
        if GUI.with(|g| g.get().is_none()) {
            a.activate();
        }
        0
    });

    let _cod = closing::CloseOnDrop;
    application.run();
}

impl Gui {
    fn new(
        application: &gtk::Application,
        manager_sender: Rc<UnboundedSender<MAWithResponse>>,
        gui_receiver: &Cell<Option<glib::Receiver<GuiAction>>>,
    ) -> Rc<Self> {
        let window = gtk::ApplicationWindow::new(application);

        let web_context = webkit6::WebContext::new();
        webview::register_dumb_scheme(&web_context);

        let tabs = TabManager::new(web_context, (*manager_sender).clone());

        let rc = Rc::new(Self {
            window,
            tabs: std::cell::RefCell::new(tabs),
            database: DBCon::connect(),
            input: InputController::new(),
            manager_sender,
        });

        GUI.with(|cell| cell.set(rc.clone()).ok().expect("Gui::new called twice"));

        let g = rc.clone();
        application.connect_shutdown(move |_a| {
            g.database.destroy();
            closing::close();
        });

        rc.setup();
        rc.attach_gui_receiver(gui_receiver);
        rc
    }

    fn setup(self: &Rc<Self>) {
        self::main_window::build(self);

        let startup_url = OPTIONS.browse.clone().unwrap_or_else(|| String::from("dumb://home"));
        self.tabs.borrow_mut().new_tab(&startup_url);

        self.window.set_visible(true);

        // §4.B focus throttle and popup-pending expiry both need a steady
        // tick independent of any one WebView's own signal traffic.
        let g = self.clone();
        glib::timeout_add_local(Duration::from_millis(50), move || {
            g.tick();
            glib::ControlFlow::Continue
        });
    }

    fn attach_gui_receiver(self: &Rc<Self>, gui_receiver: &Cell<Option<glib::Receiver<GuiAction>>>) {
        let g = self.clone();
        gui_receiver
            .take()
            .expect("gui::run invoked twice")
            .attach(None, move |action| g.handle_update(action));
    }

    // Drains every pane's inbound bridge queue and expires stale popup
    // intents; a fixed-interval poll is simpler and plenty fast relative to
    // human interaction than hooking every possible mutation path.
    fn tick(self: &Rc<Self>) {
        let mut tabs = self.tabs.borrow_mut();
        for tab in tabs.tabs_iter() {
            tab.workspace.drain_inbound();
        }
        if let Some(workspace) = tabs.active_tab_mut().map(|t| &mut t.workspace) {
            workspace.expire_stale_popups();
        }
    }

    fn handle_update(self: &Rc<Self>, action: GuiAction) -> glib::ControlFlow {
        match action {
            GuiAction::ZoomSeeded { .. } => {}
            GuiAction::KeyboardLayoutDetected(_) => {}
            GuiAction::PersistenceError(msg) => {
                error!("Persistence error from manager thread: {msg}");
            }
            GuiAction::Quit => {
                self.window.close();
                closing::close();
                return glib::ControlFlow::Break;
            }
        }
        glib::ControlFlow::Continue
    }

    pub(crate) fn send_manager(&self, val: MAWithResponse) {
        if let Err(e) = self.manager_sender.send(val) {
            if !closing::closed() {
                error!("Sending to manager unexpectedly failed: {e}");
                closing::close();
                self.window.close();
            }
        }
    }

    pub(crate) fn input(&self) -> &InputController {
        &self.input
    }

    pub(crate) fn tabs(&self) -> &std::cell::RefCell<TabManager> {
        &self.tabs
    }

    // §4.E: classifies a popup intent against the Workspace that owns its
    // opener pane. Called from the opener's `create` signal handler.
    pub(crate) fn register_popup_intent(
        &self,
        parent: PaneId,
        new_id: WebViewId,
        url: &str,
        features: WindowFeatures,
        nav_type: NavigationType,
    ) -> Option<Placement> {
        self.tabs.borrow_mut().workspace_for_pane(parent)?.register_popup_intent(parent, new_id, url, features, nav_type)
    }

    // §4.E: the deferred half, called from the popup WebView's own
    // `ready_to_show` signal once WebKitGTK is ready to display it.
    pub(crate) fn finish_popup(&self, id: WebViewId, view: webkit6::WebView, url: &str) {
        if let Some(workspace) = self.tabs.borrow_mut().workspace_for_pending_popup(id) {
            workspace.finish_popup(id, view, url);
        }
    }

    // §4.H: a pane's own WebView emitted `close` (JS `window.close()`, or a
    // popup's natural lifecycle end). Tear the pane down the same way an
    // explicit close-pane shortcut would, falling back to closing the tab if
    // it was the workspace's last pane.
    pub(crate) fn handle_pane_webview_closed(&self, pane_id: PaneId) {
        let mut tabs = self.tabs.borrow_mut();
        let Some(tab_id) = tabs.tab_for_pane(pane_id) else { return };
        if let Some(workspace) = tabs.workspace_for_pane(pane_id) {
            if workspace.close(pane_id).is_err() {
                drop(workspace);
                tabs.close_tab(tab_id);
            }
        }
    }

    // §4.H crash containment: the WebView's renderer process died.
    pub(crate) fn handle_pane_crashed(&self, pane_id: PaneId) {
        let mut tabs = self.tabs.borrow_mut();
        if let Some(workspace) = tabs.workspace_for_pane(pane_id) {
            workspace.mark_crashed(pane_id);
        }
    }
}
