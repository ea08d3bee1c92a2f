// §4.G Tab Manager, the `Tab` side: each Tab owns exactly one Workspace
// (the Pane Tree + Widget Mirror + Focus Manager + Lifecycle Coordinator +
// Popup Router bundle from `pane::mod`).

use std::cell::RefCell;

use gtk::prelude::*;
use tokio::sync::mpsc::UnboundedSender;

use crate::com::{MAWithResponse, PaneId, TabId};

use super::pane::Workspace;

pub struct Tab {
    pub id: TabId,
    pub workspace: Workspace,
    // Explicit rename overrides the focused-leaf-derived title until the
    // next navigation, per §4.G.
    rename: RefCell<Option<String>>,
    last_focused: RefCell<PaneId>,
}

impl Tab {
    pub fn new(
        id: TabId,
        web_context: webkit6::WebContext,
        manager_tx: UnboundedSender<MAWithResponse>,
        initial_url: &str,
    ) -> Self {
        let workspace = Workspace::new(web_context, manager_tx, initial_url);
        let focused = workspace.focused();
        Self { id, workspace, rename: RefCell::new(None), last_focused: RefCell::new(focused) }
    }

    pub fn root_widget(&self) -> &gtk::Box {
        self.workspace.root_widget()
    }

    pub fn rename(&self, title: String) {
        self.rename.replace(Some(title));
    }

    /// Called on navigation; clears a pending explicit rename override.
    pub fn clear_rename_override(&self) {
        self.rename.take();
    }

    /// The displayed tab title: follows the focused leaf's page title
    /// unless an explicit rename is still in effect.
    pub fn display_title(&self) -> String {
        if let Some(title) = self.rename.borrow().clone() {
            return title;
        }
        self.workspace
            .pane(self.workspace.focused())
            .map(|p| p.title.borrow().clone())
            .unwrap_or_else(|| String::from("New Tab"))
    }

    /// Remembers the currently focused leaf so a later tab switch can
    /// restore it (§4.D rule 5).
    pub fn remember_focus(&self) {
        self.last_focused.replace(self.workspace.focused());
    }

    pub fn last_focused(&self) -> PaneId {
        *self.last_focused.borrow()
    }

    pub fn set_visible(&self, visible: bool) {
        self.root_widget().set_visible(visible);
    }
}
