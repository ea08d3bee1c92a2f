// §4.G Tab Manager: an ordered list of Tabs plus `active_tab_index`. Only
// the active tab's widget subtree is attached to the root container; a
// switch detaches the outgoing subtree and attaches the incoming one.

pub mod element;
pub mod pane;
pub mod tab;

use tokio::sync::mpsc::UnboundedSender;

use gtk::prelude::*;

use crate::com::{MAWithResponse, PaneId, TabId, WebViewId};

use self::element::TabElement;
use self::pane::Workspace;
use self::tab::Tab;

pub struct TabEntry {
    pub tab: Tab,
    pub strip_item: TabElement,
}

pub struct TabManager {
    root: gtk::Box,
    strip: gtk::Box,
    tabs: Vec<TabEntry>,
    active: usize,
    web_context: webkit6::WebContext,
    manager_tx: UnboundedSender<MAWithResponse>,
}

impl TabManager {
    pub fn new(web_context: webkit6::WebContext, manager_tx: UnboundedSender<MAWithResponse>) -> Self {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 0);
        let strip = gtk::Box::new(gtk::Orientation::Horizontal, 2);
        strip.add_css_class("tab-strip");
        root.append(&strip);
        Self { root, strip, tabs: Vec::new(), active: 0, web_context, manager_tx }
    }

    pub fn root_widget(&self) -> &gtk::Box {
        &self.root
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.tabs.get(self.active).map(|e| &e.tab)
    }

    pub fn active_tab_mut(&mut self) -> Option<&mut Tab> {
        self.tabs.get_mut(self.active).map(|e| &mut e.tab)
    }

    pub fn find(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|e| e.tab.id == id).map(|e| &e.tab)
    }

    /// §4.G `new_tab`.
    pub fn new_tab(&mut self, initial_url: &str) -> TabId {
        let id = TabId::next();
        let tab = Tab::new(id, self.web_context.clone(), self.manager_tx.clone(), initial_url);
        let strip_item = TabElement::new(id, "New Tab");
        strip_item.connect_activated(|clicked| {
            crate::gui::with_gui(|g| g.tabs().borrow_mut().switch_to(clicked));
        });
        strip_item.connect_close_clicked(|clicked| {
            crate::gui::with_gui(|g| g.tabs().borrow_mut().close_tab(clicked));
        });
        self.strip.append(&strip_item);

        tab.root_widget().set_visible(false);
        self.root.append(tab.root_widget());

        self.tabs.push(TabEntry { tab, strip_item });
        let new_index = self.tabs.len() - 1;
        self.activate(new_index);
        id
    }

    fn activate(&mut self, index: usize) {
        if let Some(current) = self.tabs.get(self.active) {
            current.tab.remember_focus();
            current.tab.set_visible(false);
            current.strip_item.set_active(false);
        }
        self.active = index;
        if let Some(entry) = self.tabs.get(index) {
            entry.tab.set_visible(true);
            entry.strip_item.set_active(true);
        }
    }

    /// §4.G `close_tab`: closing the last tab closes the window, signaled
    /// by returning `false`.
    pub fn close_tab(&mut self, id: TabId) -> bool {
        let Some(index) = self.tabs.iter().position(|e| e.tab.id == id) else {
            return true;
        };
        if self.tabs.len() == 1 {
            return false;
        }

        let entry = self.tabs.remove(index);
        entry.tab.root_widget().unparent();
        entry.strip_item.unparent();

        if self.active >= self.tabs.len() {
            self.active = self.tabs.len() - 1;
        } else if index < self.active {
            self.active -= 1;
        }
        let next_active = self.active;
        self.activate(next_active);
        true
    }

    /// §4.G `next`.
    pub fn next(&mut self) {
        if self.tabs.is_empty() {
            return;
        }
        let next = (self.active + 1) % self.tabs.len();
        self.activate(next);
    }

    /// §4.G `previous`.
    pub fn previous(&mut self) {
        if self.tabs.is_empty() {
            return;
        }
        let prev = (self.active + self.tabs.len() - 1) % self.tabs.len();
        self.activate(prev);
    }

    /// §4.G `switch_to`.
    pub fn switch_to(&mut self, id: TabId) {
        if let Some(index) = self.tabs.iter().position(|e| e.tab.id == id) {
            self.activate(index);
        }
    }

    /// §4.G `rename`.
    pub fn rename(&self, id: TabId, title: String) {
        if let Some(entry) = self.tabs.iter().find(|e| e.tab.id == id) {
            entry.strip_item.set_title(&title);
            entry.tab.rename(title);
        }
    }

    /// Pushes the focused leaf's page title into the tab strip, called
    /// whenever a title-change bridge message arrives for the active tab's
    /// focused pane.
    pub fn refresh_title(&self, id: TabId) {
        if let Some(entry) = self.tabs.iter().find(|e| e.tab.id == id) {
            entry.strip_item.set_title(&entry.tab.display_title());
        }
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn focused_pane(&self) -> Option<PaneId> {
        self.active_tab().map(|t| t.workspace.focused())
    }

    /// Signal handlers only ever carry a `PaneId`/`WebViewId`, never a tab;
    /// these scan every tab's Workspace to find the one that owns it.
    pub fn workspace_for_pane(&mut self, pane: PaneId) -> Option<&mut Workspace> {
        self.tabs.iter_mut().find(|e| e.tab.workspace.pane(pane).is_some()).map(|e| &mut e.tab.workspace)
    }

    pub fn workspace_for_pending_popup(&mut self, view: WebViewId) -> Option<&mut Workspace> {
        self.tabs.iter_mut().find(|e| e.tab.workspace.has_pending_popup(view)).map(|e| &mut e.tab.workspace)
    }

    pub fn tab_for_pane(&self, pane: PaneId) -> Option<TabId> {
        self.tabs.iter().find(|e| e.tab.workspace.pane(pane).is_some()).map(|e| e.tab.id)
    }

    pub fn tabs_iter(&self) -> impl Iterator<Item = &Tab> {
        self.tabs.iter().map(|e| &e.tab)
    }
}
