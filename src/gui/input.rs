// §4.F Input Mode Machine: `Normal | PaneMode | TabMode`, dispatching key
// presses against the three shortcut tables in `CONFIG.shortcuts`. Built the
// same way the teacher parses and looks up its own (flatter) shortcut table
// in the old `shortcut_from_key`/`parse_shortcuts` pair, generalized to three
// tables and a modal timeout.

use std::cell::{Cell, RefCell};
use std::collections::hash_map;
use std::rc::Rc;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use gtk::gdk::{Key, ModifierType};
use gtk::glib;

use crate::com::Direction;
use crate::config::{Shortcut, CONFIG};

use super::Gui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Pane,
    Tab,
}

type ShortcutTable = AHashMap<ModifierType, AHashMap<Key, String>>;

pub(super) struct InputController {
    mode: Cell<Mode>,
    window: ShortcutTable,
    pane_mode: ShortcutTable,
    tab_mode: ShortcutTable,
    last_key: Cell<Option<(Key, ModifierType, Instant)>>,
    mode_timeout: RefCell<Option<glib::SourceId>>,
}

impl InputController {
    pub(super) fn new() -> Self {
        Self {
            mode: Cell::new(Mode::Normal),
            window: parse_shortcuts(&CONFIG.shortcuts.window),
            pane_mode: parse_shortcuts(&CONFIG.shortcuts.pane_mode),
            tab_mode: parse_shortcuts(&CONFIG.shortcuts.tab_mode),
            last_key: Cell::new(None),
            mode_timeout: RefCell::new(None),
        }
    }

    /// Returns `true` if the key was consumed by the Input Mode Machine;
    /// `false` lets the event continue on to the focused WebView.
    pub(super) fn handle_key(&self, gui: &Rc<Gui>, key: Key, state: ModifierType) -> bool {
        let masked = state & !ModifierType::LOCK_MASK;
        let upper = key.to_upper();
        let now = Instant::now();

        if let Some((lk, lm, lt)) = self.last_key.get() {
            if lk == upper
                && lm == masked
                && now.duration_since(lt) < Duration::from_millis(CONFIG.timeouts.key_dedup_ms)
            {
                return true;
            }
        }
        self.last_key.set(Some((upper, masked, now)));

        match self.mode.get() {
            Mode::Normal => self.dispatch_window(gui, upper, masked),
            Mode::Pane => self.dispatch_pane_mode(gui, upper, masked),
            Mode::Tab => self.dispatch_tab_mode(gui, upper, masked),
        }
    }

    fn dispatch_window(&self, gui: &Rc<Gui>, key: Key, mods: ModifierType) -> bool {
        let Some(action) = self.window.get(&mods).and_then(|m| m.get(&key)) else {
            return false;
        };
        self.run_window_action(gui, action);
        true
    }

    fn dispatch_pane_mode(&self, gui: &Rc<Gui>, key: Key, mods: ModifierType) -> bool {
        let Some(action) = self.pane_mode.get(&mods).and_then(|m| m.get(&key)) else {
            // Anything not in the pane-mode table cancels the mode rather
            // than leaking through to the page, matching the modal nature
            // of pane-mode in spec §4.F.
            self.enter_mode(gui, Mode::Normal);
            return true;
        };
        self.run_pane_mode_action(gui, action);
        true
    }

    fn dispatch_tab_mode(&self, gui: &Rc<Gui>, key: Key, mods: ModifierType) -> bool {
        let Some(action) = self.tab_mode.get(&mods).and_then(|m| m.get(&key)) else {
            self.enter_mode(gui, Mode::Normal);
            return true;
        };
        self.run_tab_mode_action(gui, action);
        true
    }

    fn run_window_action(&self, gui: &Rc<Gui>, action: &str) {
        let mut tabs = gui.tabs().borrow_mut();
        let Some(workspace) = tabs.active_tab_mut().map(|t| &mut t.workspace) else { return };

        match action {
            "devtools" => workspace.show_devtools_focused(),
            "omnibox" => workspace.open_omnibox_focused(),
            "find" => workspace.open_find_focused(),
            "zoom-in" => workspace.adjust_focused_zoom(workspace.zoom_step()),
            "zoom-out" => workspace.adjust_focused_zoom(-workspace.zoom_step()),
            "zoom-reset" => workspace.reset_focused_zoom(),
            "reload" => workspace.reload_focused(false),
            "hard-reload" => workspace.reload_focused(true),
            "copy-url" => workspace.copy_focused_url(),
            "print" => workspace.print_focused(),
            "history-back" => workspace.history_back_focused(),
            "history-forward" => workspace.history_forward_focused(),
            "tab-previous" => {
                drop(workspace);
                tabs.previous();
            }
            "tab-next" => {
                drop(workspace);
                tabs.next();
            }
            "tab-mode" => {
                drop(workspace);
                drop(tabs);
                self.enter_mode(gui, Mode::Tab);
            }
            "close-pane" => {
                let focused = workspace.focused();
                let closed_last = workspace.close(focused).is_err();
                if closed_last {
                    drop(workspace);
                    if let Some(tab) = tabs.active_tab() {
                        let id = tab.id;
                        tabs.close_tab(id);
                    }
                }
            }
            "pane-mode" => {
                drop(workspace);
                drop(tabs);
                self.enter_mode(gui, Mode::Pane);
            }
            "neighbor-left" => {
                workspace.navigate(Direction::Left);
            }
            "neighbor-right" => {
                workspace.navigate(Direction::Right);
            }
            "neighbor-up" => {
                workspace.navigate(Direction::Up);
            }
            "neighbor-down" => {
                workspace.navigate(Direction::Down);
            }
            // §4.A: within-stack cycling is just Up/Down neighbor navigation
            // -- `PaneTree::neighbor` already handles active-index cycling
            // for a stack, so there is no separate workspace method.
            "stack-previous" => {
                workspace.navigate(Direction::Up);
            }
            "stack-next" => {
                workspace.navigate(Direction::Down);
            }
            other => warn!("Unrecognized window shortcut action {other:?}"),
        }
    }

    fn run_pane_mode_action(&self, gui: &Rc<Gui>, action: &str) {
        let mut tabs = gui.tabs().borrow_mut();
        let Some(workspace) = tabs.active_tab_mut().map(|t| &mut t.workspace) else {
            self.enter_mode(gui, Mode::Normal);
            return;
        };
        let focused = workspace.focused();

        match action {
            "split-left" => {
                let _ = workspace.split(focused, Direction::Left, "dumb://home");
            }
            "split-right" => {
                let _ = workspace.split(focused, Direction::Right, "dumb://home");
            }
            "split-up" => {
                let _ = workspace.split(focused, Direction::Up, "dumb://home");
            }
            "split-down" => {
                let _ = workspace.split(focused, Direction::Down, "dumb://home");
            }
            "stack" => {
                let _ = workspace.stack(focused, "dumb://home");
            }
            "close" => {
                let closed_last = workspace.close(focused).is_err();
                if closed_last {
                    drop(workspace);
                    if let Some(tab) = tabs.active_tab() {
                        let id = tab.id;
                        tabs.close_tab(id);
                    }
                }
            }
            "confirm" | "cancel" => {}
            other => warn!("Unrecognized pane-mode shortcut action {other:?}"),
        }
        drop(tabs);
        self.enter_mode(gui, Mode::Normal);
    }

    fn run_tab_mode_action(&self, gui: &Rc<Gui>, action: &str) {
        {
            let mut tabs = gui.tabs().borrow_mut();
            match action {
                "new" => {
                    tabs.new_tab("dumb://home");
                }
                "close" => {
                    if let Some(tab) = tabs.active_tab() {
                        let id = tab.id;
                        tabs.close_tab(id);
                    }
                }
                "next" => tabs.next(),
                "previous" => tabs.previous(),
                "cancel" => {}
                other => warn!("Unrecognized tab-mode shortcut action {other:?}"),
            }
        }
        self.enter_mode(gui, Mode::Normal);
    }

    fn enter_mode(&self, gui: &Rc<Gui>, mode: Mode) {
        if let Some(id) = self.mode_timeout.borrow_mut().take() {
            id.remove();
        }
        self.mode.set(mode);
        if mode == Mode::Normal {
            return;
        }

        let g = gui.clone();
        let id = glib::timeout_add_local_once(Duration::from_millis(CONFIG.timeouts.input_mode_ms), move || {
            g.input().expire_mode(mode);
        });
        self.mode_timeout.borrow_mut().replace(id);
    }

    // Called when a modal timeout fires without a cancelling keypress in
    // between; only resets the mode if it's still the one the timeout was
    // scheduled for (a newer `enter_mode` already removed the stale source).
    fn expire_mode(&self, expected: Mode) {
        if self.mode.get() == expected {
            self.mode.set(Mode::Normal);
        }
        self.mode_timeout.borrow_mut().take();
    }
}

fn parse_shortcuts(list: &[Shortcut]) -> ShortcutTable {
    let mut shortcuts: ShortcutTable = AHashMap::new();

    for s in list {
        let mut modifiers = ModifierType::from_bits(0).unwrap();
        if let Some(m) = &s.modifiers {
            let m = m.to_lowercase();
            if m.contains("primary") || m.contains("control") {
                modifiers |= ModifierType::CONTROL_MASK;
            }
            if m.contains("alt") {
                modifiers |= ModifierType::ALT_MASK;
            }
            if m.contains("shift") {
                modifiers |= ModifierType::SHIFT_MASK;
            }
            if m.contains("super") {
                modifiers |= ModifierType::SUPER_MASK;
            }
        }

        let inner = match shortcuts.entry(modifiers) {
            hash_map::Entry::Occupied(inner) => inner.into_mut(),
            hash_map::Entry::Vacant(vacant) => vacant.insert(AHashMap::new()),
        };

        let Some(key) = Key::from_name(&s.key) else {
            warn!("Could not decode configured shortcut key {:?}", s.key);
            continue;
        };
        inner.insert(key.to_upper(), s.action.clone());
    }
    shortcuts
}
