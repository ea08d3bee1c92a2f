// Builds the single top-level window: title, default size, the Tab
// Manager's widget tree as its child, and the window-level key controller
// that feeds every keypress into the Input Mode Machine.

use std::rc::Rc;

use gtk::prelude::*;

use super::Gui;

pub(super) fn build(gui: &Rc<Gui>) {
    gui.window.set_title(Some("dumber"));
    gui.window.set_default_size(1280, 800);

    {
        let tabs = gui.tabs.borrow();
        gui.window.set_child(Some(tabs.root_widget()));
    }

    let controller = gtk::EventControllerKey::new();
    let g = gui.clone();
    controller.connect_key_pressed(move |_, keyval, _keycode, state| {
        if g.input().handle_key(&g, keyval, state) {
            gtk::glib::Propagation::Stop
        } else {
            gtk::glib::Propagation::Proceed
        }
    });
    gui.window.add_controller(controller);

    gui.window.connect_close_request(move |_w| {
        crate::closing::close();
        gtk::glib::Propagation::Proceed
    });
}
