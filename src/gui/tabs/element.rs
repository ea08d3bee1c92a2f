// §4.G Tab Manager: the tab-strip row widget. One per Tab, shown in the
// window's tab bar; clicking it calls back into the Tab Manager to switch.

use gtk::glib;
use gtk::prelude::*;
use gtk::subclass::prelude::ObjectSubclassIsExt;

use crate::com::TabId;

glib::wrapper! {
    pub struct TabElement(ObjectSubclass<imp::TabElementPriv>)
        @extends gtk::Box, gtk::Widget,
        @implements gtk::Accessible, gtk::Buildable, gtk::ConstraintTarget, gtk::Orientable;
}

impl TabElement {
    pub fn new(tab: TabId, title: &str) -> Self {
        let element: Self = glib::Object::builder().build();
        element.set_orientation(gtk::Orientation::Horizontal);
        element.add_css_class("tab-strip-item");
        element.imp().tab.set(Some(tab));

        let label = gtk::Label::new(Some(title));
        label.set_ellipsize(gtk::pango::EllipsizeMode::End);
        label.set_hexpand(true);
        label.set_xalign(0.0);
        element.append(&label);

        let close_button = gtk::Button::from_icon_name("window-close-symbolic");
        close_button.add_css_class("flat");
        element.append(&close_button);

        element.imp().label.replace(Some(label));
        element.imp().close_button.replace(Some(close_button));
        element
    }

    pub fn tab_id(&self) -> TabId {
        self.imp().tab.get().expect("TabElement always constructed with a tab id")
    }

    pub fn set_title(&self, title: &str) {
        if let Some(label) = self.imp().label.borrow().as_ref() {
            label.set_label(title);
        }
    }

    pub fn set_active(&self, active: bool) {
        if active {
            self.add_css_class("active-tab");
        } else {
            self.remove_css_class("active-tab");
        }
    }

    pub fn connect_activated<F: Fn(TabId) + 'static>(&self, f: F) {
        let tab = self.tab_id();
        let click = gtk::GestureClick::new();
        click.connect_released(move |_, _, _, _| f(tab));
        self.add_controller(click);
    }

    pub fn connect_close_clicked<F: Fn(TabId) + 'static>(&self, f: F) {
        let tab = self.tab_id();
        if let Some(button) = self.imp().close_button.borrow().as_ref() {
            button.connect_clicked(move |_| f(tab));
        }
    }
}

mod imp {
    use std::cell::{Cell, RefCell};

    use gtk::glib;
    use gtk::subclass::prelude::*;

    use crate::com::TabId;

    #[derive(Default)]
    pub struct TabElementPriv {
        pub tab: Cell<Option<TabId>>,
        pub label: RefCell<Option<gtk::Label>>,
        pub close_button: RefCell<Option<gtk::Button>>,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for TabElementPriv {
        const NAME: &'static str = "DumberTabElement";
        type Type = super::TabElement;
        type ParentType = gtk::Box;
    }

    impl ObjectImpl for TabElementPriv {}
    impl WidgetImpl for TabElementPriv {}
    impl BoxImpl for TabElementPriv {}
}
