// PaneShell: the widget wrapping one leaf's WebView, plus the stack title
// bar row shown when the leaf is an inactive member of a Stack. Built
// imperatively -- no `.ui` template.

use gtk::glib;
use gtk::prelude::*;
use gtk::subclass::prelude::ObjectSubclassIsExt;

use crate::com::{PaneId, SignalHolder};

glib::wrapper! {
    pub struct PaneShell(ObjectSubclass<imp::PaneShellPriv>)
        @extends gtk::Box, gtk::Widget,
        @implements gtk::Accessible, gtk::Buildable, gtk::ConstraintTarget, gtk::Orientable;
}

impl PaneShell {
    pub fn new(pane: PaneId, web_view_widget: &gtk::Widget) -> Self {
        let shell: Self = glib::Object::builder().build();
        shell.set_orientation(gtk::Orientation::Vertical);
        shell.set_hexpand(true);
        shell.set_vexpand(true);
        shell.imp().pane.set(Some(pane));

        let (title_bar, label, favicon, close_button) = build_title_bar(pane);
        title_bar.set_visible(false);
        shell.append(&title_bar);
        shell.append(web_view_widget);

        shell.imp().title_bar.replace(Some(title_bar));
        shell.imp().title_label.replace(Some(label));
        shell.imp().favicon.replace(Some(favicon));
        shell.imp().close_button.replace(Some(close_button));
        shell
    }

    pub fn pane_id(&self) -> PaneId {
        self.imp().pane.get().expect("PaneShell always constructed with a pane id")
    }

    pub fn widget(&self) -> &gtk::Widget {
        self.upcast_ref()
    }

    /// Shows the title bar when this leaf is an inactive stack member;
    /// hides it when active or not stacked at all.
    pub fn set_title_bar_visible(&self, visible: bool) {
        if let Some(bar) = self.imp().title_bar.borrow().as_ref() {
            bar.set_visible(visible);
        }
    }

    pub fn set_title(&self, title: &str) {
        if let Some(label) = self.imp().title_label.borrow().as_ref() {
            label.set_label(title);
        }
    }

    pub fn set_favicon(&self, paintable: Option<&gtk::gdk::Texture>) {
        if let Some(image) = self.imp().favicon.borrow().as_ref() {
            match paintable {
                Some(p) => image.set_paintable(Some(p)),
                None => image.set_icon_name(Some("applications-internet")),
            }
        }
    }

    pub fn set_crashed(&self, crashed: bool) {
        if crashed {
            self.add_css_class("pane-crashed");
        } else {
            self.remove_css_class("pane-crashed");
        }
    }

    pub fn connect_close_clicked<F: Fn(PaneId) + 'static>(&self, f: F) {
        let pane = self.pane_id();
        if let Some(button) = self.imp().close_button.borrow().as_ref() {
            let handler = button.connect_clicked(move |_| f(pane));
            self.imp().close_signal.replace(Some(SignalHolder::new(button, handler)));
        }
    }
}

fn build_title_bar(pane: PaneId) -> (gtk::Box, gtk::Label, gtk::Image, gtk::Button) {
    let row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
    row.add_css_class("pane-title-bar");
    row.set_widget_name(&format!("pane-title-{pane}"));

    let favicon = gtk::Image::from_icon_name("applications-internet");
    favicon.set_pixel_size(16);
    row.append(&favicon);

    let label = gtk::Label::new(Some("New Tab"));
    label.set_ellipsize(gtk::pango::EllipsizeMode::End);
    label.set_hexpand(true);
    label.set_xalign(0.0);
    row.append(&label);

    let close_button = gtk::Button::from_icon_name("window-close-symbolic");
    close_button.add_css_class("flat");
    row.append(&close_button);

    // The row itself, not the nested close button, is the declared click
    // target; a gesture controller hit-tests against the button's
    // allocation so a click anywhere else in the row activates the stack
    // member instead.
    let click = gtk::GestureClick::new();
    let button_for_hit_test = close_button.clone();
    click.connect_released(move |gesture, _, x, y| {
        let allocation = button_for_hit_test.allocation();
        let inside = x >= allocation.x() as f64
            && x <= (allocation.x() + allocation.width()) as f64
            && y >= allocation.y() as f64
            && y <= (allocation.y() + allocation.height()) as f64;
        if !inside {
            gesture.set_state(gtk::EventSequenceState::Claimed);
        }
    });
    row.add_controller(click);

    (row, label, favicon, close_button)
}

mod imp {
    use std::cell::{Cell, RefCell};

    use gtk::glib;
    use gtk::subclass::prelude::*;

    use crate::com::{PaneId, SignalHolder};

    #[derive(Default)]
    pub struct PaneShellPriv {
        pub pane: Cell<Option<PaneId>>,
        pub title_bar: RefCell<Option<gtk::Box>>,
        pub title_label: RefCell<Option<gtk::Label>>,
        pub favicon: RefCell<Option<gtk::Image>>,
        pub close_button: RefCell<Option<gtk::Button>>,
        pub close_signal: RefCell<Option<SignalHolder<gtk::Button>>>,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for PaneShellPriv {
        const NAME: &'static str = "DumberPaneShell";
        type Type = super::PaneShell;
        type ParentType = gtk::Box;
    }

    impl ObjectImpl for PaneShellPriv {}
    impl WidgetImpl for PaneShellPriv {}
    impl BoxImpl for PaneShellPriv {}
}
