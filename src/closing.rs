// Cooperative shutdown coordination shared between the GUI thread and the
// background manager thread. Neither thread can force the other to stop, so
// both poll or await the same flag.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use gtk::glib;
use tokio::sync::Notify;

use crate::com::GuiAction;

static CLOSED: AtomicBool = AtomicBool::new(false);
static NOTIFY: Notify = Notify::const_new();
static GUI_SENDER: OnceLock<glib::Sender<GuiAction>> = OnceLock::new();

// Called once from main() before either thread can observe a shutdown.
pub fn init(gui_sender: glib::Sender<GuiAction>) {
    GUI_SENDER
        .set(gui_sender)
        .unwrap_or_else(|_| panic!("closing::init called twice"));
}

pub fn closed() -> bool {
    CLOSED.load(Ordering::Acquire)
}

pub fn close() {
    if !CLOSED.swap(true, Ordering::AcqRel) {
        NOTIFY.notify_waiters();
        if let Some(sender) = GUI_SENDER.get() {
            let _ = sender.send(GuiAction::Quit);
        }
    }
}

// Logs the message and closes everything down. Used from panic handlers and
// other paths with no sensible recovery.
pub fn fatal(msg: String) {
    error!("{msg}");
    close();
}

// Resolves once close() has been called. Safe to poll repeatedly; if close()
// already happened this resolves immediately on the next await point.
pub fn closed_fut() -> impl Future<Output = ()> {
    async {
        if closed() {
            return;
        }
        loop {
            let notified = NOTIFY.notified();
            if closed() {
                return;
            }
            notified.await;
            if closed() {
                return;
            }
        }
    }
}

// RAII guard a thread can hold for its whole lifetime so that a panic
// unwinding through it still triggers a clean shutdown of the other thread.
#[derive(Debug, Default)]
pub struct CloseOnDrop;

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_is_idempotent() {
        close();
        close();
        assert!(closed());
    }
}
