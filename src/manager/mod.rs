use std::future::Future;
use std::thread::JoinHandle;
use std::time::Duration;

use gtk::glib;
use tokio::select;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::LocalSet;
use tokio::time::timeout;

use crate::com::{
    CommandResponder, GuiAction, GuiActionContext, MAWithResponse, ManagerAction, ManagerResponse,
};
use crate::database::DBCon;
use crate::{closing, spawn_thread};

// Background worker thread: favicon/persistence writes, history reads, TLS
// decision lookups, keyboard-layout detection. Everything that touches the
// Pane Tree, Widget Mirror or focus state stays on the gui thread (§5); this
// thread only ever reaches the database and, eventually, the network.
struct Manager {
    gui_sender: glib::Sender<GuiAction>,
    db: DBCon,
    action_context: GuiActionContext,
}

pub fn run(
    manager_receiver: UnboundedReceiver<MAWithResponse>,
    gui_sender: glib::Sender<GuiAction>,
) -> JoinHandle<()> {
    spawn_thread("manager", move || {
        let _cod = closing::CloseOnDrop;
        let m = Manager::new(gui_sender);
        run_local(m.run(manager_receiver));
        trace!("Exited manager thread");
    })
}

#[tokio::main(flavor = "current_thread")]
async fn run_local(f: impl Future<Output = ()>) {
    let local = LocalSet::new();
    local.run_until(f).await;

    if let Err(e) = timeout(Duration::from_secs(10), local).await {
        error!("Unable to finish cleaning up manager tasks in {e}, something is stuck.");
    }
}

impl Manager {
    fn new(gui_sender: glib::Sender<GuiAction>) -> Self {
        Self { gui_sender, db: DBCon::connect(), action_context: GuiActionContext::default() }
    }

    async fn run(mut self, mut receiver: UnboundedReceiver<MAWithResponse>) {
        loop {
            select! {
                biased;
                _ = closing::closed_fut() => break,
                mtg = receiver.recv() => {
                    let Some((action, context, responder)) = mtg else {
                        error!("Received nothing from gui thread. This should never happen");
                        closing::close();
                        break;
                    };
                    self.action_context = context;
                    self.handle_action(action, responder);
                }
            }
        }

        self.db.destroy();
    }

    fn handle_action(&mut self, action: ManagerAction, responder: Option<CommandResponder>) {
        use ManagerAction::*;

        let result = match action {
            CacheFavicon { page_url, favicon_url } => {
                self.db.update_favicon(&page_url, &favicon_url).err().map(|e| e.to_string())
            }
            PersistZoom { host, factor } => {
                self.db.set_zoom(&host, factor).err().map(|e| e.to_string())
            }
            GetZoom { host } => {
                return self.respond(responder, self.db.get_zoom(&host), ManagerResponse::Zoom);
            }
            RecordVisit { url, title, favicon } => self
                .db
                .record_visit(&url, title.as_deref(), favicon.as_deref())
                .err()
                .map(|e| e.to_string()),
            GetRecent { limit, offset } => {
                return self.respond(
                    responder,
                    self.db.get_recent(limit, offset),
                    ManagerResponse::History,
                );
            }
            Search { query, limit } => {
                return self.respond(
                    responder,
                    self.db.search(&query, limit),
                    ManagerResponse::History,
                );
            }
            Delete { id } => self.db.delete(id).err().map(|e| e.to_string()),
            GetStats => {
                return self.respond(responder, self.db.get_stats(), |(total, newest, oldest)| {
                    ManagerResponse::Stats { total, newest, oldest }
                });
            }
            GetTlsDecision { host, cert_sha256 } => {
                return self.respond(
                    responder,
                    self.db.get_tls_decision(&host, &cert_sha256),
                    ManagerResponse::TlsDecision,
                );
            }
            SetTlsDecision(decision) => {
                self.db.set_tls_decision(&decision).err().map(|e| e.to_string())
            }
            DetectKeyboardLayout => {
                self.send_gui(GuiAction::KeyboardLayoutDetected(detect_keyboard_layout()));
                None
            }
        };

        if let Some(e) = result {
            error!("Persistence error handling manager action: {e}");
            self.send_gui(GuiAction::PersistenceError(e));
        }
    }

    fn respond<T>(
        &self,
        responder: Option<CommandResponder>,
        result: rusqlite::Result<T>,
        into: impl FnOnce(T) -> ManagerResponse,
    ) {
        match result {
            Ok(value) => {
                if let Some(responder) = responder {
                    if responder.send(into(value)).is_err() {
                        debug!("Gui thread dropped a manager response receiver");
                    }
                }
            }
            Err(e) => {
                error!("Persistence error handling manager action: {e}");
                self.send_gui(GuiAction::PersistenceError(e.to_string()));
            }
        }
    }

    fn send_gui(&self, action: GuiAction) {
        if let Err(e) = self.gui_sender.send(action) {
            error!("Sending to gui thread unexpectedly failed, {e:?}");
            closing::close();
        }
    }
}

// Keyboard-layout detection is an external concern (XKB/locale lookup); the
// workspace engine only needs a best-effort label to seed IME-sensitive
// shortcuts, so this stands in with the process locale.
fn detect_keyboard_layout() -> String {
    std::env::var("LANG").unwrap_or_else(|_| "en_US".to_string())
}
