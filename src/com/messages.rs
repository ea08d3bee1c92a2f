// Types crossing the gui thread <-> manager thread boundary, plus the wire
// shapes used by the in-page message bridge (§4.I).

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::{PaneId, TabId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn axis(self) -> Orientation {
        match self {
            Self::Left | Self::Right => Orientation::Horizontal,
            Self::Up | Self::Down => Orientation::Vertical,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopupBehavior {
    #[default]
    Split,
    Stacked,
    Tabbed,
    Windowed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlankTargetBehavior {
    #[default]
    Split,
    Stacked,
    Tabbed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationType {
    NewWindow,
    Other,
}

#[derive(Debug, Clone, Default)]
pub struct WindowFeatures {
    pub width: Option<i32>,
    pub height: Option<i32>,
}

// Attaches the originating pane/tab to a manager request so the response can
// be routed back to the right place without the manager thread needing to
// know anything about the tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuiActionContext {
    pub pane: Option<PaneId>,
    pub tab: Option<TabId>,
}

#[derive(Debug)]
pub enum ManagerResponse {
    Zoom(Option<f64>),
    History(Vec<HistoryEntry>),
    TlsDecision(Option<TlsDecision>),
    Stats { total: u64, newest: Option<i64>, oldest: Option<i64> },
}

pub type CommandResponder = oneshot::Sender<ManagerResponse>;
pub type MAWithResponse = (ManagerAction, GuiActionContext, Option<CommandResponder>);

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub url: String,
    pub title: Option<String>,
    pub favicon_url: Option<String>,
    pub last_visited: i64,
    pub visit_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsDecisionKind {
    Once,
    Always,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TlsDecision {
    pub host: String,
    pub cert_sha256: String,
    pub decision: TlsDecisionKind,
    pub expiry: Option<i64>,
}

// Requests the manager thread services. Background work only: favicon
// fetches, persistence reads/writes, keyboard-layout detection. No tree
// mutation ever crosses this boundary.
#[derive(Debug)]
pub enum ManagerAction {
    CacheFavicon { page_url: String, favicon_url: String },
    PersistZoom { host: String, factor: f64 },
    GetZoom { host: String },
    RecordVisit { url: String, title: Option<String>, favicon: Option<String> },
    GetRecent { limit: u32, offset: u32 },
    Search { query: String, limit: u32 },
    Delete { id: i64 },
    GetStats,
    GetTlsDecision { host: String, cert_sha256: String },
    SetTlsDecision(TlsDecision),
    DetectKeyboardLayout,
}

// Results the manager thread pushes back unprompted (as opposed to
// request/response pairs serviced through `CommandResponder`).
#[derive(Debug)]
pub enum GuiAction {
    ZoomSeeded { pane: PaneId, factor: f64 },
    KeyboardLayoutDetected(String),
    PersistenceError(String),
    Quit,
}

// Inbound page -> native messages, tagged by `type` exactly like the JSON the
// in-page bundle actually sends.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BridgeMessage {
    Navigate { url: String },
    WindowOpen { url: String, features: WindowFeaturesWire, nav_type: String },
    Title { title: String },
    Favicon { url: String },
    ZoomSet { level: f64 },
    FindQuery { q: String },
    CopyUrl {},
    ConfigQuery { id: String },
    DomReady {},
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowFeaturesWire {
    pub width: Option<i32>,
    pub height: Option<i32>,
}

impl From<WindowFeaturesWire> for WindowFeatures {
    fn from(w: WindowFeaturesWire) -> Self {
        Self { width: w.width, height: w.height }
    }
}

// Native -> page messages, serialized as `{type, payload}` envelopes via
// `evaluate_javascript`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundMessage {
    Toast { message: String },
    SetSuggestions { items: Vec<String> },
    SeedZoom { factor: f64 },
    ApplyColorScheme { scheme: String },
    OpenFind,
    OpenOmnibox,
    ShortcutForward { action: String },
}

impl OutboundMessage {
    pub fn to_envelope(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            error!("Failed to serialize outbound message: {e}");
            "{}".to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_axis_matches_orientation() {
        assert_eq!(Direction::Left.axis(), Orientation::Horizontal);
        assert_eq!(Direction::Up.axis(), Orientation::Vertical);
    }

    #[test]
    fn direction_opposite_is_involution() {
        for d in [Direction::Left, Direction::Right, Direction::Up, Direction::Down] {
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn bridge_message_parses_navigate() {
        let json = r#"{"type":"navigate","url":"https://example.com"}"#;
        let msg: BridgeMessage = serde_json::from_str(json).unwrap();
        matches!(msg, BridgeMessage::Navigate { .. });
    }

    #[test]
    fn outbound_message_envelope_round_trips_through_json() {
        let msg = OutboundMessage::Toast { message: "hi".into() };
        let envelope = msg.to_envelope();
        let value: serde_json::Value = serde_json::from_str(&envelope).unwrap();
        assert_eq!(value["type"], "toast");
        assert_eq!(value["message"], "hi");
    }
}
