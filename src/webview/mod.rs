// The WebView capability: a thin wrapper over `webkit6`, plus the two
// components defined purely in terms of its signals (Popup Router, Message
// Bridge) and the `dumb://` scheme it serves.

mod bridge;
mod capability;
mod popup;
mod scheme;

pub use bridge::{dispatch_inbound, BridgeContext, InboundQueue};
pub use capability::{send_outbound, seed_zoom, zoom_step, WebKitCapability, WebViewCapability};
pub use popup::{Placement, PendingPopup, PopupClassification, PopupRouter};
pub use scheme::register_dumb_scheme;
