// Error taxonomy for the workspace engine. The teacher crate hand-rolls its
// error wrappers rather than pulling in thiserror, so this does the same.

use std::fmt;

#[derive(Debug)]
pub enum CoreError {
    InvalidInput(String),
    InvariantViolation(String),
    WebViewFailure { pane: super::PaneId, detail: String },
    PersistenceTransient(String),
    ConfigInvalid(String),
    NetworkAssetMissing(String),
    TlsUntrusted { host: String, cert_sha256: String },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
            Self::WebViewFailure { pane, detail } => {
                write!(f, "webview failure on {pane}: {detail}")
            }
            Self::PersistenceTransient(msg) => write!(f, "persistence error: {msg}"),
            Self::ConfigInvalid(msg) => write!(f, "invalid config: {msg}"),
            Self::NetworkAssetMissing(path) => write!(f, "asset not found: {path}"),
            Self::TlsUntrusted { host, cert_sha256 } => {
                write!(f, "untrusted certificate for {host} ({cert_sha256})")
            }
        }
    }
}

impl std::error::Error for CoreError {}

// How a given error should reach the user, per spec §7's propagation policy.
#[derive(Debug, PartialEq, Eq)]
pub enum ErrorAction {
    Toast(String),
    Log,
    Modal(String),
    Abort,
}

pub fn handle_ui_error(err: CoreError) -> ErrorAction {
    let action = match &err {
        CoreError::InvalidInput(_) => ErrorAction::Log,
        CoreError::InvariantViolation(_) => {
            if cfg!(debug_assertions) {
                ErrorAction::Abort
            } else {
                ErrorAction::Log
            }
        }
        CoreError::WebViewFailure { .. } => ErrorAction::Toast(err.to_string()),
        CoreError::PersistenceTransient(_) => ErrorAction::Toast(err.to_string()),
        CoreError::ConfigInvalid(_) => ErrorAction::Toast(err.to_string()),
        CoreError::NetworkAssetMissing(_) => ErrorAction::Log,
        CoreError::TlsUntrusted { .. } => ErrorAction::Modal(err.to_string()),
    };

    match &action {
        ErrorAction::Abort => error!("fatal: {err}"),
        ErrorAction::Log => warn!("{err}"),
        ErrorAction::Toast(_) | ErrorAction::Modal(_) => debug!("{err}"),
    }

    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::com::PaneId;

    #[test]
    fn invalid_input_logs_and_does_not_abort() {
        let action = handle_ui_error(CoreError::InvalidInput("pane not found".into()));
        assert_eq!(action, ErrorAction::Log);
    }

    #[test]
    fn webview_failure_becomes_toast() {
        let err = CoreError::WebViewFailure { pane: PaneId::next(), detail: "crashed".into() };
        match handle_ui_error(err) {
            ErrorAction::Toast(_) => {}
            other => panic!("expected toast, got {other:?}"),
        }
    }

    #[test]
    fn tls_untrusted_becomes_modal() {
        let err =
            CoreError::TlsUntrusted { host: "example.com".into(), cert_sha256: "abcd".into() };
        assert!(matches!(handle_ui_error(err), ErrorAction::Modal(_)));
    }
}
