// Opaque monotonically-minted identifiers shared between the manager and gui
// threads. None of these carry a lifetime; lookups into the tree's indices
// return `Option`, never a dangling reference.

use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! monotonic_id {
    ($name:ident, $counter:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        static $counter: AtomicU64 = AtomicU64::new(1);

        impl $name {
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

monotonic_id!(PaneId, NEXT_PANE_ID);
monotonic_id!(NodeId, NEXT_NODE_ID);
monotonic_id!(TabId, NEXT_TAB_ID);
monotonic_id!(WebViewId, NEXT_WEBVIEW_ID);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_monotonic() {
        let a = PaneId::next();
        let b = PaneId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn distinct_id_kinds_have_independent_counters() {
        // Not a correctness requirement, just documents that each macro
        // invocation gets its own static counter.
        let _ = PaneId::next();
        let _ = NodeId::next();
    }
}
