// Shared types crossing the manager/gui thread boundary, plus the
// identifiers and error taxonomy used throughout the workspace engine.

use std::fmt;

use derive_more::{Deref, DerefMut, From};
use gtk::glib::{Object, SignalHandlerId};
use gtk::prelude::{IsA, ObjectExt};

pub use self::error::*;
pub use self::ids::*;
pub use self::messages::*;

mod error;
mod ids;
mod messages;

#[derive(Deref, Default, DerefMut, From)]
pub struct DebugIgnore<T>(pub T);

impl<T> fmt::Debug for DebugIgnore<T> {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Result::Ok(())
    }
}

// Makes sure to disconnect a signal handler when the rust object drops.
// This isn't necessary when connecting to widgets that will dispose of all their connectors when
// they are disposed of.
#[derive(Debug)]
pub struct SignalHolder<T: IsA<Object>>(T, Option<SignalHandlerId>);

impl<T: IsA<Object>> Drop for SignalHolder<T> {
    fn drop(&mut self) {
        self.0.disconnect(self.1.take().unwrap());
    }
}

impl<T: IsA<Object>> SignalHolder<T> {
    pub fn new(obj: &T, id: SignalHandlerId) -> Self {
        Self(obj.clone(), Some(id))
    }
}
