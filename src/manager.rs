//! Manager capability and identity.
//!
//! A manager is an opaque unit of application logic that registers under
//! an explicit [`ManagerTag`]. Tags replace runtime type introspection:
//! every manager reports its tag at construction and all registry
//! lookups are keyed by exact-tag match. Manager identity, by contrast,
//! is reference identity: two distinct instances may share a tag, and
//! the registry stores and compares them by pointer.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::registry::Registry;

/// The lookup key a manager registers under.
///
/// Tags are cheap copyable handles over a static name. Equality is value
/// equality on the name, so two managers constructed with the same tag
/// are considered the same kind by every lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManagerTag(&'static str);

impl ManagerTag {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ManagerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// The capability a registrable manager implements.
///
/// The registry calls [`Manager::on_registered`] and
/// [`Manager::on_unregistered`] exactly once each, in that order,
/// bracketing the manager's membership window. The registration hook
/// runs before any listener is notified, so the manager can finish its
/// own setup before observers react to it.
pub trait Manager: Any {
    /// The tag this manager registers under.
    fn tag(&self) -> ManagerTag;

    /// Called when the manager has been inserted into the registry. The
    /// registry handle is passed so the manager can look up peers or
    /// subscribe its own listeners.
    fn on_registered(&self, _registry: &Registry) {}

    /// Called when the manager has been removed from the registry.
    fn on_unregistered(&self) {}

    /// Host-side downcasting support for consumers that hold a
    /// `Rc<dyn Manager>` returned from a lookup.
    fn as_any(&self) -> &dyn Any;
}

/// A manager handle compared by reference identity.
///
/// The registry's stores must treat two handles as equal only when they
/// point at the very same instance, so equality compares the data
/// pointers rather than any value.
#[derive(Clone)]
pub struct ManagerRef(Rc<dyn Manager>);

impl ManagerRef {
    pub fn new(manager: Rc<dyn Manager>) -> Self {
        Self(manager)
    }

    pub fn get(&self) -> &Rc<dyn Manager> {
        &self.0
    }

    pub fn tag(&self) -> ManagerTag {
        self.0.tag()
    }

    fn data_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for ManagerRef {
    fn eq(&self, other: &Self) -> bool {
        self.data_ptr() == other.data_ptr()
    }
}

impl Eq for ManagerRef {}

impl fmt::Debug for ManagerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerRef")
            .field("tag", &self.tag())
            .field("ptr", &self.data_ptr())
            .finish()
    }
}
