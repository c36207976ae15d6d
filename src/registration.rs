//! Scoped manager registration.
//!
//! The host integration contract pairs every component creation with an
//! `add` and every destruction with a `remove`. [`Registration`]
//! reproduces that pairing safely: it adds the manager when constructed
//! and removes it when dropped, so a manager's membership window is its
//! guard's scope.

use std::fmt;
use std::rc::Rc;

use crate::manager::Manager;
use crate::registry::{Registry, RegistryError, RegistryResult};

/// A guard that keeps a manager registered for its own lifetime.
///
/// # Example
///
/// ```
/// use std::any::Any;
/// use std::rc::Rc;
/// use lwms::{Manager, ManagerTag, Registration, Registry};
///
/// struct AudioManager;
/// impl AudioManager {
///     const TAG: ManagerTag = ManagerTag::new("audio");
/// }
/// impl Manager for AudioManager {
///     fn tag(&self) -> ManagerTag {
///         Self::TAG
///     }
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
///
/// let registry = Registry::default();
/// {
///     let _guard = Registration::new(&registry, Rc::new(AudioManager)).unwrap();
///     assert!(registry.get_first(AudioManager::TAG).is_some());
/// }
/// assert!(registry.get_first(AudioManager::TAG).is_none());
/// ```
pub struct Registration {
    registry: Registry,
    manager: Rc<dyn Manager>,
}

impl Registration {
    /// Registers the manager, returning a guard that unregisters it on
    /// drop.
    ///
    /// # Errors
    /// * [`RegistryError::Disabled`] if the system is disabled by
    ///   configuration
    /// * [`RegistryError::AlreadyRegistered`] if this instance is
    ///   already present
    pub fn new(registry: &Registry, manager: Rc<dyn Manager>) -> RegistryResult<Self> {
        if !registry.is_enabled() {
            return Err(RegistryError::Disabled);
        }
        if !registry.add(Rc::clone(&manager)) {
            return Err(RegistryError::AlreadyRegistered {
                tag: manager.tag(),
            });
        }
        Ok(Self {
            registry: registry.clone(),
            manager,
        })
    }

    /// The manager held by this guard.
    pub fn manager(&self) -> &Rc<dyn Manager> {
        &self.manager
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove(&self.manager);
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("tag", &self.manager.tag())
            .finish_non_exhaustive()
    }
}
