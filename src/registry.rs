//! # Registry: The Central Manager Directory
//!
//! The registry owns the set of active managers and the set of
//! lifecycle listeners. Hosts add a manager when the component is
//! created and remove it when the component is destroyed; every add and
//! remove first runs the manager's own hook and then notifies all
//! subscribed listeners in their insertion order.
//!
//! ## Handle model
//!
//! [`Registry`] is a cheaply cloneable handle over shared state. There
//! is no hidden global instance: the application's assembly code
//! constructs one registry and passes handle clones to every
//! collaborator. All operations are synchronous and execute to
//! completion on the caller's thread.
//!
//! ## Reentrancy
//!
//! Notifications are direct calls, not queued events. A listener
//! callback may call back into the registry, including removing the
//! manager it was just told about, because the notification loop
//! iterates a snapshot of the listener list rather than holding a
//! borrow across callbacks. Listeners added during a notification pass
//! are not told about the event that was already in flight.
//!
//! ## Observer lifetime
//!
//! Listeners are held as non-owning [`Weak`] handles. Unregistering
//! before dropping an observer is the supported path; handles whose
//! target is gone are pruned during notification snapshots.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RegistryConfig;
use crate::manager::{Manager, ManagerRef, ManagerTag};
use crate::store::UniqueStore;

/// An interface to allow listening to the management system.
/// Notifications are sent out to listeners when a manager is added or
/// removed.
pub trait RegistryListener {
    fn on_manager_registered(&self, manager: &Rc<dyn Manager>);
    fn on_manager_unregistered(&self, manager: &Rc<dyn Manager>);
}

/// The two lifecycle notifications the registry emits, used as a
/// structured log field on every notification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum LifecycleEvent {
    Registered,
    Unregistered,
}

/// A non-owning listener handle compared by reference identity.
struct ListenerRef(Weak<dyn RegistryListener>);

impl ListenerRef {
    fn new(listener: Weak<dyn RegistryListener>) -> Self {
        Self(listener)
    }

    fn upgrade(&self) -> Option<Rc<dyn RegistryListener>> {
        self.0.upgrade()
    }

    fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }

    fn data_ptr(&self) -> *const () {
        self.0.as_ptr() as *const ()
    }
}

impl PartialEq for ListenerRef {
    fn eq(&self, other: &Self) -> bool {
        self.data_ptr() == other.data_ptr()
    }
}

impl Eq for ListenerRef {}

struct RegistryInner {
    config: RegistryConfig,
    managers: RefCell<UniqueStore<ManagerRef>>,
    listeners: RefCell<UniqueStore<ListenerRef>>,
}

/// The central directory of currently active managers and lifecycle
/// listeners.
#[derive(Clone)]
pub struct Registry {
    inner: Rc<RegistryInner>,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                config,
                managers: RefCell::new(UniqueStore::new()),
                listeners: RefCell::new(UniqueStore::new()),
            }),
        }
    }

    /// Whether the management system is enabled by configuration. When
    /// disabled, every operation fails safe: mutations return `false`,
    /// lookups return empty, and a diagnostic is logged. No state is
    /// ever touched.
    pub fn is_enabled(&self) -> bool {
        self.inner.config.enabled
    }

    /// Subscribes the given listener. No notification is fired for
    /// listener changes themselves.
    ///
    /// # Returns
    /// Whether the listener was added.
    pub fn add_listener(&self, listener: Weak<dyn RegistryListener>) -> bool {
        if !self.check_enabled() {
            return false;
        }
        self.inner
            .listeners
            .borrow_mut()
            .add(ListenerRef::new(listener))
    }

    /// Unsubscribes the given listener.
    ///
    /// # Returns
    /// Whether the listener was removed.
    pub fn remove_listener(&self, listener: &Weak<dyn RegistryListener>) -> bool {
        if !self.check_enabled() {
            return false;
        }
        self.inner
            .listeners
            .borrow_mut()
            .remove(&ListenerRef::new(listener.clone()))
    }

    /// Adds a manager to the system.
    ///
    /// On success the manager's [`Manager::on_registered`] hook runs
    /// first, then every current listener is notified in insertion
    /// order.
    ///
    /// # Returns
    /// Whether the manager was added. `false` means the instance was
    /// already present or the system is disabled; no side effect occurs.
    #[tracing::instrument(skip_all, fields(tag = %manager.tag()))]
    pub fn add(&self, manager: Rc<dyn Manager>) -> bool {
        if !self.check_enabled() {
            return false;
        }

        let inserted = self
            .inner
            .managers
            .borrow_mut()
            .add(ManagerRef::new(Rc::clone(&manager)));
        if !inserted {
            debug!("manager already registered");
            return false;
        }

        debug!("manager registered");
        manager.on_registered(self);
        self.notify(LifecycleEvent::Registered, &manager);
        true
    }

    /// Removes a manager from the system.
    ///
    /// On success the manager's [`Manager::on_unregistered`] hook runs
    /// first, then every current listener is notified in insertion
    /// order.
    ///
    /// # Returns
    /// Whether the manager was removed. `false` means the instance was
    /// not present or the system is disabled; no side effect occurs.
    #[tracing::instrument(skip_all, fields(tag = %manager.tag()))]
    pub fn remove(&self, manager: &Rc<dyn Manager>) -> bool {
        if !self.check_enabled() {
            return false;
        }

        let removed = self
            .inner
            .managers
            .borrow_mut()
            .remove(&ManagerRef::new(Rc::clone(manager)));
        if !removed {
            debug!("manager not registered");
            return false;
        }

        debug!("manager unregistered");
        manager.on_unregistered();
        self.notify(LifecycleEvent::Unregistered, manager);
        true
    }

    /// Gets the earliest-inserted manager registered under the given
    /// tag, or `None` if there is none.
    pub fn get_first(&self, tag: ManagerTag) -> Option<Rc<dyn Manager>> {
        if !self.check_enabled() {
            return None;
        }
        self.inner
            .managers
            .borrow()
            .iter()
            .find(|manager| manager.tag() == tag)
            .map(|manager| Rc::clone(manager.get()))
    }

    /// Gets all managers registered under the given tag, in insertion
    /// order.
    pub fn get_all(&self, tag: ManagerTag) -> Vec<Rc<dyn Manager>> {
        if !self.check_enabled() {
            return Vec::new();
        }
        self.inner
            .managers
            .borrow()
            .iter()
            .filter(|manager| manager.tag() == tag)
            .map(|manager| Rc::clone(manager.get()))
            .collect()
    }

    /// Whether the given instance is currently registered.
    pub fn contains(&self, manager: &Rc<dyn Manager>) -> bool {
        if !self.check_enabled() {
            return false;
        }
        self.inner
            .managers
            .borrow()
            .contains(&ManagerRef::new(Rc::clone(manager)))
    }

    /// A snapshot of all currently registered managers, in insertion
    /// order.
    pub fn managers(&self) -> Vec<Rc<dyn Manager>> {
        if !self.check_enabled() {
            return Vec::new();
        }
        self.inner
            .managers
            .borrow()
            .iter()
            .map(|manager| Rc::clone(manager.get()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.managers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.managers.borrow().is_empty()
    }

    fn check_enabled(&self) -> bool {
        if self.inner.config.enabled {
            true
        } else {
            warn!("management system is disabled by configuration");
            false
        }
    }

    /// Notifies every live listener in insertion order. Iterates a
    /// snapshot so callbacks may reenter the registry; dead weak
    /// handles are pruned while the snapshot is taken.
    fn notify(&self, event: LifecycleEvent, manager: &Rc<dyn Manager>) {
        let live: Vec<Rc<dyn RegistryListener>> = {
            let mut listeners = self.inner.listeners.borrow_mut();
            let before = listeners.len();
            listeners.retain(ListenerRef::is_live);
            let pruned = before - listeners.len();
            if pruned > 0 {
                warn!(pruned, "dropped dead listener handles");
            }
            listeners.iter().filter_map(ListenerRef::upgrade).collect()
        };

        debug!(event = %event, listeners = live.len(), tag = %manager.tag(), "notifying listeners");
        for listener in &live {
            match event {
                LifecycleEvent::Registered => listener.on_manager_registered(manager),
                LifecycleEvent::Unregistered => listener.on_manager_unregistered(manager),
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("enabled", &self.inner.config.enabled)
            .finish_non_exhaustive()
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Management system is disabled by configuration")]
    Disabled,
    #[error("Manager already registered: {tag}")]
    AlreadyRegistered { tag: ManagerTag },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    const PROBE_TAG: ManagerTag = ManagerTag::new("probe");
    const OTHER_TAG: ManagerTag = ManagerTag::new("other");

    type Log = Rc<RefCell<Vec<String>>>;

    struct ProbeManager {
        tag: ManagerTag,
        log: Option<Log>,
        registered: Cell<u32>,
        unregistered: Cell<u32>,
    }

    impl ProbeManager {
        fn new(tag: ManagerTag) -> Rc<Self> {
            Rc::new(Self {
                tag,
                log: None,
                registered: Cell::new(0),
                unregistered: Cell::new(0),
            })
        }

        fn with_log(tag: ManagerTag, log: &Log) -> Rc<Self> {
            Rc::new(Self {
                tag,
                log: Some(Rc::clone(log)),
                registered: Cell::new(0),
                unregistered: Cell::new(0),
            })
        }
    }

    impl Manager for ProbeManager {
        fn tag(&self) -> ManagerTag {
            self.tag
        }

        fn on_registered(&self, _registry: &Registry) {
            self.registered.set(self.registered.get() + 1);
            if let Some(log) = &self.log {
                log.borrow_mut().push("hook:registered".into());
            }
        }

        fn on_unregistered(&self) {
            self.unregistered.set(self.unregistered.get() + 1);
            if let Some(log) = &self.log {
                log.borrow_mut().push("hook:unregistered".into());
            }
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    struct RecordingListener {
        label: &'static str,
        log: Log,
    }

    impl RecordingListener {
        fn new(label: &'static str, log: &Log) -> Rc<Self> {
            Rc::new(Self {
                label,
                log: Rc::clone(log),
            })
        }
    }

    impl RegistryListener for RecordingListener {
        fn on_manager_registered(&self, manager: &Rc<dyn Manager>) {
            self.log
                .borrow_mut()
                .push(format!("{}:registered:{}", self.label, manager.tag()));
        }

        fn on_manager_unregistered(&self, manager: &Rc<dyn Manager>) {
            self.log
                .borrow_mut()
                .push(format!("{}:unregistered:{}", self.label, manager.tag()));
        }
    }

    fn as_manager(probe: &Rc<ProbeManager>) -> Rc<dyn Manager> {
        Rc::clone(probe) as Rc<dyn Manager>
    }

    #[test]
    fn test_add_rejects_duplicate_instance() {
        let registry = Registry::default();
        let probe = ProbeManager::new(PROBE_TAG);

        assert!(registry.add(as_manager(&probe)));
        assert!(!registry.add(as_manager(&probe)));
        assert_eq!(registry.len(), 1);
        assert_eq!(probe.registered.get(), 1);
    }

    #[test]
    fn test_distinct_instances_sharing_a_tag_are_allowed() {
        let registry = Registry::default();
        let first = ProbeManager::new(PROBE_TAG);
        let second = ProbeManager::new(PROBE_TAG);

        assert!(registry.add(as_manager(&first)));
        assert!(registry.add(as_manager(&second)));
        assert_eq!(registry.len(), 2);

        let found = registry.get_first(PROBE_TAG).unwrap();
        assert!(Rc::ptr_eq(&found, &as_manager(&first)));
    }

    #[test]
    fn test_remove_missing_reports_false() {
        let registry = Registry::default();
        let probe = ProbeManager::new(PROBE_TAG);

        assert!(!registry.remove(&as_manager(&probe)));
        assert_eq!(probe.unregistered.get(), 0);
    }

    #[test]
    fn test_hooks_bracket_membership_window() {
        let registry = Registry::default();
        let probe = ProbeManager::new(PROBE_TAG);
        let manager = as_manager(&probe);

        registry.add(Rc::clone(&manager));
        registry.remove(&manager);

        assert_eq!(probe.registered.get(), 1);
        assert_eq!(probe.unregistered.get(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_hook_runs_before_listener_notification() {
        let registry = Registry::default();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let listener = RecordingListener::new("l", &log);
        registry.add_listener(Rc::downgrade(&listener) as Weak<dyn RegistryListener>);

        let probe = ProbeManager::with_log(PROBE_TAG, &log);
        registry.add(as_manager(&probe));

        assert_eq!(
            log.borrow().as_slice(),
            ["hook:registered".to_string(), "l:registered:probe".to_string()]
        );
    }

    #[test]
    fn test_listener_notification_follows_insertion_order() {
        let registry = Registry::default();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let first = RecordingListener::new("first", &log);
        let second = RecordingListener::new("second", &log);
        registry.add_listener(Rc::downgrade(&first) as Weak<dyn RegistryListener>);
        registry.add_listener(Rc::downgrade(&second) as Weak<dyn RegistryListener>);

        let probe = ProbeManager::new(PROBE_TAG);
        let manager = as_manager(&probe);
        registry.add(Rc::clone(&manager));
        registry.remove(&manager);

        assert_eq!(
            log.borrow().as_slice(),
            [
                "first:registered:probe".to_string(),
                "second:registered:probe".to_string(),
                "first:unregistered:probe".to_string(),
                "second:unregistered:probe".to_string(),
            ]
        );
    }

    #[test]
    fn test_duplicate_listener_rejected() {
        let registry = Registry::default();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let listener = RecordingListener::new("l", &log);

        assert!(registry.add_listener(Rc::downgrade(&listener) as Weak<dyn RegistryListener>));
        assert!(!registry.add_listener(Rc::downgrade(&listener) as Weak<dyn RegistryListener>));
        assert!(registry.remove_listener(
            &(Rc::downgrade(&listener) as Weak<dyn RegistryListener>)
        ));

        let probe = ProbeManager::new(PROBE_TAG);
        registry.add(as_manager(&probe));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_dropped_listener_is_pruned() {
        let registry = Registry::default();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let listener = RecordingListener::new("gone", &log);
        registry.add_listener(Rc::downgrade(&listener) as Weak<dyn RegistryListener>);
        drop(listener);

        let probe = ProbeManager::new(PROBE_TAG);
        registry.add(as_manager(&probe));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_get_first_and_get_all_match_exact_tag_in_order() {
        let registry = Registry::default();
        let a1 = ProbeManager::new(PROBE_TAG);
        let other = ProbeManager::new(OTHER_TAG);
        let a2 = ProbeManager::new(PROBE_TAG);

        registry.add(as_manager(&a1));
        registry.add(as_manager(&other));
        registry.add(as_manager(&a2));

        let all = registry.get_all(PROBE_TAG);
        assert_eq!(all.len(), 2);
        assert!(Rc::ptr_eq(&all[0], &as_manager(&a1)));
        assert!(Rc::ptr_eq(&all[1], &as_manager(&a2)));

        assert!(registry.get_first(ManagerTag::new("missing")).is_none());
        assert!(registry.get_all(ManagerTag::new("missing")).is_empty());
    }

    #[test]
    fn test_add_then_remove_is_listener_visible_net_zero() {
        let registry = Registry::default();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let listener = RecordingListener::new("l", &log);
        registry.add_listener(Rc::downgrade(&listener) as Weak<dyn RegistryListener>);

        let probe = ProbeManager::new(PROBE_TAG);
        let manager = as_manager(&probe);
        registry.add(Rc::clone(&manager));
        registry.remove(&manager);

        assert!(registry.is_empty());
        assert!(registry.get_first(PROBE_TAG).is_none());
        // Exactly one registered and one unregistered notification, and
        // nothing else.
        assert_eq!(
            log.borrow().as_slice(),
            [
                "l:registered:probe".to_string(),
                "l:unregistered:probe".to_string()
            ]
        );
    }

    /// A listener that calls back into the registry during
    /// notification, removing the manager it was just told about.
    struct EvictingListener {
        registry: Registry,
        log: Log,
    }

    impl RegistryListener for EvictingListener {
        fn on_manager_registered(&self, manager: &Rc<dyn Manager>) {
            self.log.borrow_mut().push("evicting".into());
            self.registry.remove(manager);
        }

        fn on_manager_unregistered(&self, manager: &Rc<dyn Manager>) {
            self.log
                .borrow_mut()
                .push(format!("evicted:{}", manager.tag()));
        }
    }

    #[test]
    fn test_reentrant_removal_during_notification() {
        let registry = Registry::default();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let listener = Rc::new(EvictingListener {
            registry: registry.clone(),
            log: Rc::clone(&log),
        });
        registry.add_listener(Rc::downgrade(&listener) as Weak<dyn RegistryListener>);

        let probe = ProbeManager::new(PROBE_TAG);
        assert!(registry.add(as_manager(&probe)));

        assert!(registry.is_empty());
        assert_eq!(probe.registered.get(), 1);
        assert_eq!(probe.unregistered.get(), 1);
        assert_eq!(
            log.borrow().as_slice(),
            ["evicting".to_string(), "evicted:probe".to_string()]
        );
    }

    #[test]
    fn test_disabled_registry_fails_safe() {
        let registry = Registry::new(RegistryConfig::disabled());
        let probe = ProbeManager::new(PROBE_TAG);
        let manager = as_manager(&probe);

        assert!(!registry.add(Rc::clone(&manager)));
        assert!(!registry.remove(&manager));
        assert!(registry.get_first(PROBE_TAG).is_none());
        assert!(registry.get_all(PROBE_TAG).is_empty());
        assert!(!registry.contains(&manager));
        assert!(registry.managers().is_empty());
        assert_eq!(registry.len(), 0);
        assert_eq!(probe.registered.get(), 0);

        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let listener = RecordingListener::new("l", &log);
        assert!(!registry.add_listener(Rc::downgrade(&listener) as Weak<dyn RegistryListener>));
    }
}
