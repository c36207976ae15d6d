//! # Sync Tracker: One-Shot "All Managers Present" Notification
//!
//! A [`SyncTracker`] watches the registry for a target set of manager
//! tags and fires a completion notification once every tracked tag has
//! at least one live instance. It fires exactly once per activation and
//! then disarms itself by unsubscribing from the registry.
//!
//! Typical host wiring:
//!
//! ```
//! use std::rc::Rc;
//! use lwms::{ManagerTag, Registry, SyncListener, SyncTracker};
//!
//! struct Bootstrapper;
//! impl SyncListener for Bootstrapper {
//!     fn on_targets_satisfied(&self) { /* start the game */ }
//! }
//!
//! let registry = Registry::default();
//! let tracker = SyncTracker::new();
//! tracker.add_target(ManagerTag::new("audio"));
//! tracker.add_target(ManagerTag::new("input"));
//!
//! let bootstrapper: Rc<dyn SyncListener> = Rc::new(Bootstrapper);
//! tracker.add_listener(Rc::downgrade(&bootstrapper));
//! tracker.initialize(&registry);
//! // ... managers registered later; the bootstrapper fires once both
//! // "audio" and "input" are present.
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::manager::{Manager, ManagerRef, ManagerTag};
use crate::registry::{Registry, RegistryListener};
use crate::store::UniqueStore;

/// The completion capability: called exactly once per tracker
/// activation, after the last missing target tag becomes live.
pub trait SyncListener {
    fn on_targets_satisfied(&self);
}

/// A non-owning completion-listener handle compared by reference
/// identity.
struct SyncListenerRef(Weak<dyn SyncListener>);

impl SyncListenerRef {
    fn upgrade(&self) -> Option<Rc<dyn SyncListener>> {
        self.0.upgrade()
    }

    fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }

    fn data_ptr(&self) -> *const () {
        self.0.as_ptr() as *const ()
    }
}

impl PartialEq for SyncListenerRef {
    fn eq(&self, other: &Self) -> bool {
        self.data_ptr() == other.data_ptr()
    }
}

impl Eq for SyncListenerRef {}

/// Subscription state held only while the tracker is watching.
struct Watch {
    registry: Registry,
    handle: Weak<SyncTracker>,
}

/// An opt-in registry listener that waits for a set of manager tags to
/// all be present at once.
///
/// Targets are intended to be configured before [`SyncTracker::initialize`].
/// Mutating them while watching is permitted; membership is re-evaluated
/// against subsequent registry events. The tracker keeps its target
/// configuration across activations, so a satisfied tracker can be
/// re-armed with another `initialize` call.
pub struct SyncTracker {
    targets: RefCell<UniqueStore<ManagerTag>>,
    matched: RefCell<UniqueStore<ManagerRef>>,
    listeners: RefCell<UniqueStore<SyncListenerRef>>,
    watch: RefCell<Option<Watch>>,
}

impl SyncTracker {
    /// Creates a dormant tracker. The tracker must live behind `Rc` so
    /// the registry can hold a non-owning handle to it while watching.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            targets: RefCell::new(UniqueStore::new()),
            matched: RefCell::new(UniqueStore::new()),
            listeners: RefCell::new(UniqueStore::new()),
            watch: RefCell::new(None),
        })
    }

    /// Adds a tag to the target set.
    ///
    /// # Returns
    /// Whether the tag was added.
    pub fn add_target(&self, tag: ManagerTag) -> bool {
        self.targets.borrow_mut().add(tag)
    }

    /// Removes a tag from the target set.
    ///
    /// # Returns
    /// Whether the tag was removed.
    pub fn remove_target(&self, tag: ManagerTag) -> bool {
        self.targets.borrow_mut().remove(&tag)
    }

    /// Subscribes the given completion listener.
    pub fn add_listener(&self, listener: Weak<dyn SyncListener>) -> bool {
        self.listeners.borrow_mut().add(SyncListenerRef(listener))
    }

    /// Unsubscribes the given completion listener.
    pub fn remove_listener(&self, listener: &Weak<dyn SyncListener>) -> bool {
        self.listeners
            .borrow_mut()
            .remove(&SyncListenerRef(listener.clone()))
    }

    /// Whether the tracker is currently subscribed to the registry.
    pub fn is_watching(&self) -> bool {
        self.watch.borrow().is_some()
    }

    /// Arms the tracker: subscribes to the registry's listener feed and
    /// seeds the matched set from the managers already registered.
    ///
    /// Completion is evaluated immediately, so a target set that is
    /// already satisfied, including an empty one, fires on this call
    /// and the tracker disarms before returning.
    ///
    /// # Returns
    /// Whether the tracker armed (or armed-and-fired). `false` means it
    /// was already watching, or the registry refused the subscription
    /// (disabled configuration).
    pub fn initialize(self: &Rc<Self>, registry: &Registry) -> bool {
        if self.is_watching() {
            debug!("sync tracker already watching");
            return false;
        }

        let handle = Rc::downgrade(self);
        let listener: Weak<dyn RegistryListener> = handle.clone();
        if !registry.add_listener(listener) {
            return false;
        }

        *self.watch.borrow_mut() = Some(Watch {
            registry: registry.clone(),
            handle,
        });

        {
            let targets = self.targets.borrow();
            let mut matched = self.matched.borrow_mut();
            matched.clear();
            for manager in registry.managers() {
                if targets.contains(&manager.tag()) {
                    matched.add(ManagerRef::new(manager));
                }
            }
        }

        debug!(
            targets = self.targets.borrow().len(),
            matched = self.matched.borrow().len(),
            "sync tracker armed"
        );
        self.evaluate();
        true
    }

    /// Disarms the tracker: unsubscribes from the registry and drops
    /// the matched set. The target set and completion listeners are
    /// kept. Invoked automatically when completion fires.
    ///
    /// # Returns
    /// Whether the tracker was watching.
    pub fn deinitialize(&self) -> bool {
        let Some(watch) = self.watch.borrow_mut().take() else {
            return false;
        };
        let listener: Weak<dyn RegistryListener> = watch.handle.clone();
        watch.registry.remove_listener(&listener);
        self.matched.borrow_mut().clear();
        debug!("sync tracker disarmed");
        true
    }

    /// Checks whether every target tag has at least one live match and,
    /// if so, notifies completion listeners in insertion order and
    /// disarms. Listener borrows are released before any callback so
    /// completion handlers may call back into the tracker or registry.
    fn evaluate(&self) {
        let satisfied = {
            let targets = self.targets.borrow();
            let matched = self.matched.borrow();
            targets
                .iter()
                .all(|tag| matched.iter().any(|manager| manager.tag() == *tag))
        };
        if !satisfied {
            return;
        }

        let live: Vec<Rc<dyn SyncListener>> = {
            let mut listeners = self.listeners.borrow_mut();
            listeners.retain(SyncListenerRef::is_live);
            listeners
                .iter()
                .filter_map(SyncListenerRef::upgrade)
                .collect()
        };

        debug!(listeners = live.len(), "required managers synchronized");
        for listener in &live {
            listener.on_targets_satisfied();
        }

        // Disarm so further registry churn cannot re-fire this
        // activation.
        self.deinitialize();
    }
}

impl RegistryListener for SyncTracker {
    fn on_manager_registered(&self, manager: &Rc<dyn Manager>) {
        if !self.is_watching() {
            return;
        }
        if !self.targets.borrow().contains(&manager.tag()) {
            return;
        }
        let inserted = self
            .matched
            .borrow_mut()
            .add(ManagerRef::new(Rc::clone(manager)));
        if inserted {
            self.evaluate();
        }
    }

    fn on_manager_unregistered(&self, manager: &Rc<dyn Manager>) {
        if !self.is_watching() {
            return;
        }
        let removed = self
            .matched
            .borrow_mut()
            .remove(&ManagerRef::new(Rc::clone(manager)));
        if removed {
            self.evaluate();
        }
    }
}
