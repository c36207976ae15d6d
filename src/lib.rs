//! # LWMS: Lightweight Management System
//!
//! LWMS is a runtime service registry for component-based application
//! hosts: a central directory where independently-created "manager"
//! objects register themselves, can be looked up by tag, and can be
//! observed for lifecycle events.
//!
//! ## Architecture
//!
//! The system is built from four small pieces, leaves first:
//!
//! - Unique stores ([`store`]): insertion-ordered collections enforcing
//!   uniqueness, backing every list in the system
//! - Manager capability ([`manager`]): the tag type and the hook trait
//!   a registrable component implements
//! - Registry ([`registry`]): the central directory with its
//!   change-notification and tag-indexed-lookup machinery
//! - Sync tracker ([`sync`]): an opt-in listener that fires a one-shot
//!   notification once a target set of manager tags is fully live
//!
//! The host integration contract lives in [`registration`]: a scoped
//! guard that registers a manager on construction and unregisters it on
//! drop, pairing membership with component lifetime. Configuration
//! ([`config`]) and error types ([`error`]) round out the crate.
//!
//! ## Control Flow
//!
//! ```text
//! host creates manager → Registry::add → manager hook → listener notifications
//!                                                            ↓
//!                                       SyncTracker re-evaluates its target set
//!                                                            ↓
//!                                 fires completion once, then disarms itself
//! ```
//!
//! ## Execution Model
//!
//! Everything is single-threaded, synchronous, and reentrant:
//! notifications are direct in-order calls on the caller's thread, and
//! a callback may safely call back into the registry because
//! notification loops iterate snapshots. There is no global instance:
//! the application constructs one [`registry::Registry`] and passes
//! handle clones to its collaborators.
//!
//! ## Quick Start
//!
//! ```
//! use std::any::Any;
//! use std::rc::Rc;
//! use lwms::{Manager, ManagerTag, Registry};
//!
//! struct ScoreManager;
//! impl ScoreManager {
//!     const TAG: ManagerTag = ManagerTag::new("score");
//! }
//! impl Manager for ScoreManager {
//!     fn tag(&self) -> ManagerTag {
//!         Self::TAG
//!     }
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//! }
//!
//! let registry = Registry::default();
//! let score: Rc<dyn Manager> = Rc::new(ScoreManager);
//! assert!(registry.add(Rc::clone(&score)));
//! assert!(registry.get_first(ScoreManager::TAG).is_some());
//! assert!(registry.remove(&score));
//! assert!(registry.get_first(ScoreManager::TAG).is_none());
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod registration;
pub mod registry;
pub mod store;
pub mod sync;

// Re-exports
pub use config::RegistryConfig;
pub use error::{CoreResult, Error};
pub use manager::{Manager, ManagerRef, ManagerTag};
pub use registration::Registration;
pub use registry::{LifecycleEvent, Registry, RegistryError, RegistryListener, RegistryResult};
pub use store::UniqueStore;
pub use sync::{SyncListener, SyncTracker};
