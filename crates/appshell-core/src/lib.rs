//! Appshell Core
//!
//! Bootstrap orchestration for a hosted application shell.
//!
//! This crate provides:
//! - [`behavior`]: dynamic single-inheritance behavior sets with super
//!   dispatch resolved at link time
//! - [`init_queue`]: the deferred-initialization queue drained once, in
//!   (topologically adjusted) registration order, after the module graph
//!   settles
//! - [`poller`]: the bounded-retry readiness state machine
//! - [`bootstrap`]: the orchestrator tying loading, waiting, binding, and
//!   application construction together
//! - [`app`] / [`host`]: the application contract and the host-container
//!   seams (readiness signal, lifecycle events, resize watcher)
//! - [`storage`]: the persistent key-value store available to applications

pub mod app;
pub mod behavior;
pub mod bootstrap;
pub mod host;
pub mod init_queue;
pub mod poller;
pub mod storage;

pub use app::{register_base_app, AppHandle, Application, DynApp, BASE_APP_TYPE};
pub use behavior::{BehaviorError, BehaviorRegistry, Instance, SharedRegistry, Value};
pub use bootstrap::{AppFactory, Bootstrap, BootstrapCtx};
pub use host::{ContainerHost, DesktopHost, HostHooks, LifecycleEvent};
pub use init_queue::{DrainReport, InitQueue};
pub use poller::{PollOutcome, ReadinessPoller};
pub use storage::KeyValueStore;
