//! Appshell Loader
//!
//! Asynchronous module load tracking.
//!
//! This crate provides:
//! - [`LoadTracker`]: process-shared counters with the at-most-once request
//!   guarantee and the quiescence predicate
//! - [`ModuleLoader`]: fire-and-forget fetch issuance over a
//!   [`ModuleFetcher`], following each loaded module's declared requires
//!
//! The fetch itself is an external collaborator behind the [`ModuleFetcher`]
//! trait; the loader only observes completion. A fetch that never returns
//! never contributes to quiescence and is caught only by the readiness
//! poller's overall retry budget.

pub mod loader;
pub mod tracker;

pub use loader::{ModuleFetcher, ModuleLoader, ModuleSource};
pub use tracker::LoadTracker;
