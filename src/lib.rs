//! Appshell
//!
//! A bootstrap layer for modular applications: resolve module ids to asset
//! paths, load a dependency graph idempotently, wait for quiescence on a
//! bounded poll, drain deferred wiring in topological order, then construct
//! and start exactly one application.
//!
//! The workspace splits into:
//! - `appshell-types`: module ids, platform detection, shared constants
//! - `appshell-resolver`: module id to asset path mapping
//! - `appshell-loader`: idempotent async graph loading and the tracker
//! - `appshell-core`: behavior registry, deferred queue, poller, bootstrap
//! - this crate: the JSON module-manifest fetcher and the CLI

pub mod manifest;

pub use appshell_core::{
    register_base_app, AppHandle, Application, Bootstrap, BootstrapCtx, ContainerHost,
    DesktopHost, DynApp, HostHooks, KeyValueStore, BASE_APP_TYPE,
};
pub use appshell_loader::{LoadTracker, ModuleFetcher, ModuleLoader, ModuleSource};
pub use appshell_resolver::{PathResolver, ResolvedAsset};
pub use appshell_types::{LoadStats, LoadStatus, ModuleId, Platform};

pub use manifest::{FsModuleFetcher, ModuleManifest};
