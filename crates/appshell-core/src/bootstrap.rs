//! Bootstrap orchestration.
//!
//! `Bootstrap::start` runs the whole sequence: subscribe to the host's
//! ready signal, request the application's root module, poll until the
//! module graph settles (or the budget fails open), drain the deferred
//! queue, construct the application exactly once, then wire resize and
//! lifecycle forwarding.
//!
//! All cross-component state lives in [`BootstrapCtx`], which is passed
//! explicitly to everything that needs it. Two bootstraps in one process
//! never share state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use appshell_loader::{LoadTracker, ModuleFetcher, ModuleLoader};
use appshell_resolver::PathResolver;
use appshell_types::{ModuleId, POLL_TICK_INTERVAL};

use crate::app::{register_base_app, AppHandle, Application};
use crate::behavior::{BehaviorRegistry, SharedRegistry};
use crate::host::{spawn_resize_watcher, HostHooks, LifecycleEvent};
use crate::init_queue::InitQueue;
use crate::poller::{PollOutcome, ReadinessPoller};
use crate::storage::KeyValueStore;

/// Builds the application once the module graph has settled. A module's
/// wiring installs this during the drain.
pub type AppFactory = Box<dyn FnOnce(&SharedRegistry) -> Result<Box<dyn Application>> + Send>;

/// Shared state for one bootstrap run: the load tracker, the deferred
/// queue, the host-ready flag, and the pending application factory.
pub struct BootstrapCtx {
    tracker: Arc<LoadTracker>,
    queue: Arc<InitQueue>,
    storage: Arc<KeyValueStore>,
    device_ready: AtomicBool,
    app_factory: Mutex<Option<AppFactory>>,
}

impl BootstrapCtx {
    /// Context with an in-memory key-value store.
    pub fn new() -> Arc<Self> {
        Self::with_storage(Arc::new(KeyValueStore::new()))
    }

    /// Context backed by the given key-value store; the base application
    /// behavior set exposes it to applications.
    pub fn with_storage(storage: Arc<KeyValueStore>) -> Arc<Self> {
        Arc::new(Self {
            tracker: Arc::new(LoadTracker::new()),
            queue: Arc::new(InitQueue::new()),
            storage,
            device_ready: AtomicBool::new(false),
            app_factory: Mutex::new(None),
        })
    }

    pub fn storage(&self) -> &Arc<KeyValueStore> {
        &self.storage
    }

    pub fn tracker(&self) -> &Arc<LoadTracker> {
        &self.tracker
    }

    pub fn queue(&self) -> &Arc<InitQueue> {
        &self.queue
    }

    pub fn device_ready(&self) -> bool {
        self.device_ready.load(Ordering::SeqCst)
    }

    pub fn set_device_ready(&self) {
        self.device_ready.store(true, Ordering::SeqCst);
    }

    /// Install the factory the bootstrap will use to construct the
    /// application. Later installs replace earlier ones; the last module
    /// to define the application wins, which redefinition semantics
    /// already allow.
    pub fn set_app_factory(&self, factory: AppFactory) {
        *self.app_factory.lock() = Some(factory);
    }

    pub fn take_app_factory(&self) -> Option<AppFactory> {
        self.app_factory.lock().take()
    }
}

/// The orchestrator. One instance bootstraps one application.
pub struct Bootstrap {
    ctx: Arc<BootstrapCtx>,
    loader: Arc<ModuleLoader>,
    registry: SharedRegistry,
    host: Arc<dyn HostHooks>,
    poller: ReadinessPoller,
    app: Option<AppHandle>,
    resize_watcher: Option<JoinHandle<()>>,
}

impl Bootstrap {
    /// Assemble a bootstrap from its seams. The base application behavior
    /// set is installed into a fresh registry up front so every module's
    /// wiring can link under it.
    pub fn new(
        ctx: Arc<BootstrapCtx>,
        resolver: PathResolver,
        fetcher: Arc<dyn ModuleFetcher>,
        host: Arc<dyn HostHooks>,
    ) -> Self {
        let loader = ModuleLoader::new(resolver, Arc::clone(ctx.tracker()), fetcher);
        let mut registry = BehaviorRegistry::new();
        register_base_app(&mut registry, Arc::clone(ctx.storage()));
        Self {
            ctx,
            loader,
            registry: Arc::new(RwLock::new(registry)),
            host,
            poller: ReadinessPoller::new(),
            app: None,
            resize_watcher: None,
        }
    }

    pub fn ctx(&self) -> &Arc<BootstrapCtx> {
        &self.ctx
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn app(&self) -> Option<&AppHandle> {
        self.app.as_ref()
    }

    /// Root module id for an application name.
    pub fn root_module(app_name: &str) -> ModuleId {
        ModuleId::new(format!("shell.app.{app_name}.main"))
    }

    /// Run the bootstrap sequence for `app_name`. Completes when the
    /// application has been constructed and started; a second call on the
    /// same instance is an error.
    pub async fn start(&mut self, app_name: &str) -> Result<AppHandle> {
        if self.app.is_some() {
            bail!("bootstrap already started");
        }
        info!(app = app_name, "bootstrap starting");

        let ctx = Arc::clone(&self.ctx);
        self.host
            .subscribe_ready(Box::new(move || ctx.set_device_ready()));

        self.loader.require(&Self::root_module(app_name));

        self.poller.begin(app_name);
        let timed_out = loop {
            match self.poller.tick(&self.ctx) {
                PollOutcome::Ready { timed_out } => break timed_out,
                PollOutcome::Waiting => tokio::time::sleep(POLL_TICK_INTERVAL).await,
            }
        };
        if timed_out {
            warn!(app = app_name, "continuing after load timeout");
        }

        {
            let mut registry = self.registry.write();
            let report = self.ctx.queue().drain_once(&mut registry)?;
            info!(callbacks = report.ran, "deferred initialization complete");
        }

        let factory = self.ctx.take_app_factory().ok_or_else(|| {
            anyhow!("application `{app_name}` was not defined by its main module")
        })?;
        let app = factory(&self.registry)?;
        let handle = AppHandle::new(app);
        handle.lock().start()?;
        info!(app = app_name, "application started");

        let (width, height) = self.host.window_size();
        handle.lock().resize(width, height)?;

        let resize_handle = handle.clone();
        self.resize_watcher = Some(spawn_resize_watcher(
            Arc::clone(&self.host),
            move |w, h| {
                if let Err(err) = resize_handle.lock().resize(w, h) {
                    warn!(%err, "resize handler failed");
                }
            },
        ));

        let lifecycle_handle = handle.clone();
        self.host
            .subscribe_lifecycle(Box::new(move |event| match event {
                LifecycleEvent::Pause => lifecycle_handle.lock().pause(),
                LifecycleEvent::Resume => lifecycle_handle.lock().resume(),
                LifecycleEvent::BackButton => lifecycle_handle.lock().device_back_button(),
            }));

        self.app = Some(handle.clone());
        Ok(handle)
    }
}

impl Drop for Bootstrap {
    fn drop(&mut self) {
        if let Some(watcher) = self.resize_watcher.take() {
            watcher.abort();
        }
    }
}
