//! The application contract and the built-in base behavior set.
//!
//! The bootstrap constructs exactly one [`Application`] per start and hands
//! back a cloneable [`AppHandle`]. Native applications implement the trait
//! directly; dynamically defined ones go through [`DynApp`], which forwards
//! every lifecycle call into the behavior registry so the full inheritance
//! chain (super dispatch included) applies.

use anyhow::Result;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

use crate::behavior::{BehaviorError, BehaviorRegistry, Instance, SharedRegistry, Value};
use crate::storage::KeyValueStore;

/// Behavior type every dynamically defined application links under.
pub const BASE_APP_TYPE: &str = "app.base";

/// The lifecycle surface the bootstrap drives.
pub trait Application: Send {
    /// Called exactly once, after the module graph settles.
    fn start(&mut self) -> Result<()>;

    /// Called when the host window size changes.
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    fn pause(&mut self) {}
    fn resume(&mut self) {}
    fn device_back_button(&mut self) {}
}

/// Shared handle to the running application. Cloned into the resize watcher
/// and lifecycle subscriptions.
#[derive(Clone)]
pub struct AppHandle {
    inner: Arc<Mutex<Box<dyn Application>>>,
}

impl std::fmt::Debug for AppHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppHandle").finish_non_exhaustive()
    }
}

impl AppHandle {
    pub fn new(app: Box<dyn Application>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(app)),
        }
    }

    pub fn lock(&self) -> parking_lot::MutexGuard<'_, Box<dyn Application>> {
        self.inner.lock()
    }
}

/// An application whose behavior lives in the registry.
///
/// Lifecycle calls become registry invokes on the backing instance. Missing
/// optional methods (pause, resume, back button) are skipped; a failing
/// method is logged and swallowed so one bad handler cannot take down the
/// shell.
pub struct DynApp {
    registry: SharedRegistry,
    instance: Instance,
}

impl DynApp {
    /// Construct the backing instance of `type_name` with the given
    /// constructor arguments.
    pub fn construct(registry: SharedRegistry, type_name: &str, args: &[Value]) -> Result<Self> {
        let instance = registry.read().construct(type_name, args)?;
        Ok(Self { registry, instance })
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    fn dispatch(&mut self, method: &str, args: &[Value]) {
        let registry = self.registry.read();
        if !registry.method_exists(self.instance.type_name(), method) {
            debug!(ty = self.instance.type_name(), method, "no handler; skipped");
            return;
        }
        if let Err(err) = registry.invoke(&mut self.instance, method, args) {
            error!(ty = self.instance.type_name(), method, %err, "handler failed");
        }
    }
}

impl Application for DynApp {
    fn start(&mut self) -> Result<()> {
        let registry = self.registry.read();
        registry.invoke(&mut self.instance, "start", &[])?;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let registry = self.registry.read();
        registry.invoke(&mut self.instance, "resize", &[json!(width), json!(height)])?;
        Ok(())
    }

    fn pause(&mut self) {
        self.dispatch("pause", &[]);
    }

    fn resume(&mut self) {
        self.dispatch("resume", &[]);
    }

    fn device_back_button(&mut self) {
        self.dispatch("device_back_button", &[]);
    }
}

/// Install the built-in [`BASE_APP_TYPE`] behavior set.
///
/// Provides the dimensions bookkeeping, a `render_view` helper that invokes
/// `view_<name>` when one exists, `save_state`/`load_state` backed by the
/// bootstrap's key-value store, and no-op lifecycle handlers so subtypes
/// only override what they care about.
pub fn register_base_app(registry: &mut BehaviorRegistry, storage: Arc<KeyValueStore>) {
    let save_store = Arc::clone(&storage);
    registry
        .define(BASE_APP_TYPE)
        .constructor(|reg, inst, args| {
            let width = args.first().and_then(Value::as_u64).unwrap_or(480);
            let height = args.get(1).and_then(Value::as_u64).unwrap_or(480);
            inst.set("width", width);
            inst.set("height", height);
            reg.invoke(inst, "calc_dims", &[])?;
            Ok(Value::Null)
        })
        .method("start", |_, _, _| Ok(Value::Null))
        .method("resize", |reg, inst, args| {
            if let Some(width) = args.first().and_then(Value::as_u64) {
                inst.set("width", width);
            }
            if let Some(height) = args.get(1).and_then(Value::as_u64) {
                inst.set("height", height);
            }
            reg.invoke(inst, "calc_dims", &[])
        })
        .method("calc_dims", |_, inst, _| {
            // Derived layout values; subtypes override for real layouts.
            let width = inst.get_u64("width").unwrap_or(480);
            let height = inst.get_u64("height").unwrap_or(480);
            inst.set("half_width", width / 2);
            inst.set("half_height", height / 2);
            Ok(Value::Null)
        })
        .method("render_view", |reg, inst, args| {
            let name = args
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| BehaviorError::App("render_view requires a view name".into()))?
                .to_string();
            let handler = format!("view_{name}");
            if reg.method_exists(inst.type_name(), &handler) {
                inst.set("current_view", name.clone());
                reg.invoke(inst, &handler, &[])
            } else {
                Err(BehaviorError::UnresolvedMethod {
                    type_name: inst.type_name().to_string(),
                    method: handler,
                })
            }
        })
        .method("save_state", move |_, _, args| {
            let key = args
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| BehaviorError::App("save_state requires a key".into()))?;
            let value = args.get(1).cloned().unwrap_or(Value::Null);
            save_store
                .save(key, &value)
                .map_err(|err| BehaviorError::App(err.to_string()))?;
            Ok(Value::Null)
        })
        .method("load_state", move |_, _, args| {
            let key = args
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| BehaviorError::App("load_state requires a key".into()))?;
            Ok(storage.load::<Value>(key).unwrap_or(Value::Null))
        })
        .method("pause", |_, _, _| Ok(Value::Null))
        .method("resume", |_, _, _| Ok(Value::Null))
        .method("device_back_button", |_, _, _| Ok(Value::Null))
        .register();
}

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::RwLock;

    fn shared_with_base() -> SharedRegistry {
        let mut registry = BehaviorRegistry::new();
        register_base_app(&mut registry, Arc::new(KeyValueStore::new()));
        Arc::new(RwLock::new(registry))
    }

    #[test]
    fn base_constructor_seeds_dimensions() {
        let shared = shared_with_base();
        let instance = shared.read().construct(BASE_APP_TYPE, &[]).unwrap();
        assert_eq!(instance.get_u64("width"), Some(480));
        assert_eq!(instance.get_u64("half_width"), Some(240));
    }

    #[test]
    fn resize_recomputes_derived_dimensions() {
        let shared = shared_with_base();
        let mut app = DynApp::construct(Arc::clone(&shared), BASE_APP_TYPE, &[]).unwrap();
        app.resize(800, 600).unwrap();
        assert_eq!(app.instance().get_u64("width"), Some(800));
        assert_eq!(app.instance().get_u64("half_height"), Some(300));
    }

    #[test]
    fn subtype_overrides_flow_through_the_handle() {
        let shared = shared_with_base();
        {
            let mut registry = shared.write();
            registry
                .define("app.demo")
                .constructor(|reg, inst, args| {
                    reg.call_super_constructor(inst, "app.demo", args)?;
                    inst.set("started", false);
                    Ok(Value::Null)
                })
                .method("start", |_, inst, _| {
                    inst.set("started", true);
                    Ok(Value::Null)
                })
                .method("view_home", |_, inst, _| {
                    inst.set("rendered", "home");
                    Ok(Value::Null)
                })
                .register();
            registry.link("app.demo", BASE_APP_TYPE).unwrap();
        }

        let app = DynApp::construct(Arc::clone(&shared), "app.demo", &[]).unwrap();
        let handle = AppHandle::new(Box::new(app));
        handle.lock().start().unwrap();
        // Lifecycle events without an override fall back to the base no-ops.
        handle.lock().pause();
        handle.lock().resume();
    }

    #[test]
    fn state_round_trips_through_the_store() {
        let storage = Arc::new(KeyValueStore::new());
        let mut registry = BehaviorRegistry::new();
        register_base_app(&mut registry, Arc::clone(&storage));

        let mut instance = registry.construct(BASE_APP_TYPE, &[]).unwrap();
        registry
            .invoke(&mut instance, "save_state", &[json!("volume"), json!(7)])
            .unwrap();
        let loaded = registry
            .invoke(&mut instance, "load_state", &[json!("volume")])
            .unwrap();
        assert_eq!(loaded, json!(7));
        // The bootstrap-owned store sees the same entry.
        assert_eq!(storage.load::<u32>("volume"), Some(7));

        let missing = registry
            .invoke(&mut instance, "load_state", &[json!("missing")])
            .unwrap();
        assert_eq!(missing, Value::Null);
    }

    #[test]
    fn render_view_requires_a_matching_handler() {
        let shared = shared_with_base();
        let mut instance = shared.read().construct(BASE_APP_TYPE, &[]).unwrap();
        let err = shared
            .read()
            .invoke(&mut instance, "render_view", &[json!("missing")])
            .unwrap_err();
        assert!(matches!(
            err,
            crate::behavior::BehaviorError::UnresolvedMethod { .. }
        ));
    }
}
