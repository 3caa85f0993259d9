//! Dynamic single-inheritance behavior sets.
//!
//! A behavior set is a named bag of methods (and an optional constructor)
//! operating on dynamic [`Instance`] records. `link` makes a child set's
//! unresolved lookups fall back to a parent's, single inheritance only.
//!
//! Super dispatch is resolved *at link time* into an ownership-indexed table
//! `{owner type, method} -> ancestor implementation`: each override names the
//! type that owns it when calling up, and the registry hands back the nearest
//! ancestor implementation recorded when the link was established. There is
//! no per-call chain walking and no call-site introspection; a table miss is
//! a hard error, since a silent mis-dispatch would corrupt behavior
//! invisibly.
//!
//! Linking parents before children is required for the tables to see the
//! full chain; the deferred-initialization queue guarantees that order when
//! links are registered with their module prerequisites.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

/// Dynamic value passed between behaviors.
pub type Value = serde_json::Value;

/// A behavior-bound function. Receives the registry (for super dispatch and
/// nested invokes), the receiver instance, and positional arguments.
pub type Method =
    Arc<dyn Fn(&BehaviorRegistry, &mut Instance, &[Value]) -> Result<Value, BehaviorError> + Send + Sync>;

/// Registry shared between the bootstrap and constructed applications.
pub type SharedRegistry = Arc<RwLock<BehaviorRegistry>>;

/// Errors raised by behavior registration, linking, and dispatch.
#[derive(Debug, Error)]
pub enum BehaviorError {
    #[error("unknown behavior type `{0}`")]
    UnknownType(String),

    /// Linking would make a type its own ancestor. Fatal configuration
    /// error; prior valid links are left intact.
    #[error("linking `{child}` under `{parent}` would create a cycle")]
    CyclicTypeLink { child: String, parent: String },

    #[error("type `{type_name}` is already linked to `{parent}`")]
    AlreadyLinked { type_name: String, parent: String },

    #[error("no method `{method}` reachable from type `{type_name}`")]
    UnresolvedMethod { type_name: String, method: String },

    /// Super dispatch found no ancestor implementation. Signals a
    /// programming error (mismatched override name); never swallowed.
    #[error("no ancestor implementation of `{method}` above `{owner}`")]
    UnresolvedSuperDispatch { owner: String, method: String },

    #[error("no ancestor constructor above `{owner}`")]
    UnresolvedSuperConstructor { owner: String },

    /// Application-level failure inside a method body.
    #[error("{0}")]
    App(String),
}

/// A dynamic record bound to a registered behavior type.
#[derive(Debug, Clone)]
pub struct Instance {
    type_name: String,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: HashMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.fields.get(key).and_then(Value::as_u64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

#[derive(Default)]
struct Behavior {
    constructor: Option<Method>,
    methods: HashMap<String, Method>,
    /// Back-reference to the parent's behavior set. Weak by construction:
    /// the parent's lifetime is independent of any child.
    parent: Option<String>,
}

/// Named behavior sets, their links, and the super-dispatch tables.
#[derive(Default)]
pub struct BehaviorRegistry {
    types: HashMap<String, Behavior>,
    /// `(owner type, method) -> nearest ancestor implementation`, resolved
    /// once per link.
    super_methods: HashMap<(String, String), Method>,
    /// `child type -> nearest ancestor constructor`.
    super_ctors: HashMap<String, Method>,
}

impl fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorRegistry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("super_methods", &self.super_methods.len())
            .finish()
    }
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start defining a behavior type. Redefinition replaces the previous
    /// definition, as re-evaluating a module would.
    pub fn define(&mut self, name: &str) -> BehaviorBuilder<'_> {
        BehaviorBuilder {
            registry: self,
            name: name.to_string(),
            behavior: Behavior::default(),
        }
    }

    /// Define a type with no behavior of its own, e.g. one declared by a
    /// module manifest before its methods are installed.
    pub fn define_empty(&mut self, name: &str) {
        self.types.entry(name.to_string()).or_default();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.types.get(name)?.parent.as_deref()
    }

    /// Link `child`'s behavior lookup to fall back to `parent`'s.
    ///
    /// Rejects unknown types, re-links, and cycles; a rejected link leaves
    /// every previously established link intact. On success the super
    /// tables for `child` are resolved against the parent's current chain.
    pub fn link(&mut self, child: &str, parent: &str) -> Result<(), BehaviorError> {
        if !self.types.contains_key(child) {
            return Err(BehaviorError::UnknownType(child.to_string()));
        }
        if !self.types.contains_key(parent) {
            return Err(BehaviorError::UnknownType(parent.to_string()));
        }
        if let Some(existing) = self.parent_of(child) {
            return Err(BehaviorError::AlreadyLinked {
                type_name: child.to_string(),
                parent: existing.to_string(),
            });
        }

        // Walk the ancestor chain from `parent`; finding `child` there
        // (or parent == child) means the link would close a cycle.
        let mut cursor = Some(parent.to_string());
        while let Some(name) = cursor {
            if name == child {
                return Err(BehaviorError::CyclicTypeLink {
                    child: child.to_string(),
                    parent: parent.to_string(),
                });
            }
            cursor = self.parent_of(&name).map(str::to_string);
        }

        if let Some(behavior) = self.types.get_mut(child) {
            behavior.parent = Some(parent.to_string());
        }

        // Resolve the super tables once, here, instead of walking per call.
        if let Some(ctor) = self.lookup_constructor(parent) {
            self.super_ctors.insert(child.to_string(), ctor);
        }
        let own_methods: Vec<String> = self
            .types
            .get(child)
            .map(|b| b.methods.keys().cloned().collect())
            .unwrap_or_default();
        for method in own_methods {
            if let Some(ancestor) = self.lookup_method(parent, &method) {
                self.super_methods
                    .insert((child.to_string(), method), ancestor);
            }
        }
        Ok(())
    }

    /// Nearest implementation of `method` at or above `from`.
    fn lookup_method(&self, from: &str, method: &str) -> Option<Method> {
        let mut cursor = Some(from);
        while let Some(name) = cursor {
            let behavior = self.types.get(name)?;
            if let Some(found) = behavior.methods.get(method) {
                return Some(Arc::clone(found));
            }
            cursor = behavior.parent.as_deref();
        }
        None
    }

    /// Nearest constructor at or above `from`.
    fn lookup_constructor(&self, from: &str) -> Option<Method> {
        let mut cursor = Some(from);
        while let Some(name) = cursor {
            let behavior = self.types.get(name)?;
            if let Some(ctor) = &behavior.constructor {
                return Some(Arc::clone(ctor));
            }
            cursor = behavior.parent.as_deref();
        }
        None
    }

    /// Whether `method` resolves anywhere in `type_name`'s chain.
    pub fn method_exists(&self, type_name: &str, method: &str) -> bool {
        self.lookup_method(type_name, method).is_some()
    }

    /// Construct an instance, running the nearest own-or-inherited
    /// constructor. A chain with no constructor yields an empty instance.
    pub fn construct(&self, type_name: &str, args: &[Value]) -> Result<Instance, BehaviorError> {
        if !self.types.contains_key(type_name) {
            return Err(BehaviorError::UnknownType(type_name.to_string()));
        }
        let mut instance = Instance::new(type_name);
        if let Some(ctor) = self.lookup_constructor(type_name) {
            ctor(self, &mut instance, args)?;
        }
        Ok(instance)
    }

    /// Invoke `method` on `instance`, starting lookup at the instance's own
    /// type and falling back up the chain.
    pub fn invoke(
        &self,
        instance: &mut Instance,
        method: &str,
        args: &[Value],
    ) -> Result<Value, BehaviorError> {
        let found = self
            .lookup_method(instance.type_name(), method)
            .ok_or_else(|| BehaviorError::UnresolvedMethod {
                type_name: instance.type_name().to_string(),
                method: method.to_string(),
            })?;
        found(self, instance, args)
    }

    /// Invoke the ancestor implementation overridden by `owner`'s `method`.
    ///
    /// `owner` is the type whose override is currently executing, not the
    /// instance's own type; the two differ whenever the call came in
    /// through a subtype.
    pub fn call_super(
        &self,
        instance: &mut Instance,
        owner: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Value, BehaviorError> {
        let ancestor = self
            .super_methods
            .get(&(owner.to_string(), method.to_string()))
            .cloned()
            .ok_or_else(|| BehaviorError::UnresolvedSuperDispatch {
                owner: owner.to_string(),
                method: method.to_string(),
            })?;
        ancestor(self, instance, args)
    }

    /// Invoke the ancestor constructor from inside `owner`'s constructor.
    pub fn call_super_constructor(
        &self,
        instance: &mut Instance,
        owner: &str,
        args: &[Value],
    ) -> Result<Value, BehaviorError> {
        let ancestor = self
            .super_ctors
            .get(owner)
            .cloned()
            .ok_or_else(|| BehaviorError::UnresolvedSuperConstructor {
                owner: owner.to_string(),
            })?;
        ancestor(self, instance, args)
    }
}

/// Builder returned by [`BehaviorRegistry::define`].
pub struct BehaviorBuilder<'a> {
    registry: &'a mut BehaviorRegistry,
    name: String,
    behavior: Behavior,
}

impl BehaviorBuilder<'_> {
    pub fn constructor<F>(mut self, f: F) -> Self
    where
        F: Fn(&BehaviorRegistry, &mut Instance, &[Value]) -> Result<Value, BehaviorError>
            + Send
            + Sync
            + 'static,
    {
        self.behavior.constructor = Some(Arc::new(f));
        self
    }

    pub fn method<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&BehaviorRegistry, &mut Instance, &[Value]) -> Result<Value, BehaviorError>
            + Send
            + Sync
            + 'static,
    {
        self.behavior.methods.insert(name.to_string(), Arc::new(f));
        self
    }

    /// Install the definition. Redefining a type is a full replacement:
    /// any previous link and the super-table entries resolved from it are
    /// discarded, and the type may be linked anew.
    pub fn register(self) {
        self.registry.super_ctors.remove(&self.name);
        self.registry
            .super_methods
            .retain(|(owner, _), _| owner != &self.name);
        self.registry.types.insert(self.name, self.behavior);
    }
}
