//! JSON module manifests and the filesystem fetcher.
//!
//! A module on disk is a JSON manifest naming its dependencies, the
//! behavior types it declares, and the inheritance links to establish once
//! everything is loaded. The fetcher reads manifests, reports dependencies
//! to the loader, and registers each manifest's wiring on the deferred
//! queue keyed by module id with its dependencies as prerequisites, so
//! links always run parents-first.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use appshell_core::{BootstrapCtx, DynApp};
use appshell_loader::{ModuleFetcher, ModuleSource};
use appshell_types::ModuleId;

/// One inheritance link declared by a manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestLink {
    pub child: String,
    pub parent: String,
}

/// On-disk module description.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleManifest {
    /// Modules this one depends on.
    #[serde(default)]
    pub requires: Vec<ModuleId>,
    /// Behavior types this module declares.
    #[serde(default)]
    pub defines: Vec<String>,
    /// Links established during deferred wiring.
    #[serde(default)]
    pub links: Vec<ManifestLink>,
    /// Behavior type to construct as the application, normally set only by
    /// an application's main module.
    #[serde(default)]
    pub app: Option<String>,
}

/// Loads manifests from a root directory and wires them through the
/// bootstrap context.
pub struct FsModuleFetcher {
    root: PathBuf,
    ctx: Arc<BootstrapCtx>,
}

impl FsModuleFetcher {
    pub fn new(root: impl Into<PathBuf>, ctx: Arc<BootstrapCtx>) -> Self {
        Self {
            root: root.into(),
            ctx,
        }
    }

    fn register_wiring(&self, id: &ModuleId, manifest: &ModuleManifest) {
        let after: Vec<String> = manifest
            .requires
            .iter()
            .map(|dep| dep.as_str().to_string())
            .collect();
        let after_refs: Vec<&str> = after.iter().map(String::as_str).collect();

        let defines = manifest.defines.clone();
        let links = manifest.links.clone();
        let app = manifest.app.clone();
        let ctx = Arc::clone(&self.ctx);

        self.ctx
            .queue()
            .register_keyed(id.as_str(), &after_refs, move |registry| {
                for type_name in &defines {
                    registry.define_empty(type_name);
                }
                for link in &links {
                    registry.link(&link.child, &link.parent)?;
                }
                if let Some(app_type) = app {
                    ctx.set_app_factory(Box::new(move |registry| {
                        let app = DynApp::construct(
                            Arc::clone(registry),
                            &app_type,
                            &[json!(480), json!(480)],
                        )?;
                        Ok(Box::new(app))
                    }));
                }
                Ok(())
            });
    }
}

#[async_trait]
impl ModuleFetcher for FsModuleFetcher {
    async fn fetch(&self, id: &ModuleId, asset_path: &str) -> Result<ModuleSource> {
        let path = self.root.join(asset_path);
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading module manifest {}", path.display()))?;
        let manifest: ModuleManifest = serde_json::from_str(&text)
            .with_context(|| format!("parsing module manifest {}", path.display()))?;
        debug!(
            module = id.as_str(),
            requires = manifest.requires.len(),
            defines = manifest.defines.len(),
            "manifest loaded"
        );

        self.register_wiring(id, &manifest);
        Ok(ModuleSource {
            requires: manifest.requires.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parses_with_defaults() {
        let manifest: ModuleManifest = serde_json::from_str("{}").unwrap();
        assert!(manifest.requires.is_empty());
        assert!(manifest.app.is_none());
    }

    #[test]
    fn manifest_rejects_unknown_fields() {
        let err = serde_json::from_str::<ModuleManifest>(r#"{"reqires": []}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn manifest_normalizes_module_ids() {
        let manifest: ModuleManifest =
            serde_json::from_str(r#"{"requires": [" Shell.App.Demo.Widgets "]}"#).unwrap();
        assert_eq!(manifest.requires[0].as_str(), "shell.app.demo.widgets");
    }
}
