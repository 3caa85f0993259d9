//! Module loader: idempotent request-and-fetch over a fetch collaborator.
//!
//! `require` resolves an id, consults the tracker for the at-most-once
//! guarantee, then spawns a fire-and-forget fetch task. When the fetch
//! returns, the task requires every declared transitive dependency *before*
//! marking its own completion, so `required` can only grow ahead of
//! `completed` and the tracker can never look quiescent while a module's
//! requires are still being discovered.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use appshell_resolver::PathResolver;
use appshell_types::ModuleId;

use crate::tracker::LoadTracker;

/// Declared contents of a fetched module: the dependencies it requires.
///
/// Evaluating the module is the fetcher's business; a fetcher that needs to
/// register deferred wiring does so itself during `fetch`, exactly as
/// evaluating a source file did in a script-tag loader.
#[derive(Debug, Clone, Default)]
pub struct ModuleSource {
    pub requires: Vec<ModuleId>,
}

/// External fetch primitive: retrieve and evaluate one asset.
///
/// There is no retry at this level; an error settles the module as failed
/// and a fetch that never returns is caught only by the poller bound.
#[async_trait]
pub trait ModuleFetcher: Send + Sync {
    async fn fetch(&self, id: &ModuleId, asset_path: &str) -> Result<ModuleSource>;
}

/// Issues module requests and tracks their completion.
pub struct ModuleLoader {
    resolver: PathResolver,
    tracker: Arc<LoadTracker>,
    fetcher: Arc<dyn ModuleFetcher>,
}

impl ModuleLoader {
    pub fn new(
        resolver: PathResolver,
        tracker: Arc<LoadTracker>,
        fetcher: Arc<dyn ModuleFetcher>,
    ) -> Arc<Self> {
        Arc::new(Self {
            resolver,
            tracker,
            fetcher,
        })
    }

    pub fn tracker(&self) -> &Arc<LoadTracker> {
        &self.tracker
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Request a module. Returns `true` when this call issued the fetch.
    ///
    /// Pre-bundled ids are skipped without touching the tracker, and
    /// duplicate requests are suppressed by construction. Must be called
    /// from within a tokio runtime.
    pub fn require(self: &Arc<Self>, id: &ModuleId) -> bool {
        let asset = self.resolver.resolve(id);
        if asset.skip {
            debug!(module = %id, "pre-bundled module, skipping fetch");
            return false;
        }
        if !self.tracker.request_once(id) {
            return false;
        }
        debug!(module = %id, path = %asset.path, "requesting module");

        let loader = Arc::clone(self);
        let id = id.clone();
        tokio::spawn(async move {
            match loader.fetcher.fetch(&id, &asset.path).await {
                Ok(source) => {
                    for dep in &source.requires {
                        loader.require(dep);
                    }
                    loader.tracker.mark_completed(&id);
                    debug!(module = %id, requires = source.requires.len(), "module loaded");
                }
                Err(err) => {
                    warn!(module = %id, error = %err, "module fetch failed");
                    loader.tracker.mark_failed(&id);
                }
            }
        });
        true
    }
}
