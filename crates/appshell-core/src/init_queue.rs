//! Deferred-initialization queue.
//!
//! Modules register zero-argument wiring callbacks while the graph loads,
//! typically to establish inheritance links once every type definition has
//! been evaluated. The queue is drained exactly once, after the tracker
//! settles and before the application is constructed.
//!
//! Entries may be keyed (usually by module id) and name prerequisite keys;
//! the drain then runs a stable topological order instead of trusting
//! registration order, with registration order breaking ties and governing
//! unkeyed entries. References to keys nobody registered are treated as
//! already satisfied: the prerequisite module may have been pre-bundled or
//! failed to load, and fail-open is the system's policy.

use std::collections::HashMap;

use anyhow::{bail, Result};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::behavior::BehaviorRegistry;

/// A deferred wiring callback. Runs once, against the shared registry.
pub type InitFn = Box<dyn FnOnce(&mut BehaviorRegistry) -> Result<()> + Send>;

struct InitEntry {
    key: Option<String>,
    after: Vec<String>,
    run: InitFn,
}

#[derive(Default)]
struct QueueState {
    entries: Vec<InitEntry>,
    drained: bool,
}

/// Ordered list of deferred callbacks, drained exactly once.
#[derive(Default)]
pub struct InitQueue {
    inner: Mutex<QueueState>,
}

/// Summary of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Callbacks executed by this pass.
    pub ran: usize,
    /// True when the queue had already been drained and this call was a
    /// no-op.
    pub already_drained: bool,
}

impl InitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an unkeyed callback. Legal at any point before the drain.
    pub fn register<F>(&self, run: F)
    where
        F: FnOnce(&mut BehaviorRegistry) -> Result<()> + Send + 'static,
    {
        self.push(None, &[], Box::new(run));
    }

    /// Append a keyed callback with prerequisite keys. Keys follow module-id
    /// case-insensitivity.
    pub fn register_keyed<F>(&self, key: &str, after: &[&str], run: F)
    where
        F: FnOnce(&mut BehaviorRegistry) -> Result<()> + Send + 'static,
    {
        let after: Vec<String> = after.iter().map(|k| k.to_ascii_lowercase()).collect();
        self.push(Some(key.to_ascii_lowercase()), &after, Box::new(run));
    }

    fn push(&self, key: Option<String>, after: &[String], run: InitFn) {
        let mut state = self.inner.lock();
        if state.drained {
            warn!(key = key.as_deref().unwrap_or("<unkeyed>"),
                  "deferred callback registered after drain; ignored");
            return;
        }
        state.entries.push(InitEntry {
            key,
            after: after.to_vec(),
            run,
        });
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every registered callback exactly once, prerequisites first.
    /// A second call is a no-op. A prerequisite cycle or a callback error
    /// is fatal: deferred wiring is configuration, not recoverable input.
    pub fn drain_once(&self, registry: &mut BehaviorRegistry) -> Result<DrainReport> {
        let entries = {
            let mut state = self.inner.lock();
            if state.drained {
                return Ok(DrainReport {
                    ran: 0,
                    already_drained: true,
                });
            }
            state.drained = true;
            std::mem::take(&mut state.entries)
        };

        let order = topo_order(&entries)?;
        let mut slots: Vec<Option<InitEntry>> = entries.into_iter().map(Some).collect();
        let mut ran = 0;
        for index in order {
            if let Some(entry) = slots[index].take() {
                (entry.run)(registry)?;
                ran += 1;
            }
        }
        debug!(callbacks = ran, "deferred initialization drained");
        Ok(DrainReport {
            ran,
            already_drained: false,
        })
    }
}

/// Stable Kahn topological sort over prerequisite keys. Ties and unkeyed
/// entries keep registration order; unknown prerequisite keys count as
/// satisfied.
fn topo_order(entries: &[InitEntry]) -> Result<Vec<usize>> {
    let mut by_key: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, entry) in entries.iter().enumerate() {
        if let Some(key) = entry.key.as_deref() {
            by_key.entry(key).or_default().push(index);
        }
    }

    // dependents[i] = entries that must wait for entry i.
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];
    let mut indegree = vec![0usize; entries.len()];
    for (index, entry) in entries.iter().enumerate() {
        for prerequisite in &entry.after {
            match by_key.get(prerequisite.as_str()) {
                Some(providers) => {
                    for &provider in providers {
                        if provider != index {
                            dependents[provider].push(index);
                            indegree[index] += 1;
                        }
                    }
                }
                None => {
                    debug!(prerequisite = %prerequisite,
                           "prerequisite never registered; treating as satisfied");
                }
            }
        }
    }

    // Smallest registration index first keeps the order stable.
    let mut ready: std::collections::BinaryHeap<std::cmp::Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| std::cmp::Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(entries.len());
    while let Some(std::cmp::Reverse(index)) = ready.pop() {
        order.push(index);
        for &dependent in &dependents[index] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.push(std::cmp::Reverse(dependent));
            }
        }
    }

    if order.len() != entries.len() {
        bail!("deferred initialization entries form a dependency cycle");
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex as PMutex;

    fn record(log: &Arc<PMutex<Vec<&'static str>>>, label: &'static str) -> impl FnOnce(&mut BehaviorRegistry) -> Result<()> + Send {
        let log = Arc::clone(log);
        move |_| {
            log.lock().push(label);
            Ok(())
        }
    }

    #[test]
    fn drain_runs_in_registration_order() {
        let queue = InitQueue::new();
        let log = Arc::new(PMutex::new(Vec::new()));
        queue.register(record(&log, "first"));
        queue.register(record(&log, "second"));
        queue.register(record(&log, "third"));

        let mut registry = BehaviorRegistry::new();
        let report = queue.drain_once(&mut registry).unwrap();
        assert_eq!(report.ran, 3);
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn second_drain_is_a_no_op() {
        let queue = InitQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        queue.register(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut registry = BehaviorRegistry::new();
        queue.drain_once(&mut registry).unwrap();
        let report = queue.drain_once(&mut registry).unwrap();
        assert!(report.already_drained);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn prerequisites_run_before_dependents_regardless_of_registration() {
        let queue = InitQueue::new();
        let log = Arc::new(PMutex::new(Vec::new()));
        // Child registered first, parent second; the drain must still run
        // the parent's wiring first.
        queue.register_keyed("shell.app.demo.main", &["shell.app.base"], record(&log, "child"));
        queue.register_keyed("shell.app.base", &[], record(&log, "parent"));

        let mut registry = BehaviorRegistry::new();
        queue.drain_once(&mut registry).unwrap();
        assert_eq!(*log.lock(), vec!["parent", "child"]);
    }

    #[test]
    fn unknown_prerequisites_are_satisfied() {
        let queue = InitQueue::new();
        let log = Arc::new(PMutex::new(Vec::new()));
        queue.register_keyed("a", &["never.registered"], record(&log, "a"));

        let mut registry = BehaviorRegistry::new();
        let report = queue.drain_once(&mut registry).unwrap();
        assert_eq!(report.ran, 1);
    }

    #[test]
    fn prerequisite_cycle_is_fatal() {
        let queue = InitQueue::new();
        queue.register_keyed("a", &["b"], |_| Ok(()));
        queue.register_keyed("b", &["a"], |_| Ok(()));

        let mut registry = BehaviorRegistry::new();
        let err = queue.drain_once(&mut registry).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn callback_errors_abort_the_drain() {
        let queue = InitQueue::new();
        queue.register(|_| anyhow::bail!("bad wiring"));
        let mut registry = BehaviorRegistry::new();
        assert!(queue.drain_once(&mut registry).is_err());
    }

    #[test]
    fn registration_after_drain_is_ignored() {
        let queue = InitQueue::new();
        let mut registry = BehaviorRegistry::new();
        queue.drain_once(&mut registry).unwrap();

        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        queue.register(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(queue.is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
