//! Host-container seams.
//!
//! The bootstrap never talks to a concrete container directly; it goes
//! through [`HostHooks`]. A hosted build subscribes to the container's
//! ready and lifecycle signals, a plain desktop build reports ready
//! immediately. Window size is exposed as a polled value so a resize
//! watcher can diff it on a timer rather than depending on a host event.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use appshell_types::POLL_TICK_INTERVAL;

/// Lifecycle notifications forwarded from the host container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Pause,
    Resume,
    BackButton,
}

pub type ReadyFn = Box<dyn FnOnce() + Send>;
pub type LifecycleFn = Box<dyn Fn(LifecycleEvent) + Send + Sync>;

/// The container seam. Implementations wire platform signals into the
/// bootstrap's callbacks.
pub trait HostHooks: Send + Sync {
    /// Invoke `on_ready` once the container is usable. Containers that are
    /// usable from the start invoke it before returning.
    fn subscribe_ready(&self, on_ready: ReadyFn);

    /// Register for pause/resume/back-button notifications. Hosts without
    /// a lifecycle simply drop the callback.
    fn subscribe_lifecycle(&self, _on_event: LifecycleFn) {}

    /// Current drawable size in pixels.
    fn window_size(&self) -> (u32, u32) {
        (480, 480)
    }
}

/// Host for environments with no container handshake: ready on arrival, no
/// lifecycle events, fixed window.
#[derive(Debug, Default)]
pub struct DesktopHost {
    size: (u32, u32),
}

impl DesktopHost {
    pub fn new() -> Self {
        Self { size: (480, 480) }
    }

    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
        }
    }
}

impl HostHooks for DesktopHost {
    fn subscribe_ready(&self, on_ready: ReadyFn) {
        on_ready();
    }

    fn window_size(&self) -> (u32, u32) {
        self.size
    }
}

/// Host for containered platforms: ready only once the container says so,
/// lifecycle events forwarded from the container, size reported by the
/// container.
///
/// The container side calls [`ContainerHost::signal_ready`],
/// [`ContainerHost::emit_lifecycle`], and [`ContainerHost::set_size`];
/// the bootstrap side only sees the [`HostHooks`] seam.
#[derive(Default)]
pub struct ContainerHost {
    ready: std::sync::atomic::AtomicBool,
    on_ready: Mutex<Option<ReadyFn>>,
    lifecycle: Mutex<Vec<LifecycleFn>>,
    size: Mutex<(u32, u32)>,
}

impl ContainerHost {
    pub fn new() -> Self {
        Self {
            size: Mutex::new((480, 480)),
            ..Self::default()
        }
    }

    /// Deliver the one-shot readiness signal. Idempotent; a subscriber
    /// registered after the signal fires immediately.
    pub fn signal_ready(&self) {
        self.ready.store(true, std::sync::atomic::Ordering::SeqCst);
        if let Some(on_ready) = self.on_ready.lock().take() {
            on_ready();
        }
    }

    /// Forward a lifecycle event to every subscriber.
    pub fn emit_lifecycle(&self, event: LifecycleEvent) {
        for sink in self.lifecycle.lock().iter() {
            sink(event);
        }
    }

    /// Update the reported window size; the resize watcher picks the
    /// change up on its next tick.
    pub fn set_size(&self, width: u32, height: u32) {
        *self.size.lock() = (width, height);
    }
}

impl HostHooks for ContainerHost {
    fn subscribe_ready(&self, on_ready: ReadyFn) {
        if self.ready.load(std::sync::atomic::Ordering::SeqCst) {
            on_ready();
        } else {
            *self.on_ready.lock() = Some(on_ready);
        }
    }

    fn subscribe_lifecycle(&self, on_event: LifecycleFn) {
        self.lifecycle.lock().push(on_event);
    }

    fn window_size(&self) -> (u32, u32) {
        *self.size.lock()
    }
}

/// Poll the host's window size and report changes. Sampling on an interval
/// coalesces event storms during interactive resizing into at most one
/// callback per tick.
pub fn spawn_resize_watcher<F>(host: Arc<dyn HostHooks>, on_resize: F) -> JoinHandle<()>
where
    F: Fn(u32, u32) + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(watch_interval());
        let mut last = host.window_size();
        loop {
            interval.tick().await;
            let size = host.window_size();
            if size != last {
                debug!(width = size.0, height = size.1, "window size changed");
                last = size;
                on_resize(size.0, size.1);
            }
        }
    })
}

fn watch_interval() -> Duration {
    POLL_TICK_INTERVAL
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[test]
    fn desktop_host_is_ready_immediately() {
        let host = DesktopHost::new();
        let fired = Arc::new(AtomicBool::new(false));
        let f = Arc::clone(&fired);
        host.subscribe_ready(Box::new(move || f.store(true, Ordering::SeqCst)));
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn container_host_defers_ready_until_signaled() {
        let host = ContainerHost::new();
        let fired = Arc::new(AtomicBool::new(false));
        let f = Arc::clone(&fired);
        host.subscribe_ready(Box::new(move || f.store(true, Ordering::SeqCst)));
        assert!(!fired.load(Ordering::SeqCst));

        host.signal_ready();
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn container_host_fires_late_subscribers_immediately() {
        let host = ContainerHost::new();
        host.signal_ready();

        let fired = Arc::new(AtomicBool::new(false));
        let f = Arc::clone(&fired);
        host.subscribe_ready(Box::new(move || f.store(true, Ordering::SeqCst)));
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn container_host_forwards_lifecycle_events() {
        let host = ContainerHost::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        host.subscribe_lifecycle(Box::new(move |event| {
            sink.lock().unwrap().push(event);
        }));

        host.emit_lifecycle(LifecycleEvent::Pause);
        host.emit_lifecycle(LifecycleEvent::Resume);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![LifecycleEvent::Pause, LifecycleEvent::Resume]
        );
    }

    struct GrowingHost {
        sizes: Mutex<Vec<(u32, u32)>>,
    }

    impl HostHooks for GrowingHost {
        fn subscribe_ready(&self, on_ready: ReadyFn) {
            on_ready();
        }

        fn window_size(&self) -> (u32, u32) {
            let mut sizes = self.sizes.lock().unwrap();
            if sizes.len() > 1 {
                sizes.remove(0)
            } else {
                sizes[0]
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn resize_watcher_reports_changes_only() {
        let host = Arc::new(GrowingHost {
            sizes: Mutex::new(vec![(480, 480), (480, 480), (800, 600), (800, 600)]),
        });
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let watcher = spawn_resize_watcher(host, move |w, h| {
            sink.lock().unwrap().push((w, h));
        });

        tokio::time::sleep(POLL_TICK_INTERVAL * 6).await;
        watcher.abort();
        assert_eq!(*seen.lock().unwrap(), vec![(800, 600)]);
    }
}
