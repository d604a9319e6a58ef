// Dispatch never runs a callback under `watches`' lock: every signal
// snapshots the live watches, builds one closure per match (duplicating
// its payload and taking a strong ref to the target), releases the
// lock, then invokes. Lets a callback call back into `watch`/`unwatch`
// without deadlocking.

use std::any::Any;
use std::sync::{Arc, Mutex, Weak};

use crate::backend::Backend;
use crate::context::DispatchContext;
use crate::signal::{Callbacks, ChangeSignal};

struct WatchEntry {
    // Captured from the concrete `Arc<T>` before type erasure so
    // `unwatch` can find this entry again without the concrete type.
    target_id: usize,
    target: Weak<dyn Any + Send + Sync>,
    callbacks: Callbacks,
    context: Option<Arc<dyn DispatchContext>>,
}

#[derive(Default)]
pub struct WatchRegistry {
    watches: Mutex<Vec<WatchEntry>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self {
            watches: Mutex::new(Vec::new()),
        }
    }

    pub fn watch<T: Send + Sync + 'static>(
        &self,
        target: &Arc<T>,
        callbacks: Callbacks,
        context: Option<Arc<dyn DispatchContext>>,
    ) {
        let target_id = Arc::as_ptr(target) as *const () as usize;
        let target: Weak<dyn Any + Send + Sync> = Arc::downgrade(target);
        self.watches.lock().unwrap().push(WatchEntry {
            target_id,
            target,
            callbacks,
            context,
        });
    }

    // Caller must hold a live reference to `target`.
    pub fn unwatch<T: Send + Sync + 'static>(&self, target: &Arc<T>) {
        let target_id = Arc::as_ptr(target) as *const () as usize;
        self.watches.lock().unwrap().retain(|w| w.target_id != target_id);
    }

    // Dead targets are pruned from the registry as a side effect of the
    // same scan.
    pub fn dispatch(&self, backend: Arc<dyn Backend>, signal: ChangeSignal) {
        let jobs: Vec<DispatchJob> = {
            let mut watches = self.watches.lock().unwrap();
            let mut jobs = Vec::new();
            watches.retain(|entry| match entry.target.upgrade() {
                Some(target) => {
                    if let Some(job) = build_job(entry, &signal, target, backend.clone()) {
                        jobs.push(job);
                    }
                    true
                }
                None => false,
            });
            jobs
        };
        for job in jobs {
            job.run();
        }
    }
}

struct DispatchJob {
    context: Option<Arc<dyn DispatchContext>>,
    invoke: Box<dyn FnOnce() + Send>,
}

impl DispatchJob {
    fn run(self) {
        match self.context {
            Some(context) => context.post(self.invoke),
            None => (self.invoke)(),
        }
    }
}

fn build_job(
    entry: &WatchEntry,
    signal: &ChangeSignal,
    target: Arc<dyn Any + Send + Sync>,
    backend: Arc<dyn Backend>,
) -> Option<DispatchJob> {
    let context = entry.context.clone();
    let invoke: Box<dyn FnOnce() + Send> = match signal.clone() {
        ChangeSignal::Changed { key, origin } => {
            let cb = entry.callbacks.changed.clone()?;
            Box::new(move || {
                let _keep_alive = (target, backend);
                cb(&key, origin);
            })
        }
        ChangeSignal::KeysChanged { dir, keys, origin } => {
            let cb = entry.callbacks.keys_changed.clone()?;
            Box::new(move || {
                let _keep_alive = (target, backend);
                cb(&dir, &keys, origin);
            })
        }
        ChangeSignal::PathChanged { dir, origin } => {
            let cb = entry.callbacks.path_changed.clone()?;
            Box::new(move || {
                let _keep_alive = (target, backend);
                cb(&dir, origin);
            })
        }
        ChangeSignal::WritableChanged { key } => {
            let cb = entry.callbacks.writable_changed.clone()?;
            Box::new(move || {
                let _keep_alive = (target, backend);
                cb(&key);
            })
        }
        ChangeSignal::PathWritableChanged { dir } => {
            let cb = entry.callbacks.path_writable_changed.clone()?;
            Box::new(move || {
                let _keep_alive = (target, backend);
                cb(&dir);
            })
        }
    };
    Some(DispatchJob { context, invoke })
}
