//! Execution-unit-local correlation id storage.
//!
//! Bindings, in resolution order:
//! - a tokio task-local slot, opened with [`scope`], for async hosts where one
//!   request is one future;
//! - a thread-local slot while a [`sync_scope`] is active;
//! - for a tokio task polled outside any scope, a binding keyed by its task
//!   id, so unrelated tasks sharing a worker thread never share an id;
//! - otherwise the thread-local slot, living for the thread.
//!
//! Slots start empty and are filled lazily on first resolve, so a scope that
//! never measures anything never generates an id. Task-id bindings are kept
//! in a bounded table; async hosts should still wrap each unit of work in
//! [`scope`].

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

use tokio::task::Id as TaskId;

use crate::ports::IdGenerator;

/// Upper bound on remembered unscoped task bindings; oldest go first.
const MAX_TASK_BINDINGS: usize = 4096;

tokio::task_local! {
    static TASK_CORRELATION: RefCell<Option<String>>;
}

thread_local! {
    static THREAD_CORRELATION: RefCell<Option<String>> = const { RefCell::new(None) };
    static SYNC_DEPTH: Cell<usize> = const { Cell::new(0) };
}

#[derive(Default)]
struct TaskBindings {
    ids: HashMap<TaskId, String>,
    order: VecDeque<TaskId>,
}

impl TaskBindings {
    fn get_or_insert(&mut self, task: TaskId, ids: &dyn IdGenerator) -> String {
        if let Some(id) = self.ids.get(&task) {
            return id.clone();
        }
        if self.order.len() >= MAX_TASK_BINDINGS {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        let id = ids.new_id();
        self.ids.insert(task, id.clone());
        self.order.push_back(task);
        id
    }
}

static TASK_BINDINGS: OnceLock<Mutex<TaskBindings>> = OnceLock::new();
static UNSCOPED_WARNED: AtomicBool = AtomicBool::new(false);

fn task_bindings<R>(f: impl FnOnce(&mut TaskBindings) -> R) -> R {
    let table = TASK_BINDINGS.get_or_init(Mutex::default);
    let mut guard = table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut guard)
}

/// Task id of the caller when it is an unscoped tokio task.
fn unscoped_task() -> Option<TaskId> {
    if SYNC_DEPTH.with(Cell::get) > 0 {
        return None;
    }
    tokio::task::try_id()
}

/// Run `fut` with a fresh, empty task-local correlation binding.
pub async fn scope<F: Future>(fut: F) -> F::Output {
    TASK_CORRELATION.scope(RefCell::new(None), fut).await
}

/// Run `f` with a fresh thread-local binding, restoring the previous one
/// afterwards (also on unwind).
pub fn sync_scope<R>(f: impl FnOnce() -> R) -> R {
    struct Restore(Option<String>);

    impl Drop for Restore {
        fn drop(&mut self) {
            let prev = self.0.take();
            let _ = THREAD_CORRELATION.try_with(|slot| *slot.borrow_mut() = prev);
            let _ = SYNC_DEPTH.try_with(|d| d.set(d.get().saturating_sub(1)));
        }
    }

    let prev = THREAD_CORRELATION.with(|slot| slot.borrow_mut().take());
    SYNC_DEPTH.with(|d| d.set(d.get() + 1));
    let _restore = Restore(prev);
    f()
}

/// Whether the caller is polled inside a task-local [`scope`].
pub fn in_task_scope() -> bool {
    TASK_CORRELATION.try_with(|_| ()).is_ok()
}

/// Current binding, if one has been generated. Never generates.
pub fn current() -> Option<String> {
    if let Ok(id) = TASK_CORRELATION.try_with(|slot| slot.borrow().clone()) {
        return id;
    }
    if let Some(task) = unscoped_task() {
        return task_bindings(|b| b.ids.get(&task).cloned());
    }
    THREAD_CORRELATION.with(|slot| slot.borrow().clone())
}

/// Binding for the calling execution unit, generated on first use.
pub(crate) fn resolve(ids: &dyn IdGenerator) -> String {
    let bind = |slot: &RefCell<Option<String>>| -> String {
        slot.borrow_mut().get_or_insert_with(|| ids.new_id()).clone()
    };
    if let Ok(id) = TASK_CORRELATION.try_with(bind) {
        return id;
    }
    if let Some(task) = unscoped_task() {
        if !UNSCOPED_WARNED.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                task = %task,
                "measuring in a tokio task outside correlation::scope; binding id to the task"
            );
        }
        return task_bindings(|b| b.get_or_insert(task, ids));
    }
    THREAD_CORRELATION.with(bind)
}
