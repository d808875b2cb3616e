// Observable state store - named cells that notify subscribers synchronously
// Every write installs a new value; subscribers see replacements, never in-place mutation

mod cells;

pub use cells::{AppStore, PlaybackPhase, PlayerSettings, QueueState, SessionState};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Slot<T> {
    value: T,
    listeners: Vec<(u64, Listener<T>)>,
    next_id: u64,
}

/// A single state cell: one value plus the callbacks watching it.
///
/// Reads and subscriptions are public. Writes are crate-private so only the
/// component that owns a cell can replace its value.
pub struct Observable<T> {
    slot: Arc<Mutex<Slot<T>>>,
    // Serializes writers so notifications go out in write order.
    // A listener must not write the cell it is subscribed to.
    dispatch: Arc<Mutex<()>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            dispatch: Arc::clone(&self.dispatch),
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Clone + Send + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                value,
                listeners: Vec::new(),
                next_id: 0,
            })),
            dispatch: Arc::new(Mutex::new(())),
        }
    }

    /// Current value (cloned)
    pub fn get(&self) -> T {
        lock(&self.slot).value.clone()
    }

    /// Borrow the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&lock(&self.slot).value)
    }

    /// Replace the value and notify every subscriber, even if nothing changed
    pub(crate) fn set(&self, value: T) {
        let _dispatch = lock(&self.dispatch);
        self.install(value);
    }

    /// Clone, mutate, replace. The read-modify-write is atomic w.r.t. other writers.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let _dispatch = lock(&self.dispatch);
        let mut next = self.get();
        let result = f(&mut next);
        self.install(next);
        result
    }

    /// Like `update`, but nothing is written (or notified) when `f` fails
    pub(crate) fn try_update<R, E>(&self, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E> {
        let _dispatch = lock(&self.dispatch);
        let mut next = self.get();
        let result = f(&mut next)?;
        self.install(next);
        Ok(result)
    }

    fn install(&self, value: T) {
        let listeners: Vec<Listener<T>> = {
            let mut slot = lock(&self.slot);
            slot.value = value.clone();
            slot.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        // Slot lock released: listeners may read this or any other cell
        for listener in listeners {
            listener(&value);
        }
    }

    /// Register a callback fired after every write. Dropping the handle unsubscribes.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut slot = lock(&self.slot);
            let id = slot.next_id;
            slot.next_id += 1;
            slot.listeners.push((id, Arc::new(callback)));
            id
        };

        let weak: Weak<Mutex<Slot<T>>> = Arc::downgrade(&self.slot);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(slot) = weak.upgrade() {
                    lock(&slot).listeners.retain(|(lid, _)| *lid != id);
                }
            })),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.slot).listeners.len()
    }
}

/// Handle returned by [`Observable::subscribe`]
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscriber_sees_every_write_in_order() {
        let cell = Observable::new(0u32);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let _sub = cell.subscribe(move |v| sink.lock().unwrap().push(*v));

        cell.set(1);
        cell.set(2);
        cell.update(|v| *v += 10);

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 12]);
        assert_eq!(cell.get(), 12);
    }

    #[test]
    fn test_identical_write_still_notifies() {
        let cell = Observable::new(String::from("same"));
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let _sub = cell.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        cell.set("same".to_string());
        cell.set("same".to_string());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_and_drop_stop_delivery() {
        let cell = Observable::new(0);
        let hits = Arc::new(AtomicUsize::new(0));

        let c1 = Arc::clone(&hits);
        let first = cell.subscribe(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let c2 = Arc::clone(&hits);
        let second = cell.subscribe(move |_| {
            c2.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(cell.subscriber_count(), 2);

        cell.set(1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        first.unsubscribe();
        drop(second);
        assert_eq!(cell.subscriber_count(), 0);

        cell.set(2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_try_update_leaves_value_and_stays_silent() {
        let cell = Observable::new(vec![1, 2]);
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let _sub = cell.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let outcome: Result<(), &str> = cell.try_update(|v| {
            v.push(3);
            Err("nope")
        });
        assert!(outcome.is_err());
        assert_eq!(cell.get(), vec![1, 2]);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        let len: Result<usize, &str> = cell.try_update(|v| {
            v.push(3);
            Ok(v.len())
        });
        assert_eq!(len, Ok(3));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_can_read_the_cell_it_watches() {
        let cell = Observable::new(5);
        let observed = Arc::new(Mutex::new(None));

        let reader = cell.clone();
        let sink = Arc::clone(&observed);
        let _sub = cell.subscribe(move |_| {
            *sink.lock().unwrap() = Some(reader.get());
        });

        cell.set(9);
        assert_eq!(*observed.lock().unwrap(), Some(9));
    }
}
