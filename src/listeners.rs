use std::sync::{Arc, Mutex, PoisonError};

/// Handle returned by [`Listeners::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Explicit change-subscription list: callbacks run, in subscription order,
/// every time the owner reports a mutation.
pub struct Listeners<T> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    next_id: u64,
    callbacks: Vec<(ListenerId, Callback<T>)>,
}

impl<T> Listeners<T> {
    pub fn new() -> Self {
        Listeners {
            inner: Mutex::new(Inner {
                next_id: 0,
                callbacks: Vec::new(),
            }),
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.next_id += 1;
        let id = ListenerId(inner.next_id);
        inner.callbacks.push((id, Arc::new(callback)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = inner.callbacks.len();
        inner.callbacks.retain(|(existing, _)| *existing != id);
        inner.callbacks.len() != before
    }

    pub fn notify(&self, value: &T) {
        // Callbacks run outside the lock so they may (un)subscribe themselves
        let callbacks: Vec<Callback<T>> = {
            let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for cb in callbacks {
            cb(value);
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}
