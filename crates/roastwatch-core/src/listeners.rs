use std::panic::{AssertUnwindSafe, catch_unwind};

pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;
pub type ListenerResult = std::result::Result<(), ListenerError>;

type Listener<T> = Box<dyn FnMut(&T) -> ListenerResult + Send>;

/// Token returned by [`ListenerRegistry::subscribe`].
///
/// Consumed by `unsubscribe`, so a listener can only be removed once.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping the token makes the listener impossible to remove"]
pub struct Subscription {
    id: u64,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Delivery summary for one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub delivered: usize,
    pub failed: usize,
}

/// Synchronous listener registry with per-listener failure isolation
pub struct ListenerRegistry<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }
}

impl<T> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&T) -> ListenerResult + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        Subscription { id }
    }

    /// Remove exactly the listener the token was issued for
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(id, _)| *id != subscription.id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Invoke every listener in registration order.
    ///
    /// A listener that returns an error or panics is logged and skipped; the
    /// remaining listeners still receive the value.
    pub fn dispatch(&mut self, value: &T) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        for (id, listener) in self.listeners.iter_mut() {
            match catch_unwind(AssertUnwindSafe(|| listener(value))) {
                Ok(Ok(())) => outcome.delivered += 1,
                Ok(Err(e)) => {
                    tracing::warn!("Listener {} failed: {}", id, e);
                    outcome.failed += 1;
                }
                Err(_) => {
                    tracing::warn!("Listener {} panicked", id);
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_failing_listener_does_not_block_others() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();

        let first = Arc::clone(&seen);
        let _a = registry.subscribe(move |v: &u32| {
            first.lock().unwrap().push(("a", *v));
            Ok(())
        });
        let _b = registry.subscribe(|_: &u32| Err("backend offline".into()));
        let _c = registry.subscribe(|_: &u32| panic!("listener bug"));
        let last = Arc::clone(&seen);
        let _d = registry.subscribe(move |v: &u32| {
            last.lock().unwrap().push(("d", *v));
            Ok(())
        });

        let outcome = registry.dispatch(&7);
        assert_eq!(outcome, DispatchOutcome { delivered: 2, failed: 2 });
        assert_eq!(*seen.lock().unwrap(), vec![("a", 7), ("d", 7)]);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_listener() {
        let count = Arc::new(Mutex::new(0));
        let mut registry = ListenerRegistry::new();

        let c1 = Arc::clone(&count);
        let first = registry.subscribe(move |_: &()| {
            *c1.lock().unwrap() += 1;
            Ok(())
        });
        let c2 = Arc::clone(&count);
        let _second = registry.subscribe(move |_: &()| {
            *c2.lock().unwrap() += 10;
            Ok(())
        });

        assert!(registry.unsubscribe(first));
        assert_eq!(registry.len(), 1);

        registry.dispatch(&());
        assert_eq!(*count.lock().unwrap(), 10);
    }
}
