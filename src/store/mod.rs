//! Client-side state: observable cells, durable storage and the stores built
//! on them.
//!
//! - `Observable`: a value that can be read, replaced, updated in place and
//!   watched for changes
//! - `storage`: string key/value storage that survives process restarts
//! - `session`: the login session, persisted under `token` / `user`
//! - `theme`: the colour theme preference, persisted under `theme`

pub mod session;
pub mod storage;
pub mod theme;

use std::sync::Arc;

use tokio::sync::watch;

pub use session::{Session, SessionStore};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use theme::{ResolvedTheme, Theme, ThemeState, ThemeStore};

/// A shared value whose changes can be observed.
///
/// Cloning an `Observable` yields another handle to the same value.
/// Subscribers get a `watch::Receiver` that is notified after every `set`
/// or `update`, whether or not anything is currently subscribed.
#[derive(Debug)]
pub struct Observable<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// A copy of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Receive change notifications. The current value counts as already seen.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Mutate the value in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_update_change_the_value() {
        let cell = Observable::new(1u32);
        cell.set(5);
        assert_eq!(cell.get(), 5);

        cell.update(|v| *v += 1);
        assert_eq!(cell.get(), 6);
        assert_eq!(cell.with(|v| *v * 2), 12);
    }

    #[test]
    fn clones_share_the_value() {
        let a = Observable::new(String::from("light"));
        let b = a.clone();
        b.set("dark".to_string());
        assert_eq!(a.get(), "dark");
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let cell = Observable::new(0u32);
        let mut rx = cell.subscribe();
        assert!(!rx.has_changed().unwrap());

        cell.set(3);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 3);

        cell.update(|v| *v = 4);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 4);
    }
}
