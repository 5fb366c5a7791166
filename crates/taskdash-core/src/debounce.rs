use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

type SettleCallback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Trailing-edge debounce on the tokio timer.
///
/// Every [`Debounce::set`] restarts the window. When a window elapses without another
/// `set`, the value is published to subscribers and handed to the settle callback.
/// Dropping the debouncer aborts any pending timer.
pub struct Debounce<T> {
    delay: Duration,
    tx: Arc<watch::Sender<T>>,
    on_settle: Option<SettleCallback<T>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<T> Debounce<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            delay,
            tx: Arc::new(tx),
            on_settle: None,
            pending: Mutex::new(None),
        }
    }

    /// Like [`Debounce::new`], also calling `on_settle` each time a window elapses.
    pub fn with_callback<F>(initial: T, delay: Duration, on_settle: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let mut debounce = Self::new(initial, delay);
        debounce.on_settle = Some(Arc::new(on_settle));
        debounce
    }

    /// Must be called from within a tokio runtime.
    pub fn set(&self, value: T) {
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            trace!("resetting debounce window");
            previous.abort();
        }

        let tx = Arc::clone(&self.tx);
        let on_settle = self.on_settle.clone();
        let delay = self.delay;

        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let published = value.clone();
            tx.send_if_modified(move |current| {
                if *current == published {
                    false
                } else {
                    *current = published;
                    true
                }
            });
            if let Some(callback) = on_settle {
                callback(value);
            }
        }));
    }

    /// The last value that survived a full window.
    pub fn current(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }
}

impl<T> Drop for Debounce<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}
