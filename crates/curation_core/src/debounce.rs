use std::time::Duration;

use tokio::{sync::watch, task::JoinHandle, time::sleep};

/// Last-write-wins debouncing of a value. The raw value updates immediately; the effective
/// value follows only after `delay` passes without another write.
pub struct Debouncer<T> {
    raw: watch::Sender<T>,
    effective: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Must be called inside a tokio runtime.
    pub fn new(initial: T, delay: Duration) -> Self {
        let (raw, mut raw_rx) = watch::channel(initial.clone());
        let (effective_tx, effective) = watch::channel(initial);

        let task = tokio::spawn(async move {
            while raw_rx.changed().await.is_ok() {
                loop {
                    tokio::select! {
                        changed = raw_rx.changed() => {
                            if changed.is_err() {
                                return;
                            }
                        }
                        _ = sleep(delay) => break,
                    }
                }
                let value = raw_rx.borrow_and_update().clone();
                effective_tx.send_if_modified(|current| {
                    if *current == value {
                        return false;
                    }
                    *current = value;
                    true
                });
            }
        });

        Self {
            raw,
            effective,
            task,
        }
    }

    pub fn set(&self, value: T) {
        self.raw.send_replace(value);
    }

    pub fn raw(&self) -> T {
        self.raw.borrow().clone()
    }

    pub fn effective(&self) -> T {
        self.effective.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.effective.clone()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
