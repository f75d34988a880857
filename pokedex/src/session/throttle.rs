use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{self, AtomicUsize};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{self, Instant};

/// Spaces out request starts and caps how many run at once.
///
/// Background requests yield to foreground ones: they do not start while a
/// foreground request is waiting or running.
#[derive(Clone)]
pub struct Throttle(Arc<Inner>);

struct Inner {
    interval: Duration,
    next: Mutex<Instant>,
    permits: Arc<Semaphore>,
    foreground: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Foreground,
    Background,
}

/// Held while a request is in flight.
pub struct Permit {
    _slot: Option<OwnedSemaphorePermit>,
    _pending: Option<Pending>,
}

struct Pending(Arc<Inner>);

impl Throttle {
    pub fn new(interval: Duration, concurrency: usize) -> Self {
        Self(Arc::new(Inner {
            interval,
            next: Mutex::new(Instant::now()),
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            foreground: AtomicUsize::new(0),
        }))
    }

    pub async fn acquire(&self, priority: Priority) -> Permit {
        let pending = match priority {
            Priority::Foreground => {
                let _ = self.0.foreground.fetch_add(1, atomic::Ordering::SeqCst);

                Some(Pending(self.0.clone()))
            }
            Priority::Background => {
                while self.pending() > 0 {
                    time::sleep(self.0.interval.max(Duration::from_millis(10))).await;
                }

                None
            }
        };

        let slot = self.0.permits.clone().acquire_owned().await.ok();

        let start = {
            let mut next = self.0.next.lock().await;
            let start = (*next).max(Instant::now());
            *next = start + self.0.interval;

            start
        };

        time::sleep_until(start).await;

        Permit {
            _slot: slot,
            _pending: pending,
        }
    }

    /// The number of foreground requests waiting or running.
    pub fn pending(&self) -> usize {
        self.0.foreground.load(atomic::Ordering::SeqCst)
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        let _ = self.0.foreground.fetch_sub(1, atomic::Ordering::SeqCst);
    }
}

impl fmt::Debug for Throttle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttle")
            .field("interval", &self.0.interval)
            .field("available", &self.0.permits.available_permits())
            .field("foreground", &self.pending())
            .finish()
    }
}
