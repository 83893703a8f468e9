//! The node's long-lived threads and their shared plumbing.
//!
//! | Thread       | Role                                   |
//! |--------------|----------------------------------------|
//! | `controller` | sole queue consumer; executes commands |
//! | `outer-loop` | periodic Update producer               |
//! | `subscriber` | external command poller                |

pub mod controller;
pub mod outer_loop;
pub mod subscriber;

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::Error;

/// Cooperative cancellation flag with interruptible waits.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, cv) = &*self.inner;
        *flag.lock() = true;
        cv.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Sleep up to `timeout`.  Returns `true` if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.wait_until(Instant::now() + timeout)
    }

    /// Sleep until `deadline`.  Returns `true` if cancelled.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let (flag, cv) = &*self.inner;
        let mut cancelled = flag.lock();
        while !*cancelled {
            if cv.wait_until(&mut cancelled, deadline).timed_out() {
                break;
            }
        }
        *cancelled
    }

    /// Block until cancelled.
    pub fn wait(&self) {
        let (flag, cv) = &*self.inner;
        let mut cancelled = flag.lock();
        while !*cancelled {
            cv.wait(&mut cancelled);
        }
    }
}

/// Spawn a named thread.
pub fn spawn_named<T: Send + 'static>(
    name: &'static str,
    f: impl FnOnce() -> T + Send + 'static,
) -> Result<JoinHandle<T>, Error> {
    log::info!("Spawning '{}'", name);
    std::thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .map_err(|e| {
            log::error!("spawn '{}' failed: {}", name, e);
            Error::Spawn(name)
        })
}

/// Join a thread spawned with [`spawn_named`].
pub fn join_named<T>(name: &'static str, handle: JoinHandle<T>) -> Result<T, Error> {
    handle.join().map_err(|_| {
        log::error!("thread '{}' panicked", name);
        Error::ThreadPanicked(name)
    })
}
