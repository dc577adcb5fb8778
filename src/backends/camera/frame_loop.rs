// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for streaming loops
//!
//! Camera backends run their blocking capture loops on dedicated threads.
//! This controller owns the thread handle and the stop signal, so that
//! stopping a stream is idempotent and dropping the controller always
//! shuts the loop down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Controller for a streaming loop running in a separate thread
///
/// The loop body receives the stop signal and is expected to poll it
/// between frames; the controller joins the thread on `stop()`.
pub struct StreamLoop {
    handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl StreamLoop {
    /// Spawn a streaming loop thread
    ///
    /// `body` runs once on the new thread and owns its resources (device
    /// handles, buffers) on its own stack; it must return promptly once the
    /// stop signal is set.
    pub fn spawn<F>(name: &str, body: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let signal = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, "Starting streaming loop");

        let handle = thread::spawn(move || {
            debug!(name = %thread_name, "Streaming loop thread started");
            body(signal);
            debug!(name = %thread_name, "Streaming loop thread exiting");
        });

        Self {
            handle: Some(handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Stop the loop and wait for the thread to finish
    ///
    /// Safe to call more than once; subsequent calls are no-ops.
    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            debug!(name = %self.name, "Waiting for streaming loop to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Streaming loop thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for StreamLoop {
    fn drop(&mut self) {
        if self.handle.is_some() {
            debug!(name = %self.name, "StreamLoop dropped, stopping loop");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn test_stop_joins_thread() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut stream = StreamLoop::spawn("test-loop", move |stop| {
            while !stop.load(Ordering::SeqCst) {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
            }
        });

        thread::sleep(Duration::from_millis(30));
        stream.stop();
        let after_stop = counter.load(Ordering::SeqCst);
        assert!(after_stop > 0);

        // Idempotent: a second stop is a no-op
        stream.stop();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_is_running() {
        let stream = StreamLoop::spawn("test-running", |stop| {
            while !stop.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(5));
            }
        });

        assert!(stream.is_running());
        drop(stream);
    }
}
