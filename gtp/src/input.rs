//! Pending-input queue feeding the protocol loop.
//!
//! A reader thread pushes stdin lines here; the main loop blocks on `pop`.
//! Pondering polls `has_pending` between playouts so the arrival of the
//! next command interrupts the background search.

use std::collections::VecDeque;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

#[derive(Clone, Default)]
pub struct InputQueue {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    lines: Mutex<VecDeque<String>>,
    ready: Condvar,
    closed: AtomicBool,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the stdin reader thread.
    pub fn spawn_stdin() -> Self {
        let queue = Self::new();
        let feeder = queue.clone();
        std::thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    match line {
                        Ok(line) => feeder.push(line),
                        Err(_) => break,
                    }
                }
                feeder.close();
            })
            .expect("spawning the stdin reader");
        queue
    }

    pub fn push(&self, line: String) {
        let mut lines = self.inner.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.push_back(line);
        self.inner.ready.notify_one();
    }

    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.ready.notify_all();
    }

    /// Blocking read; `None` once closed and drained.
    pub fn pop(&self) -> Option<String> {
        let mut lines = self.inner.lines.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(line) = lines.pop_front() {
                return Some(line);
            }
            if self.inner.closed.load(Ordering::Acquire) {
                return None;
            }
            lines = self
                .inner
                .ready
                .wait(lines)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Is a command waiting (or the stream finished)? Pondering stops when
    /// this turns true.
    pub fn has_pending(&self) -> bool {
        if self.inner.closed.load(Ordering::Acquire) {
            return true;
        }
        !self
            .inner
            .lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_order() {
        let queue = InputQueue::new();
        queue.push("a".into());
        queue.push("b".into());
        assert!(queue.has_pending());
        assert_eq!(queue.pop().as_deref(), Some("a"));
        assert_eq!(queue.pop().as_deref(), Some("b"));
        assert!(!queue.has_pending());
    }

    #[test]
    fn close_drains_then_ends() {
        let queue = InputQueue::new();
        queue.push("last".into());
        queue.close();
        assert!(queue.has_pending());
        assert_eq!(queue.pop().as_deref(), Some("last"));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn pop_wakes_on_push() {
        let queue = InputQueue::new();
        let other = queue.clone();
        let handle = std::thread::spawn(move || other.pop());
        std::thread::sleep(std::time::Duration::from_millis(20));
        queue.push("wake".into());
        assert_eq!(handle.join().unwrap().as_deref(), Some("wake"));
    }
}
