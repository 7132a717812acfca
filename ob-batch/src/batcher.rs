//! Per-method pending-request queue.
//!
//! Many callers `send` at arbitrary times; one worker drains with `get`.
//! The drain never waits to fill a batch — whatever is queued when the
//! worker wakes goes out, capped at `max_batch`, which bounds latency.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use ob_core::TensorMap;

use crate::future::{reply_slot, CallError, Fulfiller, FutureReply};

pub(crate) struct QueueEntry {
    pub request: TensorMap,
    pub fulfiller: Fulfiller,
}

struct Shared {
    queue: VecDeque<QueueEntry>,
    terminated: bool,
}

pub(crate) struct Batcher {
    max_batch: usize,
    shared: Mutex<Shared>,
    cv: Condvar,
}

impl Batcher {
    pub fn new(max_batch: usize) -> Self {
        assert!(max_batch >= 1, "max_batch must be at least 1");
        Self {
            max_batch,
            shared: Mutex::new(Shared {
                queue: VecDeque::new(),
                terminated: false,
            }),
            cv: Condvar::new(),
        }
    }

    /// Enqueue one request; returns immediately.
    pub fn send(&self, request: TensorMap) -> FutureReply {
        let (future, fulfiller) = reply_slot();
        let mut sh = self.shared.lock().unwrap();
        if sh.terminated {
            drop(sh);
            let _ = fulfiller.fulfill(Err(CallError::Cancelled));
            return future;
        }
        sh.queue.push_back(QueueEntry { request, fulfiller });
        drop(sh);
        self.cv.notify_one();
        future
    }

    /// Block until at least one request is queued or the batcher terminates;
    /// drain up to `max_batch`. An empty return means terminated.
    pub fn get(&self) -> Vec<QueueEntry> {
        let mut sh = self.shared.lock().unwrap();
        while sh.queue.is_empty() && !sh.terminated {
            sh = self.cv.wait(sh).unwrap();
        }
        let n = sh.queue.len().min(self.max_batch);
        sh.queue.drain(..n).collect()
    }

    /// Terminate: wake the worker and cancel everything still queued.
    pub fn exit(&self) {
        let drained: Vec<QueueEntry> = {
            let mut sh = self.shared.lock().unwrap();
            sh.terminated = true;
            sh.queue.drain(..).collect()
        };
        self.cv.notify_all();
        for entry in drained {
            let _ = entry.fulfiller.fulfill(Err(CallError::Cancelled));
        }
    }
}
